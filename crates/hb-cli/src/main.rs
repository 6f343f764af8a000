//! histbook CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use hb_book::{FrameNode, RunOptions, run_all_with};
use hb_frame::{DataSource, enable_implicit_mt};

mod analysis;
mod config;

#[derive(Parser)]
#[command(name = "histbook")]
#[command(about = "histbook - region-tree histogramming over columnar event data")]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Book every configured histogram in every region of every dataset,
    /// execute once and write one output file per dataset
    Run {
        /// Analysis config (YAML, or JSON when the extension is .json)
        #[arg(short, long)]
        config: PathBuf,

        /// Override the config's output directory
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Override the config's thread count (0 = all cores)
        #[arg(long)]
        threads: Option<usize>,

        /// Write flat directories with region-suffixed names
        #[arg(long)]
        flat: bool,
    },

    /// Apply a selection to each input file and write the surviving rows
    /// to a parquet file of the same name under `--out-dir`
    Skim {
        /// Input parquet files
        #[arg(short, long, num_args = 1.., required = true)]
        input: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Selection expression
        #[arg(short, long)]
        selection: String,

        /// Cutflow label of the selection
        #[arg(long, default_value = "presel")]
        label: String,

        /// Columns to keep (default: all)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Worker threads (0 = all cores)
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Run { config, out_dir, threads, flat } => cmd_run(&config, out_dir, threads, flat),
        Commands::Skim { input, out_dir, selection, label, columns, threads } => {
            cmd_skim(&input, &out_dir, &selection, &label, &columns, threads)
        }
        Commands::Version => {
            println!("histbook {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn cmd_run(
    config: &Path,
    out_dir: Option<PathBuf>,
    threads: Option<usize>,
    flat: bool,
) -> Result<()> {
    let cfg = config::read_config(config)?;
    cfg.validate()?;
    enable_implicit_mt(threads.unwrap_or(cfg.threads));

    let analysis = analysis::Analysis::build(&cfg)?;
    tracing::debug!(
        "{} binnings, {} histograms, {} top-level regions, {} lookups",
        analysis.binnings.len(),
        analysis.aggregations.len(),
        analysis.regions.len(),
        analysis.lookups.len()
    );
    let frames = analysis.frames(&cfg)?;
    let output_dir = out_dir.unwrap_or_else(|| cfg.output_dir.clone());
    let options = RunOptions { flat: flat || cfg.flat_output };

    let stdout = std::io::stdout();
    let summaries = run_all_with(&frames, &output_dir, &options, &mut stdout.lock())?;
    for s in &summaries {
        tracing::info!("{}: {} events -> {}", s.name, s.count, s.artifact.display());
    }
    Ok(())
}

fn cmd_skim(
    inputs: &[PathBuf],
    out_dir: &Path,
    selection: &str,
    label: &str,
    columns: &[String],
    threads: usize,
) -> Result<()> {
    if selection.trim().is_empty() {
        anyhow::bail!("--selection must be non-empty");
    }
    enable_implicit_mt(threads);

    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    for input in inputs {
        let file_name = input
            .file_name()
            .with_context(|| format!("input has no file name: {}", input.display()))?;
        let output = out_dir.join(file_name);

        let source = DataSource::from_parquet(input)
            .with_context(|| format!("reading {}", input.display()))?;
        let total = source.n_entries();
        let mut node = FrameNode::from_source(source);
        node.filter(label, selection)?;
        let written = node.snapshot(&output, &columns)?;

        println!("{}: {written}/{total} rows -> {}", input.display(), output.display());
        print!("{}", node.cutflow());
    }
    Ok(())
}
