//! Run-All driver: one trigger for every frame, then persistence per frame.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use hb_frame::{CutflowReport, ResultHandle, run_graphs};
use hb_output::{Directory, OutputFile};
use indexmap::IndexMap;

use crate::error::{BookError, Result};
use crate::node::FrameNode;

/// Driver options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Write every frame's tree into one flat directory with path suffixes
    /// instead of one subdirectory per region.
    pub flat: bool,
}

/// What [`run_all`] produced for one frame.
#[derive(Debug, Clone)]
pub struct FrameSummary {
    /// Frame name.
    pub name: String,
    /// Rows surviving at the frame's own selection.
    pub count: u64,
    /// Output artifact.
    pub artifact: PathBuf,
    /// Cutflow at the time of persistence.
    pub cutflow: CutflowReport,
}

/// Output artifact path for frame `name`.
pub fn artifact_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("histo_{name}.json"))
}

/// Execute every booking of every frame in a single trigger, then write
/// `<output_dir>/histo_<name>.json` per frame and print counts and cutflows
/// to stdout.
pub fn run_all(frames: &IndexMap<String, FrameNode>, output_dir: &Path) -> Result<Vec<FrameSummary>> {
    let stdout = std::io::stdout();
    run_all_with(frames, output_dir, &RunOptions::default(), &mut stdout.lock())
}

/// [`run_all`] with explicit options and report sink.
pub fn run_all_with<W: Write>(
    frames: &IndexMap<String, FrameNode>,
    output_dir: &Path,
    options: &RunOptions,
    out: &mut W,
) -> Result<Vec<FrameSummary>> {
    let start = Instant::now();

    let counts: Vec<_> = frames.values().map(FrameNode::count).collect();
    let mut handles: Vec<ResultHandle> = counts.iter().map(ResultHandle::from).collect();
    for frame in frames.values() {
        handles.extend(frame.collect_all());
    }
    log::info!("running {} results over {} frames", handles.len(), frames.len());

    let trigger = Instant::now();
    run_graphs(&handles).map_err(BookError::EngineExecution)?;
    log::info!("trigger finished in {:.3} s", trigger.elapsed().as_secs_f64());

    let mut summaries = Vec::with_capacity(frames.len());
    for ((name, frame), count) in frames.iter().zip(&counts) {
        let count = *count.get()?;
        writeln!(out, "{name} #events final: {count}")?;

        let artifact = artifact_path(output_dir, name);
        write_artifact(frame, &artifact, options)?;
        log::info!("wrote {}", artifact.display());

        let cutflow = frame.cutflow();
        write!(out, "{cutflow}")?;
        summaries.push(FrameSummary { name: name.clone(), count, artifact, cutflow });
    }

    log::info!("run_all finished in {:.3} s", start.elapsed().as_secs_f64());
    Ok(summaries)
}

/// Persist `frame` into a fresh artifact at `path`.
///
/// The tree is assembled in memory first, so a failure leaves no file behind.
fn write_artifact(frame: &FrameNode, path: &Path, options: &RunOptions) -> Result<()> {
    let mut root = Directory::new();
    if options.flat {
        frame.persist_all_flat(&mut root, "")?;
    } else {
        frame.persist_all(&mut root)?;
    }
    let mut file = OutputFile::recreate(path)?;
    *file.root_mut() = root;
    file.close()?;
    Ok(())
}
