//! Analysis config (YAML or JSON) parsing + semantic validation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_true() -> bool {
    true
}

/// Top-level analysis config.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Worker threads for the event loop (0 = all cores).
    #[serde(default)]
    pub threads: usize,
    /// Directory receiving `histo_<dataset>.json`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Input datasets by name, in run order.
    pub datasets: IndexMap<String, DatasetConfig>,
    /// Lookup functions callable from expressions.
    #[serde(default)]
    pub lookups: IndexMap<String, LookupConfig>,
    /// Derived columns, applied in order.
    #[serde(default)]
    pub defines: IndexMap<String, String>,
    /// Preselection, applied in order after the defines.
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    #[serde(default)]
    pub binnings: Vec<BinningConfig>,
    #[serde(default)]
    pub histograms: Vec<HistogramConfig>,
    /// Factor multiplying every histogram weight.
    #[serde(default)]
    pub extra_weight: Option<String>,
    /// Also book every histogram at the top level of each dataset.
    #[serde(default = "default_true")]
    pub inclusive: bool,
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
    /// Write one flat directory with region suffixes instead of nested directories.
    #[serde(default)]
    pub flat_output: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    /// Parquet file.
    pub path: PathBuf,
    /// Process at most this many entries.
    #[serde(default)]
    pub entries: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupConfig {
    /// histbook output file holding the table.
    pub file: PathBuf,
    /// `/`-separated path of a 1D or 2D histogram inside `file`.
    pub histogram: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    pub name: String,
    pub expr: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinningConfig {
    pub name: String,
    #[serde(default)]
    pub title: String,
    /// Explicit edges.
    #[serde(default)]
    pub edges: Option<Vec<f64>>,
    /// Equal-width bins; exclusive with `edges`.
    #[serde(default)]
    pub uniform: Option<UniformBins>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniformBins {
    pub bins: usize,
    pub low: f64,
    pub high: f64,
}

/// Histogram booking, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistogramConfig {
    Hist1d {
        name: String,
        #[serde(default)]
        title: String,
        binning: String,
        variable: String,
        #[serde(default)]
        weight: String,
    },
    Hist2d {
        name: String,
        #[serde(default)]
        title: String,
        x_binning: String,
        y_binning: String,
        x_variable: String,
        y_variable: String,
        #[serde(default)]
        weight: String,
    },
    Profile1d {
        name: String,
        #[serde(default)]
        title: String,
        binning: String,
        x_variable: String,
        y_variable: String,
        #[serde(default)]
        weight: String,
    },
}

impl HistogramConfig {
    pub fn name(&self) -> &str {
        match self {
            HistogramConfig::Hist1d { name, .. }
            | HistogramConfig::Hist2d { name, .. }
            | HistogramConfig::Profile1d { name, .. } => name,
        }
    }

    fn binning_refs(&self) -> Vec<&str> {
        match self {
            HistogramConfig::Hist1d { binning, .. } | HistogramConfig::Profile1d { binning, .. } => {
                vec![binning.as_str()]
            }
            HistogramConfig::Hist2d { x_binning, y_binning, .. } => {
                vec![x_binning.as_str(), y_binning.as_str()]
            }
        }
    }
}

/// One region; `split_by` adds one sub-region per bin combination of the
/// named binnings, next to the explicit `subregions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    pub name: String,
    #[serde(default)]
    pub selection: String,
    #[serde(default)]
    pub subregions: Vec<RegionConfig>,
    #[serde(default)]
    pub split_by: Vec<String>,
}

/// Read a config; `.json` is parsed as JSON, anything else as YAML.
///
/// Relative dataset, lookup and output paths are resolved against the
/// config file's directory.
pub fn read_config(path: &Path) -> Result<AnalysisConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let mut cfg: AnalysisConfig = if ext == "json" {
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?
    } else {
        serde_yaml_ng::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?
    };
    if let Some(base) = path.parent() {
        cfg.resolve_paths(base);
    }
    Ok(cfg)
}

fn resolve(base: &Path, p: &mut PathBuf) {
    if p.is_relative() {
        *p = base.join(&*p);
    }
}

impl AnalysisConfig {
    fn resolve_paths(&mut self, base: &Path) {
        resolve(base, &mut self.output_dir);
        for ds in self.datasets.values_mut() {
            resolve(base, &mut ds.path);
        }
        for lk in self.lookups.values_mut() {
            resolve(base, &mut lk.file);
        }
    }

    /// Check cross references before any data is read.
    pub fn validate(&self) -> Result<()> {
        if self.datasets.is_empty() {
            anyhow::bail!("datasets must be non-empty");
        }
        if self.histograms.is_empty() {
            tracing::warn!("no histograms configured; only counts and cutflows will be produced");
        }

        let mut binnings = HashSet::new();
        for b in &self.binnings {
            if !binnings.insert(b.name.as_str()) {
                anyhow::bail!("duplicate binning name: {}", b.name);
            }
            match (&b.edges, &b.uniform) {
                (Some(_), Some(_)) => {
                    anyhow::bail!("binning '{}' sets both edges and uniform", b.name)
                }
                (None, None) => anyhow::bail!("binning '{}' needs edges or uniform", b.name),
                _ => {}
            }
        }

        let mut histos = HashSet::new();
        for h in &self.histograms {
            if !histos.insert(h.name()) {
                anyhow::bail!("duplicate histogram name: {}", h.name());
            }
            for r in h.binning_refs() {
                if !binnings.contains(r) {
                    anyhow::bail!("histogram '{}' references unknown binning '{r}'", h.name());
                }
            }
        }

        let mut filters = HashSet::new();
        for f in &self.filters {
            if f.expr.trim().is_empty() {
                anyhow::bail!("filter '{}' has an empty expression", f.name);
            }
            if !filters.insert(f.name.as_str()) {
                anyhow::bail!("duplicate filter name: {}", f.name);
            }
        }

        validate_regions(&self.regions, &binnings, "")?;
        Ok(())
    }
}

fn validate_regions(regions: &[RegionConfig], binnings: &HashSet<&str>, parent: &str) -> Result<()> {
    let mut names = HashSet::new();
    for r in regions {
        let path = if parent.is_empty() { r.name.clone() } else { format!("{parent}/{}", r.name) };
        if r.name.is_empty() || r.name.contains('/') {
            anyhow::bail!("invalid region name '{path}'");
        }
        if !names.insert(r.name.as_str()) {
            anyhow::bail!("duplicate region: {path}");
        }
        for b in &r.split_by {
            if !binnings.contains(b.as_str()) {
                anyhow::bail!("region '{path}' splits by unknown binning '{b}'");
            }
        }
        validate_regions(&r.subregions, binnings, &path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
threads: 2
datasets:
  ttbar: { path: data/ttbar.parquet, entries: 1000 }
  wjets: { path: /abs/wjets.parquet }
defines:
  pt_gev: pt / 1000
filters:
  - { name: presel, expr: "pt_gev > 25" }
binnings:
  - { name: pt_gev, edges: [25, 50, 100] }
  - { name: eta, uniform: { bins: 4, low: -2.5, high: 2.5 } }
histograms:
  - { kind: hist1d, name: h_pt, binning: pt_gev, variable: pt_gev, weight: w }
  - { kind: hist2d, name: h_pt_eta, x_binning: pt_gev, y_binning: eta, x_variable: pt_gev, y_variable: eta }
  - { kind: profile1d, name: p_eta, binning: pt_gev, x_variable: pt_gev, y_variable: eta }
regions:
  - name: sr
    selection: "njet >= 4"
    split_by: [pt_gev, eta]
    subregions:
      - { name: tight, selection: "nbjet >= 2" }
"#;

    fn parse(text: &str) -> AnalysisConfig {
        serde_yaml_ng::from_str(text).unwrap()
    }

    #[test]
    fn parses_full_config() {
        let cfg = parse(YAML);
        cfg.validate().unwrap();
        assert_eq!(cfg.threads, 2);
        assert_eq!(cfg.datasets.keys().collect::<Vec<_>>(), ["ttbar", "wjets"]);
        assert_eq!(cfg.datasets["ttbar"].entries, Some(1000));
        assert_eq!(cfg.histograms.len(), 3);
        assert!(cfg.inclusive);
        assert_eq!(cfg.regions[0].subregions[0].name, "tight");
        assert_eq!(cfg.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn paths_resolved_against_config_dir() {
        let mut cfg = parse(YAML);
        cfg.resolve_paths(Path::new("/work/ana"));
        assert_eq!(cfg.datasets["ttbar"].path, PathBuf::from("/work/ana/data/ttbar.parquet"));
        assert_eq!(cfg.datasets["wjets"].path, PathBuf::from("/abs/wjets.parquet"));
        assert_eq!(cfg.output_dir, PathBuf::from("/work/ana/output"));
    }

    #[test]
    fn unknown_binning_reference_rejected() {
        let text = YAML.replace("binning: pt_gev, variable", "binning: nope, variable");
        let err = parse(&text).validate().unwrap_err();
        assert!(err.to_string().contains("unknown binning 'nope'"));

        let text = YAML.replace("split_by: [pt_gev, eta]", "split_by: [phi]");
        assert!(parse(&text).validate().is_err());
    }

    #[test]
    fn empty_datasets_rejected() {
        let cfg = parse("datasets: {}\n");
        assert!(cfg.validate().unwrap_err().to_string().contains("datasets"));
    }

    #[test]
    fn duplicate_sibling_regions_rejected() {
        let cfg = parse(
            "datasets: { a: { path: a.parquet } }\nregions:\n  - { name: sr }\n  - { name: sr }\n",
        );
        assert!(cfg.validate().unwrap_err().to_string().contains("duplicate region: sr"));
    }

    #[test]
    fn unknown_field_rejected() {
        assert!(serde_yaml_ng::from_str::<AnalysisConfig>("datasets: {}\nthreadz: 3\n").is_err());
    }
}
