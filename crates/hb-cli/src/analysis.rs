//! Config → binnings, aggregation specs, region trees and frames.

use std::sync::Arc;

use anyhow::{Context, Result};
use hb_book::{
    AggregationSpec, Binning, FrameNode, Histogram1DSpec, Histogram2DSpec, Profile1DSpec,
    RegionSpec, bulk_book, bulk_define, generate_combinatorial_regions,
};
use hb_frame::{DataSource, LookupTable};
use hb_output::{OutputFile, Record};
use indexmap::IndexMap;

use crate::config::{AnalysisConfig, HistogramConfig, LookupConfig, RegionConfig};

/// Everything derived from the config that does not depend on the data.
#[derive(Debug)]
pub struct Analysis {
    pub binnings: IndexMap<String, Arc<Binning>>,
    pub aggregations: Vec<AggregationSpec>,
    pub regions: Vec<RegionSpec>,
    pub lookups: Vec<(String, LookupTable)>,
}

impl Analysis {
    pub fn build(cfg: &AnalysisConfig) -> Result<Self> {
        let mut binnings = IndexMap::new();
        for b in &cfg.binnings {
            let binning = match (&b.edges, &b.uniform) {
                (Some(edges), _) => Binning::new(&b.name, &b.title, edges.clone())?,
                (None, Some(u)) => Binning::uniform(&b.name, &b.title, u.bins, u.low, u.high)?,
                (None, None) => anyhow::bail!("binning '{}' needs edges or uniform", b.name),
            };
            binnings.insert(b.name.clone(), Arc::new(binning));
        }

        let aggregations =
            cfg.histograms.iter().map(|h| aggregation(h, &binnings)).collect::<Result<Vec<_>>>()?;
        let regions =
            cfg.regions.iter().map(|r| region_spec(r, &binnings)).collect::<Result<Vec<_>>>()?;
        let lookups = cfg
            .lookups
            .iter()
            .map(|(name, lk)| Ok((name.clone(), load_lookup(name, lk)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { binnings, aggregations, regions, lookups })
    }

    /// Load every dataset and book the full region tree into it.
    pub fn frames(&self, cfg: &AnalysisConfig) -> Result<IndexMap<String, FrameNode>> {
        let extra = cfg.extra_weight.as_deref();
        let mut frames = IndexMap::new();
        for (name, ds) in &cfg.datasets {
            let mut source = DataSource::from_parquet(&ds.path)
                .with_context(|| format!("loading dataset '{name}' from {}", ds.path.display()))?;
            for (fname, table) in &self.lookups {
                source = source.with_lookup(fname.clone(), table.clone());
            }
            tracing::info!("dataset '{name}': {} entries", source.n_entries());

            let mut node = FrameNode::from_source(source);
            if let Some(n) = ds.entries {
                node.range(n);
            }
            bulk_define(&mut node, &cfg.defines).with_context(|| format!("defines for '{name}'"))?;
            for f in &cfg.filters {
                node.filter(&f.name, &f.expr).with_context(|| format!("filter '{}'", f.name))?;
            }
            if cfg.inclusive {
                bulk_book(&mut node, &self.aggregations, extra)?;
            }
            for region in &self.regions {
                region
                    .apply_weighted(&mut node, &self.aggregations, extra)
                    .with_context(|| format!("region '{}' for '{name}'", region.name()))?;
            }
            frames.insert(name.clone(), node);
        }
        Ok(frames)
    }
}

fn binning(binnings: &IndexMap<String, Arc<Binning>>, name: &str) -> Result<Arc<Binning>> {
    binnings.get(name).cloned().with_context(|| format!("unknown binning '{name}'"))
}

fn aggregation(
    h: &HistogramConfig,
    binnings: &IndexMap<String, Arc<Binning>>,
) -> Result<AggregationSpec> {
    Ok(match h {
        HistogramConfig::Hist1d { name, title, binning: b, variable, weight } => {
            Histogram1DSpec::new(name, title, binning(binnings, b)?, variable, weight).into()
        }
        HistogramConfig::Hist2d {
            name,
            title,
            x_binning,
            y_binning,
            x_variable,
            y_variable,
            weight,
        } => Histogram2DSpec::new(
            name,
            title,
            binning(binnings, x_binning)?,
            binning(binnings, y_binning)?,
            x_variable,
            y_variable,
            weight,
        )
        .into(),
        HistogramConfig::Profile1d { name, title, binning: b, x_variable, y_variable, weight } => {
            Profile1DSpec::new(name, title, binning(binnings, b)?, x_variable, y_variable, weight)
                .into()
        }
    })
}

fn region_spec(r: &RegionConfig, binnings: &IndexMap<String, Arc<Binning>>) -> Result<RegionSpec> {
    let mut spec = RegionSpec::new(&r.name, &r.selection);
    for sub in &r.subregions {
        spec.add_subregion(region_spec(sub, binnings)?)?;
    }
    if !r.split_by.is_empty() {
        let split = r.split_by.iter().map(|b| binning(binnings, b)).collect::<Result<Vec<_>>>()?;
        let refs: Vec<&Binning> = split.iter().map(|b| b.as_ref()).collect();
        let n = generate_combinatorial_regions(&mut spec, &refs)?;
        tracing::debug!("region '{}': {n} combinatorial sub-regions", r.name);
    }
    Ok(spec)
}

fn load_lookup(name: &str, lk: &LookupConfig) -> Result<LookupTable> {
    let file = OutputFile::open(&lk.file)
        .with_context(|| format!("lookup '{name}': opening {}", lk.file.display()))?;
    let record = file.root().get(&lk.histogram).with_context(|| format!("lookup '{name}'"))?;
    match record {
        Record::Hist1D(h) => {
            LookupTable::try_from(h).with_context(|| format!("lookup '{name}': {}", lk.histogram))
        }
        Record::Hist2D(h) => {
            LookupTable::try_from(h).with_context(|| format!("lookup '{name}': {}", lk.histogram))
        }
        Record::Profile1D(_) => {
            anyhow::bail!("lookup '{name}': '{}' is a profile, not a histogram", lk.histogram)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(text: &str) -> AnalysisConfig {
        serde_yaml_ng::from_str(text).unwrap()
    }

    #[test]
    fn region_tree_with_split() {
        let c = cfg(r#"
datasets: { a: { path: a.parquet } }
binnings:
  - { name: pt, edges: [0, 10, 20] }
  - { name: eta, uniform: { bins: 3, low: 0, high: 3 } }
regions:
  - name: sr
    selection: "x > 0"
    subregions: [ { name: tight, selection: "x > 1" } ]
    split_by: [pt, eta]
"#);
        let a = Analysis::build(&c).unwrap();
        let sr = &a.regions[0];
        let names: Vec<&str> = sr.subregions().map(|(_, s)| s.name()).collect();
        assert_eq!(names.len(), 7);
        assert_eq!(names[0], "tight");
        assert_eq!(names[1], "pt0_eta0");
        assert_eq!(names[6], "pt1_eta2");
        assert_eq!(a.binnings["eta"].n_bins(), 3);
    }

    #[test]
    fn invalid_binning_surfaces() {
        let c = cfg("datasets: { a: { path: a.parquet } }\nbinnings:\n  - { name: pt, edges: [3, 1] }\n");
        let err = Analysis::build(&c).unwrap_err();
        assert!(format!("{err:#}").contains("invalid binning 'pt'"));
    }

    #[test]
    fn malformed_lookup_histogram_rejected() {
        use hb_frame::{BinEdges, Hist1D, Hist1DModel};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sf.json");
        let mut h = Hist1D::empty(&Hist1DModel::new(
            "sf_pt",
            "",
            BinEdges::new(vec![0.0, 1.0, 2.0]).unwrap(),
        ));
        h.bin_content.truncate(1);
        let mut file = OutputFile::recreate(&path).unwrap();
        file.root_mut().write(h.into()).unwrap();
        file.close().unwrap();

        let c = cfg(&format!(
            "datasets: {{ a: {{ path: a.parquet }} }}\nlookups:\n  sf: {{ file: '{}', histogram: sf_pt }}\n",
            path.display()
        ));
        let err = Analysis::build(&c).unwrap_err();
        assert!(format!("{err:#}").contains("does not match"), "{err:#}");
    }
}
