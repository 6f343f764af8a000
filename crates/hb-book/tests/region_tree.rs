//! Integration tests: region trees applied to frames, executed once, persisted.

use std::sync::Arc;

use approx::assert_relative_eq;
use hb_book::{
    AggregationSpec, Binning, FrameNode, Histogram1DSpec, Histogram2DSpec, RegionSpec,
    RunOptions, artifact_path, generate_combinatorial_regions, run_all_with,
};
use hb_frame::{DataSource, run_graphs};
use hb_output::{Directory, OutputFile};
use indexmap::IndexMap;
use proptest::prelude::*;

fn events() -> DataSource {
    let n = 40;
    let pt: Vec<f64> = (0..n).map(|i| 1.0 + (i as f64 * 7.3) % 59.0).collect();
    let eta: Vec<f64> = (0..n).map(|i| -2.4 + (i as f64 * 0.37) % 4.8).collect();
    let w: Vec<f64> = (0..n).map(|i| 0.5 + (i % 3) as f64).collect();
    DataSource::from_columns([("pt", pt), ("eta", eta), ("w", w)]).unwrap()
}

fn pt_binning() -> Arc<Binning> {
    Arc::new(Binning::new("pt", "p_{T}", vec![0.0, 20.0, 40.0, 60.0]).unwrap())
}

fn tree(depth: usize, branching: usize, name: String) -> RegionSpec {
    let mut spec = RegionSpec::new(name.clone(), "pt > 0");
    if depth > 1 {
        for i in 0..branching {
            spec.add_subregion(tree(depth - 1, branching, format!("{name}_{i}"))).unwrap();
        }
    }
    spec
}

fn assert_mirrors(spec: &RegionSpec, dir: &Directory, records: &[&str]) {
    assert_eq!(dir.record_names().collect::<Vec<_>>(), records, "records of {}", spec.name());
    let children: Vec<&str> = spec.subregions().map(|(_, s)| s.name()).collect();
    assert_eq!(dir.dir_names().collect::<Vec<_>>(), children, "subdirectories of {}", spec.name());
    for (_, sub) in spec.subregions() {
        assert_mirrors(sub, dir.dir(sub.name()).unwrap(), records);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn persisted_hierarchy_mirrors_region_tree(depth in 1usize..4, branching in 1usize..4) {
        let spec = tree(depth, branching, "r".to_string());
        let hists: Vec<AggregationSpec> = vec![
            Histogram1DSpec::new("h_pt", "", pt_binning(), "pt", "w").into(),
            Histogram1DSpec::new("h_eta", "", pt_binning(), "eta", "").into(),
        ];
        let mut node = FrameNode::from_source(events());
        spec.apply(&mut node, &hists).unwrap();

        let expected: usize = (0..depth).map(|d| branching.pow(d as u32)).sum::<usize>() * 2;
        prop_assert_eq!(node.collect_all().len(), expected);

        run_graphs(&node.collect_all()).unwrap();
        let mut root = Directory::new();
        node.persist_all(&mut root).unwrap();
        prop_assert!(root.record_names().next().is_none());
        assert_mirrors(&spec, root.dir("r").unwrap(), &["h_pt", "h_eta"]);
    }

    #[test]
    fn only_booked_branch_is_persisted(
        depth in 2usize..5,
        branching in 2usize..4,
        choice in prop::collection::vec(0usize..4, 4),
    ) {
        let spec = tree(depth, branching, "r".to_string());
        let mut node = FrameNode::from_source(events());
        spec.apply(&mut node, &[]).unwrap();

        let mut path = vec!["r".to_string()];
        for level in 1..depth {
            let i = choice[level - 1] % branching;
            path.push(format!("{}_{i}", path[level - 1]));
        }
        let mut leaf = &mut node;
        for name in &path {
            leaf = leaf.lookup_mut(name).unwrap();
        }
        leaf.book_histogram1d(&Histogram1DSpec::new("h", "", pt_binning(), "pt", "")).unwrap();

        run_graphs(&node.collect_all()).unwrap();
        let mut root = Directory::new();
        node.persist_all(&mut root).unwrap();

        let mut dir = &root;
        for name in &path {
            prop_assert_eq!(dir.dir_names().collect::<Vec<_>>(), vec![name.as_str()]);
            prop_assert!(dir.record_names().next().is_none());
            dir = dir.dir(name).unwrap();
        }
        prop_assert_eq!(dir.record_names().collect::<Vec<_>>(), vec!["h"]);
        prop_assert_eq!(dir.dir_names().count(), 0);
    }
}

#[test]
fn combinatorial_regions_partition_inclusive_histogram() {
    let dir = tempfile::tempdir().unwrap();
    let pt = pt_binning();
    let eta = Binning::new("eta", "#eta", vec![-2.5, -1.0, 1.0, 2.5]).unwrap();
    let small_pt = Binning::new("pt", "", vec![0.0, 30.0, 60.0]).unwrap();

    let mut incl = RegionSpec::new("incl", "");
    assert_eq!(generate_combinatorial_regions(&mut incl, &[&small_pt, &eta]).unwrap(), 6);

    let hists: Vec<AggregationSpec> = vec![
        Histogram1DSpec::new("h_pt", "", Arc::clone(&pt), "pt", "w").into(),
        Histogram2DSpec::new("h_pt_eta", "", Arc::clone(&pt), Arc::new(eta.clone()), "pt", "eta", "")
            .into(),
    ];
    let mut node = FrameNode::from_source(events());
    node.filter("positive", "pt > 0").unwrap();
    incl.apply(&mut node, &hists).unwrap();

    let mut frames = IndexMap::new();
    frames.insert("sample".to_string(), node);
    let mut report = Vec::new();
    let summaries = run_all_with(&frames, dir.path(), &RunOptions::default(), &mut report).unwrap();
    assert_eq!(summaries[0].count, 40);

    let file = OutputFile::open(artifact_path(dir.path(), "sample")).unwrap();
    let incl_dir = file.root().dir("incl").unwrap();
    let cells: Vec<&str> = incl_dir.dir_names().collect();
    assert_eq!(cells, ["pt0_eta0", "pt0_eta1", "pt0_eta2", "pt1_eta0", "pt1_eta1", "pt1_eta2"]);

    let inclusive = incl_dir.record("h_pt").unwrap().as_hist1d().unwrap();
    let summed: f64 = cells
        .iter()
        .map(|c| incl_dir.get(&format!("{c}/h_pt")).unwrap().as_hist1d().unwrap().integral())
        .sum();
    assert_relative_eq!(summed, inclusive.integral(), epsilon = 1e-9);

    let entries: u64 = cells
        .iter()
        .map(|c| incl_dir.get(&format!("{c}/h_pt_eta")).unwrap().as_hist2d().unwrap().entries)
        .sum();
    assert_eq!(entries, incl_dir.record("h_pt_eta").unwrap().as_hist2d().unwrap().entries);

    let text = String::from_utf8(report).unwrap();
    assert!(text.starts_with("sample #events final: 40\n"));
    assert!(text.contains("pt0_eta0"));
}
