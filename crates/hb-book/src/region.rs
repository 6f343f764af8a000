//! Declarative region trees and combinatorial region generation.

use indexmap::IndexMap;

use crate::binning::Binning;
use crate::bulk::bulk_book;
use crate::error::{BookError, Result};
use crate::node::FrameNode;
use crate::spec::AggregationSpec;

/// A named selection with optional sub-regions, independent of any data.
///
/// Sub-regions are keyed by `<parent>/<child>`; applying the tree creates
/// one [`FrameNode`] region per spec, named by the spec's own name.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSpec {
    name: String,
    selection: String,
    subregions: IndexMap<String, RegionSpec>,
}

impl RegionSpec {
    /// Region `name` selected by `selection` (empty for no extra cut).
    pub fn new(name: impl Into<String>, selection: impl Into<String>) -> Self {
        Self { name: name.into(), selection: selection.into(), subregions: IndexMap::new() }
    }

    /// Region name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selection expression.
    pub fn selection(&self) -> &str {
        &self.selection
    }

    /// Sub-regions with their composite keys, in insertion order.
    pub fn subregions(&self) -> impl Iterator<Item = (&str, &RegionSpec)> {
        self.subregions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of direct sub-regions.
    pub fn n_subregions(&self) -> usize {
        self.subregions.len()
    }

    /// Register `child` under `<self.name>/<child.name>`.
    pub fn add_subregion(&mut self, child: RegionSpec) -> Result<()> {
        let key = format!("{}/{}", self.name, child.name);
        if self.subregions.contains_key(&key) {
            return Err(BookError::DuplicateRegion(key));
        }
        self.subregions.insert(key, child);
        Ok(())
    }

    /// Builder form of [`add_subregion`](Self::add_subregion).
    pub fn with_subregion(mut self, child: RegionSpec) -> Result<Self> {
        self.add_subregion(child)?;
        Ok(self)
    }

    /// Materialize this tree under `target` and book `specs` into every node.
    pub fn apply(&self, target: &mut FrameNode, specs: &[AggregationSpec]) -> Result<()> {
        self.apply_weighted(target, specs, None)
    }

    /// [`apply`](Self::apply) with an extra weight factor on every booking.
    pub fn apply_weighted(
        &self,
        target: &mut FrameNode,
        specs: &[AggregationSpec],
        extra_weight: Option<&str>,
    ) -> Result<()> {
        let node = target.region(&self.name, &self.selection)?;
        bulk_book(node, specs, extra_weight)?;
        for sub in self.subregions.values() {
            sub.apply_weighted(node, specs, extra_weight)?;
        }
        Ok(())
    }
}

/// Add one sub-region per cell of the Cartesian product of `binnings` to `root`.
///
/// Cells are enumerated with the last binning varying fastest. A cell is
/// named `<name0><i0>_<name1><i1>...` and selected by
/// `name0 >= lo0 && name0 < hi0 && name1 >= lo1 && ...`, using each
/// binning's name as the variable. Returns the number of regions added; an
/// empty binning list adds none.
pub fn generate_combinatorial_regions(root: &mut RegionSpec, binnings: &[&Binning]) -> Result<usize> {
    if binnings.is_empty() {
        return Ok(0);
    }
    let mut index = vec![0usize; binnings.len()];
    let mut added = 0;
    loop {
        let mut names = Vec::with_capacity(binnings.len());
        let mut cuts = Vec::with_capacity(binnings.len());
        for (b, &i) in binnings.iter().zip(&index) {
            let e = b.edges();
            names.push(format!("{}{i}", b.name()));
            cuts.push(format!("{name} >= {} && {name} < {}", e[i], e[i + 1], name = b.name()));
        }
        root.add_subregion(RegionSpec::new(names.join("_"), cuts.join(" && ")))?;
        added += 1;

        // Odometer step, last dimension fastest.
        let mut d = binnings.len();
        loop {
            if d == 0 {
                log::debug!("generated {added} regions under '{}'", root.name);
                return Ok(added);
            }
            d -= 1;
            index[d] += 1;
            if index[d] < binnings[d].n_bins() {
                break;
            }
            index[d] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sub(spec: &RegionSpec) -> Vec<(String, String)> {
        spec.subregions().map(|(_, s)| (s.name().to_string(), s.selection().to_string())).collect()
    }

    #[test]
    fn single_binning_regions() {
        let pt = Binning::new("pt", "", vec![0.0, 10.0, 20.0, 30.0]).unwrap();
        let mut root = RegionSpec::new("incl", "");
        assert_eq!(generate_combinatorial_regions(&mut root, &[&pt]).unwrap(), 3);
        assert_eq!(
            sub(&root),
            [
                ("pt0".to_string(), "pt >= 0 && pt < 10".to_string()),
                ("pt1".to_string(), "pt >= 10 && pt < 20".to_string()),
                ("pt2".to_string(), "pt >= 20 && pt < 30".to_string()),
            ]
        );
        assert_eq!(root.subregions().next().unwrap().0, "incl/pt0");
    }

    #[test]
    fn two_binnings_give_all_ordered_pairs() {
        let a = Binning::new("a", "", vec![0.0, 1.0, 2.0]).unwrap();
        let b = Binning::new("b", "", vec![0.0, 0.5, 1.5, 2.5]).unwrap();
        let mut root = RegionSpec::new("r", "");
        assert_eq!(generate_combinatorial_regions(&mut root, &[&a, &b]).unwrap(), 6);
        let names: Vec<String> = sub(&root).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a0_b0", "a0_b1", "a0_b2", "a1_b0", "a1_b1", "a1_b2"]);
        assert_eq!(sub(&root)[4].1, "a >= 1 && a < 2 && b >= 0.5 && b < 1.5");
    }

    #[test]
    fn regenerating_collides() {
        let a = Binning::new("a", "", vec![0.0, 1.0]).unwrap();
        let mut root = RegionSpec::new("r", "");
        generate_combinatorial_regions(&mut root, &[&a]).unwrap();
        let err = generate_combinatorial_regions(&mut root, &[&a]).unwrap_err();
        assert!(matches!(err, BookError::DuplicateRegion(k) if k == "r/a0"));
        assert_eq!(generate_combinatorial_regions(&mut root, &[]).unwrap(), 0);
    }

    #[test]
    fn same_child_name_under_different_parents() {
        let mut a = RegionSpec::new("a", "");
        a.add_subregion(RegionSpec::new("x", "")).unwrap();
        let mut b = RegionSpec::new("b", "");
        b.add_subregion(RegionSpec::new("x", "")).unwrap();
        assert!(a.add_subregion(RegionSpec::new("x", "1")).is_err());
    }

    proptest! {
        #[test]
        fn combinatorial_count_is_product(sizes in prop::collection::vec(1usize..5, 1..4)) {
            let binnings: Vec<Binning> = sizes
                .iter()
                .enumerate()
                .map(|(d, &n)| Binning::uniform(format!("v{d}"), "", n, 0.0, n as f64).unwrap())
                .collect();
            let refs: Vec<&Binning> = binnings.iter().collect();
            let mut root = RegionSpec::new("r", "");
            let added = generate_combinatorial_regions(&mut root, &refs).unwrap();
            prop_assert_eq!(added, sizes.iter().product::<usize>());
            prop_assert_eq!(root.n_subregions(), added);
        }

        #[test]
        fn one_dimension_partitions_edge_range(
            edges in prop::collection::btree_set(-1000i32..1000, 2..12),
            probe in -1000.0f64..1000.0,
        ) {
            let edges: Vec<f64> = edges.into_iter().map(f64::from).collect();
            let b = Binning::new("x", "", edges.clone()).unwrap();
            let mut root = RegionSpec::new("r", "");
            generate_combinatorial_regions(&mut root, &[&b]).unwrap();

            let lo = edges[0];
            let hi = edges[edges.len() - 1];
            let matching = root
                .subregions()
                .filter(|(_, s)| {
                    let c = hb_frame::CompiledExpr::compile(s.selection()).unwrap();
                    c.eval_row(&[probe]) != 0.0
                })
                .count();
            let inside = probe >= lo && probe < hi;
            prop_assert_eq!(matching, usize::from(inside));
        }
    }
}
