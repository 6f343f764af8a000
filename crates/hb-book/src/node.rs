//! [`FrameNode`]: a lazy frame plus its booked aggregations and child regions.

use std::path::Path;

use hb_frame::{
    CutflowReport, DataSource, Deferred, Hist1D, Hist2D, LazyFrame, Profile1D, ResultHandle,
};
use hb_output::{Directory, Record};
use indexmap::IndexMap;

use crate::error::{BookError, Result};
use crate::spec::{AggregationSpec, Histogram1DSpec, Histogram2DSpec, Profile1DSpec};

/// A booked, not necessarily computed, aggregation.
#[derive(Debug, Clone)]
pub enum Booked {
    /// 1D histogram.
    Hist1D(Deferred<Hist1D>),
    /// 2D histogram.
    Hist2D(Deferred<Hist2D>),
    /// 1D profile.
    Profile1D(Deferred<Profile1D>),
}

impl Booked {
    /// Type-erased handle for the trigger.
    pub fn handle(&self) -> ResultHandle {
        match self {
            Booked::Hist1D(d) => d.into(),
            Booked::Hist2D(d) => d.into(),
            Booked::Profile1D(d) => d.into(),
        }
    }

    /// Whether the trigger has produced the value.
    pub fn is_ready(&self) -> bool {
        match self {
            Booked::Hist1D(d) => d.is_ready(),
            Booked::Hist2D(d) => d.is_ready(),
            Booked::Profile1D(d) => d.is_ready(),
        }
    }

    /// Computed value as an output record.
    pub fn record(&self) -> Result<Record> {
        Ok(match self {
            Booked::Hist1D(d) => Record::Hist1D(d.get()?.clone()),
            Booked::Hist2D(d) => Record::Hist2D(d.get()?.clone()),
            Booked::Profile1D(d) => Record::Profile1D(d.get()?.clone()),
        })
    }
}

/// One selection scope of an analysis.
///
/// The node owns a lazy frame handle that every [`define`](Self::define),
/// [`filter`](Self::filter) and [`range`](Self::range) replaces, a set of
/// aggregations booked against that handle, and its child regions. Children
/// are owned by value and reached by name only.
#[derive(Debug)]
pub struct FrameNode {
    handle: LazyFrame,
    root_handle: LazyFrame,
    booked: IndexMap<String, Booked>,
    children: IndexMap<String, FrameNode>,
    has_bookings: bool,
}

impl FrameNode {
    /// Wrap a frame handle. The handle is also kept as the cutflow root.
    pub fn new(handle: LazyFrame) -> Self {
        Self {
            root_handle: handle.clone(),
            handle,
            booked: IndexMap::new(),
            children: IndexMap::new(),
            has_bookings: false,
        }
    }

    /// Node over a fresh graph of `source`.
    pub fn from_source(source: DataSource) -> Self {
        Self::new(LazyFrame::new(source))
    }

    /// Current frame handle.
    pub fn handle(&self) -> &LazyFrame {
        &self.handle
    }

    /// Add a derived column; a repeated name shadows the earlier one.
    pub fn define(&mut self, name: &str, expr: &str) -> Result<()> {
        self.handle = self.handle.define(name, expr)?;
        Ok(())
    }

    /// Keep rows passing `expr`; `name` labels the cut in the cutflow.
    pub fn filter(&mut self, name: &str, expr: &str) -> Result<()> {
        self.handle = self.handle.filter(expr, name)?;
        Ok(())
    }

    /// Keep at most `entries` rows at the current selection.
    pub fn range(&mut self, entries: usize) {
        self.handle = self.handle.range(entries);
    }

    /// Replace the handle with `f(handle)`.
    pub fn apply<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(LazyFrame) -> hb_frame::Result<LazyFrame>,
    {
        self.handle = f(self.handle.clone())?;
        Ok(())
    }

    /// Create child region `name`, filtered by `selection` unless it is empty.
    pub fn region(&mut self, name: &str, selection: &str) -> Result<&mut FrameNode> {
        check_name(name)?;
        if self.children.contains_key(name) {
            return Err(BookError::DuplicateRegion(name.to_string()));
        }
        let mut child = FrameNode::new(self.handle.clone());
        if !selection.is_empty() {
            child.filter(name, selection)?;
        }
        log::debug!("region '{name}' created (selection: '{selection}')");
        Ok(self.children.entry(name.to_string()).or_insert(child))
    }

    /// Child region `name`.
    pub fn lookup(&self, name: &str) -> Result<&FrameNode> {
        self.children.get(name).ok_or_else(|| BookError::RegionNotFound(name.to_string()))
    }

    /// Child region `name`, mutable.
    pub fn lookup_mut(&mut self, name: &str) -> Result<&mut FrameNode> {
        self.children.get_mut(name).ok_or_else(|| BookError::RegionNotFound(name.to_string()))
    }

    /// Descendant at a `/`-separated region path.
    pub fn lookup_path(&self, path: &str) -> Result<&FrameNode> {
        path.split('/').try_fold(self, |node, part| node.lookup(part))
    }

    /// Child regions in creation order.
    pub fn regions(&self) -> impl Iterator<Item = (&str, &FrameNode)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn reserve(&self, name: &str) -> Result<()> {
        check_name(name)?;
        if self.booked.contains_key(name) {
            return Err(BookError::DuplicateAggregation(name.to_string()));
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, booked: Booked) {
        log::debug!("booked '{name}'");
        self.booked.insert(name.to_string(), booked);
        self.has_bookings = true;
    }

    /// Book a 1D histogram against the current handle.
    pub fn book_histogram1d(&mut self, spec: &Histogram1DSpec) -> Result<Deferred<Hist1D>> {
        self.reserve(&spec.name)?;
        let d = self.handle.histo1d(spec.model(), &spec.variable, &spec.weight)?;
        self.insert(&spec.name, Booked::Hist1D(d.clone()));
        Ok(d)
    }

    /// Book a 2D histogram against the current handle.
    pub fn book_histogram2d(&mut self, spec: &Histogram2DSpec) -> Result<Deferred<Hist2D>> {
        self.reserve(&spec.name)?;
        let d = self.handle.histo2d(spec.model(), &spec.x_variable, &spec.y_variable, &spec.weight)?;
        self.insert(&spec.name, Booked::Hist2D(d.clone()));
        Ok(d)
    }

    /// Book a profile against the current handle.
    pub fn book_profile1d(&mut self, spec: &Profile1DSpec) -> Result<Deferred<Profile1D>> {
        self.reserve(&spec.name)?;
        let d =
            self.handle.profile1d(spec.model(), &spec.x_variable, &spec.y_variable, &spec.weight)?;
        self.insert(&spec.name, Booked::Profile1D(d.clone()));
        Ok(d)
    }

    /// Book any descriptor.
    pub fn book(&mut self, spec: &AggregationSpec) -> Result<Booked> {
        Ok(match spec {
            AggregationSpec::Hist1D(s) => Booked::Hist1D(self.book_histogram1d(s)?),
            AggregationSpec::Hist2D(s) => Booked::Hist2D(self.book_histogram2d(s)?),
            AggregationSpec::Profile1D(s) => Booked::Profile1D(self.book_profile1d(s)?),
        })
    }

    /// Aggregation booked on this node under `name`.
    pub fn get_obj(&self, name: &str) -> Result<&Booked> {
        self.booked.get(name).ok_or_else(|| BookError::MissingAggregation(name.to_string()))
    }

    /// Names booked on this node, in booking order.
    pub fn booked_names(&self) -> impl Iterator<Item = &str> {
        self.booked.keys().map(String::as_str)
    }

    /// Whether anything was booked directly on this node.
    pub fn has_bookings(&self) -> bool {
        self.has_bookings
    }

    /// Whether anything was booked on this node or any descendant.
    pub fn subtree_has_bookings(&self) -> bool {
        self.has_bookings || self.children.values().any(FrameNode::subtree_has_bookings)
    }

    /// Every booking of the tree: own bookings first, then children in pre-order.
    pub fn collect_all(&self) -> Vec<ResultHandle> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into(&self, out: &mut Vec<ResultHandle>) {
        out.extend(self.booked.values().map(Booked::handle));
        for child in self.children.values() {
            child.collect_into(out);
        }
    }

    /// Deferred number of rows at the current selection.
    pub fn count(&self) -> Deferred<u64> {
        self.handle.count()
    }

    /// Write computed bookings into `dir`, one subdirectory per region.
    ///
    /// Regions without a booking anywhere below them get no subdirectory.
    pub fn persist_all(&self, dir: &mut Directory) -> Result<()> {
        for booked in self.booked.values() {
            dir.write(booked.record()?)?;
        }
        for (name, child) in &self.children {
            if !child.subtree_has_bookings() {
                continue;
            }
            child.persist_all(dir.get_or_create_dir(name)?)?;
        }
        Ok(())
    }

    /// Write computed bookings into the single directory `dir`, each named
    /// `<name><suffix>`; a region's suffix extends its parent's by `_<region>`.
    pub fn persist_all_flat(&self, dir: &mut Directory, suffix: &str) -> Result<()> {
        for (name, booked) in &self.booked {
            dir.write(booked.record()?.renamed(format!("{name}{suffix}")))?;
        }
        for (name, child) in &self.children {
            if !child.subtree_has_bookings() {
                continue;
            }
            child.persist_all_flat(dir, &format!("{suffix}_{name}"))?;
        }
        Ok(())
    }

    /// Cutflow of the filters known at construction time of this node.
    pub fn cutflow(&self) -> CutflowReport {
        self.root_handle.report()
    }

    /// Write the current selection to Parquet; empty `columns` writes all.
    pub fn snapshot(&self, path: &Path, columns: &[&str]) -> Result<u64> {
        Ok(self.handle.snapshot(path, columns)?)
    }
}

/// Region and aggregation names become directory and record names.
fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(BookError::InvalidName(name.to_string()));
    }
    Ok(())
}
