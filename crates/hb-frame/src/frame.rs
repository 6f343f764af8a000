//! [`LazyFrame`]: a cheap, immutable handle onto a node of the lazy graph.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::datasource::DataSource;
use crate::deferred::{ActionKind, Deferred};
use crate::error::{FrameError, Result};
use crate::expr::CompiledExpr;
use crate::graph::{Node, NodeKind};
use crate::histogram::{Hist1D, Hist1DModel, Hist2D, Hist2DModel, Profile1D};
use crate::report::{CutInfo, CutflowReport};

/// Handle onto one node of a lazy computation graph.
///
/// Transformations ([`define`](Self::define), [`filter`](Self::filter),
/// [`range`](Self::range)) return a new handle and leave `self` untouched.
/// Actions ([`count`](Self::count), [`histo1d`](Self::histo1d), ...) return
/// [`Deferred`] placeholders that are filled by [`run_graphs`](crate::run_graphs).
#[derive(Clone)]
pub struct LazyFrame {
    node: Arc<Node>,
}

impl fmt::Debug for LazyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.node.kind {
            NodeKind::Source => "source".to_string(),
            NodeKind::Define { name, .. } => format!("define({name})"),
            NodeKind::Filter { label, expr, .. } => format!("filter({label}: {})", expr.source()),
            NodeKind::Range { limit } => format!("range({limit})"),
        };
        f.debug_struct("LazyFrame").field("graph", &self.node.graph.id).field("node", &kind).finish()
    }
}

impl LazyFrame {
    /// Root handle over `source`. Each call starts an independent graph.
    pub fn new(source: DataSource) -> Self {
        Self::from_shared(Arc::new(source))
    }

    /// Root handle over a shared source.
    pub fn from_shared(source: Arc<DataSource>) -> Self {
        Self { node: Node::root(source) }
    }

    fn derive(&self, kind: NodeKind) -> Self {
        Self { node: self.node.child(kind) }
    }

    /// Compile `expr` against the columns visible at this node.
    fn compile(&self, expr: &str) -> Result<CompiledExpr> {
        let compiled = CompiledExpr::compile_with(expr, self.node.graph.source.lookups())?;
        if let Some(missing) = compiled.columns().iter().find(|c| self.node.resolve(c).is_none()) {
            return Err(FrameError::UnknownColumn { column: missing.clone(), expr: expr.to_string() });
        }
        Ok(compiled)
    }

    fn compile_weight(&self, weight: &str) -> Result<Option<CompiledExpr>> {
        if weight.trim().is_empty() { Ok(None) } else { self.compile(weight).map(Some) }
    }

    /// Add a computed column. Redefining an existing name shadows it downstream.
    pub fn define(&self, name: &str, expr: &str) -> Result<Self> {
        if !is_identifier(name) {
            return Err(FrameError::InvalidArgument(format!("invalid column name '{name}'")));
        }
        let expr = self.compile(expr)?;
        Ok(self.derive(NodeKind::Define { name: name.to_string(), expr }))
    }

    /// Keep rows where `expr` is true (`> 0`).
    ///
    /// A non-empty `label` registers the filter in the cutflow report.
    pub fn filter(&self, expr: &str, label: &str) -> Result<Self> {
        let expr = self.compile(expr)?;
        Ok(self.derive(NodeKind::Filter { label: label.to_string(), expr, stats: Default::default() }))
    }

    /// Keep at most the first `limit` selected rows.
    pub fn range(&self, limit: usize) -> Self {
        self.derive(NodeKind::Range { limit })
    }

    /// Deferred number of selected rows.
    pub fn count(&self) -> Deferred<u64> {
        Deferred::new(Arc::clone(&self.node), "count", ActionKind::Count)
    }

    /// Deferred 1D histogram of `x`. An empty `weight` fills with unit weight.
    pub fn histo1d(&self, model: Hist1DModel, x: &str, weight: &str) -> Result<Deferred<Hist1D>> {
        let x = self.compile(x)?;
        let w = self.compile_weight(weight)?;
        let label = model.name.clone();
        Ok(Deferred::new(Arc::clone(&self.node), label, ActionKind::Histo1D { model, x, w }))
    }

    /// Deferred 2D histogram of `(x, y)`.
    pub fn histo2d(
        &self,
        model: Hist2DModel,
        x: &str,
        y: &str,
        weight: &str,
    ) -> Result<Deferred<Hist2D>> {
        let x = self.compile(x)?;
        let y = self.compile(y)?;
        let w = self.compile_weight(weight)?;
        let label = model.name.clone();
        Ok(Deferred::new(Arc::clone(&self.node), label, ActionKind::Histo2D { model, x, y, w }))
    }

    /// Deferred profile of `y` versus `x`.
    pub fn profile1d(
        &self,
        model: Hist1DModel,
        x: &str,
        y: &str,
        weight: &str,
    ) -> Result<Deferred<Profile1D>> {
        let x = self.compile(x)?;
        let y = self.compile(y)?;
        let w = self.compile_weight(weight)?;
        let label = model.name.clone();
        Ok(Deferred::new(Arc::clone(&self.node), label, ActionKind::Profile1D { model, x, y, w }))
    }

    /// Cutflow of named filters, with counts from the last event loop.
    ///
    /// On a root handle this lists every named filter of the graph in
    /// registration order; otherwise the named filters upstream of this node.
    pub fn report(&self) -> CutflowReport {
        let filters =
            if self.node.is_source() { self.node.graph.named_filters() } else { self.node.upstream_filters() };
        let cuts = filters
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Filter { label, stats, .. } => {
                    let (all, pass) = stats.load();
                    Some(CutInfo { label: label.clone(), all, pass })
                }
                _ => None,
            })
            .collect();
        CutflowReport { cuts }
    }

    /// Write the selected rows to a Parquet file, executing immediately.
    ///
    /// An empty `columns` list writes every visible column. Returns the
    /// number of rows written.
    pub fn snapshot(&self, path: &Path, columns: &[&str]) -> Result<u64> {
        let columns: Vec<String> = if columns.is_empty() {
            self.column_names()
        } else {
            columns.iter().map(|c| c.to_string()).collect()
        };
        crate::snapshot::write_snapshot(&self.node, path, &columns)
    }

    /// Columns visible at this node: source columns, then defines in order.
    pub fn column_names(&self) -> Vec<String> {
        self.node.visible_columns()
    }

    /// Whether `name` is visible at this node.
    pub fn has_column(&self, name: &str) -> bool {
        self.node.resolve(name).is_some()
    }

    /// Number of rows in the underlying source.
    pub fn source_entries(&self) -> usize {
        self.node.graph.source.n_entries()
    }

    /// Whether two handles belong to the same graph.
    pub fn same_graph(&self, other: &LazyFrame) -> bool {
        Arc::ptr_eq(&self.node.graph, &other.node.graph)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
