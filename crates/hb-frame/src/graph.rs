//! Immutable computation-graph nodes shared between frame handles.
//!
//! A node never changes after construction; transformations append a child
//! node pointing at its parent. Every node of one data source belongs to the
//! same [`Graph`], which also keeps the registration order of named filters
//! for the cutflow report.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::datasource::DataSource;
use crate::expr::CompiledExpr;

static NEXT_GRAPH_ID: AtomicUsize = AtomicUsize::new(0);

pub(crate) struct Graph {
    pub(crate) id: usize,
    pub(crate) source: Arc<DataSource>,
    next_node: AtomicUsize,
    filters: Mutex<Vec<Weak<Node>>>,
}

impl Graph {
    pub(crate) fn new(source: Arc<DataSource>) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            source,
            next_node: AtomicUsize::new(0),
            filters: Mutex::new(Vec::new()),
        })
    }

    fn next_node_id(&self) -> usize {
        self.next_node.fetch_add(1, Ordering::Relaxed)
    }

    /// Named filters still reachable from some handle, in creation order.
    pub(crate) fn named_filters(&self) -> Vec<Arc<Node>> {
        let mut filters = self.filters.lock();
        filters.retain(|w| w.strong_count() > 0);
        filters.iter().filter_map(Weak::upgrade).collect()
    }
}

/// Pass/all counters of a filter, overwritten by every successful event loop
/// that evaluates it.
#[derive(Debug, Default)]
pub(crate) struct FilterStats {
    pub(crate) all: AtomicU64,
    pub(crate) pass: AtomicU64,
}

impl FilterStats {
    pub(crate) fn record(&self, all: usize, pass: usize) {
        self.all.store(all as u64, Ordering::Relaxed);
        self.pass.store(pass as u64, Ordering::Relaxed);
    }

    pub(crate) fn load(&self) -> (u64, u64) {
        (self.all.load(Ordering::Relaxed), self.pass.load(Ordering::Relaxed))
    }
}

pub(crate) enum NodeKind {
    Source,
    Define { name: String, expr: CompiledExpr },
    Filter { label: String, expr: CompiledExpr, stats: FilterStats },
    Range { limit: usize },
}

pub(crate) struct Node {
    pub(crate) id: usize,
    pub(crate) graph: Arc<Graph>,
    pub(crate) parent: Option<Arc<Node>>,
    pub(crate) kind: NodeKind,
}

/// Where a column visible at some node comes from.
pub(crate) enum Origin {
    Source,
    Defined(Arc<Node>),
}

impl Node {
    pub(crate) fn root(source: Arc<DataSource>) -> Arc<Self> {
        let graph = Graph::new(source);
        Arc::new(Self { id: graph.next_node_id(), graph, parent: None, kind: NodeKind::Source })
    }

    pub(crate) fn child(self: &Arc<Self>, kind: NodeKind) -> Arc<Self> {
        let named_filter = matches!(&kind, NodeKind::Filter { label, .. } if !label.is_empty());
        let node = Arc::new(Self {
            id: self.graph.next_node_id(),
            graph: Arc::clone(&self.graph),
            parent: Some(Arc::clone(self)),
            kind,
        });
        if named_filter {
            self.graph.filters.lock().push(Arc::downgrade(&node));
        }
        node
    }

    pub(crate) fn is_source(&self) -> bool {
        matches!(self.kind, NodeKind::Source)
    }

    /// This node followed by its ancestors up to the source.
    pub(crate) fn lineage(self: &Arc<Self>) -> impl Iterator<Item = &Arc<Node>> {
        std::iter::successors(Some(self), |n| n.parent.as_ref())
    }

    /// Resolve `name` as seen from this node; the nearest define wins.
    pub(crate) fn resolve(self: &Arc<Self>, name: &str) -> Option<Origin> {
        for n in self.lineage() {
            if let NodeKind::Define { name: defined, .. } = &n.kind
                && defined == name
            {
                return Some(Origin::Defined(Arc::clone(n)));
            }
        }
        self.graph.source.has_column(name).then_some(Origin::Source)
    }

    /// Source columns followed by defined columns in definition order.
    pub(crate) fn visible_columns(self: &Arc<Self>) -> Vec<String> {
        let mut defined: Vec<&str> = self
            .lineage()
            .filter_map(|n| match &n.kind {
                NodeKind::Define { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        defined.reverse();
        let mut out: Vec<String> = self.graph.source.column_names().to_vec();
        for name in defined {
            if !out.iter().any(|c| c == name) {
                out.push(name.to_string());
            }
        }
        out
    }

    /// Named filters between the source and this node, source first.
    pub(crate) fn upstream_filters(self: &Arc<Self>) -> Vec<Arc<Node>> {
        let mut out: Vec<Arc<Node>> = self
            .lineage()
            .filter(|n| matches!(&n.kind, NodeKind::Filter { label, .. } if !label.is_empty()))
            .cloned()
            .collect();
        out.reverse();
        out
    }
}
