//! Event loop: executes every pending action of a graph in one pass.
//!
//! Within a run each node's selection and each defined column is computed
//! at most once and shared by all actions downstream of it. Expression
//! evaluation is chunked over rows and actions are filled in parallel with
//! rayon; independent graphs run concurrently. Results and filter counters
//! are committed only after every graph succeeded, so a failed run leaves
//! all handles unset and every cutflow as it was.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::datasource::DataSource;
use crate::deferred::{ActionKind, Computed, ResultHandle};
use crate::error::{FrameError, Result};
use crate::expr::CompiledExpr;
use crate::graph::{Graph, Node, NodeKind, Origin};
use crate::histogram::{Hist1D, Hist2D, Profile1D};

/// Rows per parallel evaluation chunk.
const CHUNK_ROWS: usize = 16 * 1024;

/// Configure the global rayon pool used by the event loop.
///
/// `n_threads == 0` lets rayon pick the number of logical CPUs. Only the
/// first call has an effect; later calls are logged and ignored.
pub fn enable_implicit_mt(n_threads: usize) {
    match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build_global() {
        Ok(()) => log::info!("implicit multi-threading enabled ({} threads)", rayon::current_num_threads()),
        Err(e) => log::debug!("global thread pool already configured: {e}"),
    }
}

/// Run every unresolved handle in `handles`, one event loop per graph.
///
/// Returns the number of results computed by this call. Handles that are
/// already resolved are skipped, so each action runs at most once.
pub fn run_graphs(handles: &[ResultHandle]) -> Result<usize> {
    let start = Instant::now();
    let mut seen = HashSet::new();
    let mut groups: Vec<(Arc<Graph>, Vec<&ResultHandle>)> = Vec::new();
    for h in handles {
        if h.is_ready() || !seen.insert(h.key()) {
            continue;
        }
        let graph = &h.node().graph;
        match groups.iter_mut().find(|(g, _)| g.id == graph.id) {
            Some((_, members)) => members.push(h),
            None => groups.push((Arc::clone(graph), vec![h])),
        }
    }
    if groups.is_empty() {
        return Ok(0);
    }

    let computed: Vec<(Vec<Computed>, FilterCounts)> =
        groups.par_iter().map(|(graph, members)| execute_graph(graph, members)).collect::<Result<_>>()?;

    let mut n = 0;
    for ((_, members), (values, counts)) in groups.iter().zip(computed) {
        counts.commit();
        for (h, v) in members.iter().zip(values) {
            h.commit(v)?;
            n += 1;
        }
    }
    log::info!(
        "event loop: {n} results from {} graph(s) in {:.3} s",
        groups.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(n)
}

fn execute_graph(graph: &Graph, handles: &[&ResultHandle]) -> Result<(Vec<Computed>, FilterCounts)> {
    let mut pass = Pass::new(&graph.source);
    let mut jobs = Vec::with_capacity(handles.len());
    for h in handles {
        let node = h.node();
        let rows = pass.selection(node)?;
        let (x, y, w) = h.kind().inputs();
        let x = x.map(|e| pass.eval(node, e, &rows)).transpose()?;
        let y = y.map(|e| pass.eval(node, e, &rows)).transpose()?;
        let w = w.map(|e| pass.eval(node, e, &rows)).transpose()?;
        jobs.push((h.kind(), Inputs { n_rows: rows.len(), x, y, w }));
    }
    log::debug!(
        "graph {}: {} actions over {} entries",
        graph.id,
        jobs.len(),
        graph.source.n_entries()
    );
    let counts = pass.into_filter_counts();
    Ok((jobs.into_par_iter().map(|(kind, inputs)| fill(kind, inputs)).collect(), counts))
}

struct Inputs {
    n_rows: usize,
    x: Option<Vec<f64>>,
    y: Option<Vec<f64>>,
    w: Option<Vec<f64>>,
}

impl Inputs {
    fn weight(&self, i: usize) -> f64 {
        self.w.as_ref().map_or(1.0, |w| w[i])
    }
}

fn fill(kind: &ActionKind, inputs: Inputs) -> Computed {
    let xs = inputs.x.as_deref().unwrap_or(&[]);
    let ys = inputs.y.as_deref().unwrap_or(&[]);
    match kind {
        ActionKind::Count => Computed::Count(inputs.n_rows as u64),
        ActionKind::Histo1D { model, .. } => {
            let mut h = Hist1D::empty(model);
            for (i, &x) in xs.iter().enumerate() {
                h.fill(x, inputs.weight(i));
            }
            Computed::Hist1D(h)
        }
        ActionKind::Histo2D { model, .. } => {
            let mut h = Hist2D::empty(model);
            for (i, (&x, &y)) in xs.iter().zip(ys).enumerate() {
                h.fill(x, y, inputs.weight(i));
            }
            Computed::Hist2D(h)
        }
        ActionKind::Profile1D { model, .. } => {
            let mut p = Profile1D::empty(model);
            for (i, (&x, &y)) in xs.iter().zip(ys).enumerate() {
                p.fill(x, y, inputs.weight(i));
            }
            Computed::Profile1D(p)
        }
    }
}

/// Pass/all counts of the filters evaluated by one event loop, not yet
/// visible in any cutflow.
#[derive(Default)]
pub(crate) struct FilterCounts(Vec<(Arc<Node>, usize, usize)>);

impl FilterCounts {
    pub(crate) fn commit(self) {
        for (node, all, pass) in self.0 {
            if let NodeKind::Filter { stats, .. } = &node.kind {
                stats.record(all, pass);
            }
        }
    }
}

/// Memoized state of one event loop over a single graph.
pub(crate) struct Pass<'a> {
    source: &'a DataSource,
    selections: HashMap<usize, Arc<Vec<u32>>>,
    defined: HashMap<usize, Arc<Vec<f64>>>,
    counts: FilterCounts,
}

impl<'a> Pass<'a> {
    pub(crate) fn new(source: &'a DataSource) -> Self {
        Self {
            source,
            selections: HashMap::new(),
            defined: HashMap::new(),
            counts: FilterCounts::default(),
        }
    }

    pub(crate) fn into_filter_counts(self) -> FilterCounts {
        self.counts
    }

    /// Row indices selected at `node`, in source order.
    pub(crate) fn selection(&mut self, node: &Arc<Node>) -> Result<Arc<Vec<u32>>> {
        if let Some(rows) = self.selections.get(&node.id) {
            return Ok(Arc::clone(rows));
        }
        let rows = match (&node.kind, &node.parent) {
            (NodeKind::Source, _) => {
                let n = u32::try_from(self.source.n_entries()).map_err(|_| {
                    FrameError::Execution(format!(
                        "{} entries exceed the supported row count",
                        self.source.n_entries()
                    ))
                })?;
                Arc::new((0..n).collect::<Vec<u32>>())
            }
            (NodeKind::Define { expr, .. }, Some(parent)) => {
                let rows = self.selection(parent)?;
                let values = self.eval(parent, expr, &rows)?;
                let mut full = vec![f64::NAN; self.source.n_entries()];
                for (&r, v) in rows.iter().zip(values) {
                    full[r as usize] = v;
                }
                self.defined.insert(node.id, Arc::new(full));
                rows
            }
            (NodeKind::Filter { expr, .. }, Some(parent)) => {
                let rows = self.selection(parent)?;
                let mask = self.eval(parent, expr, &rows)?;
                let kept: Vec<u32> =
                    rows.iter().zip(&mask).filter(|(_, m)| **m > 0.0).map(|(&r, _)| r).collect();
                self.counts.0.push((Arc::clone(node), rows.len(), kept.len()));
                Arc::new(kept)
            }
            (NodeKind::Range { limit }, Some(parent)) => {
                let rows = self.selection(parent)?;
                if rows.len() <= *limit { rows } else { Arc::new(rows[..*limit].to_vec()) }
            }
            (_, None) => {
                return Err(FrameError::Execution("non-source node without a parent".into()));
            }
        };
        self.selections.insert(node.id, Arc::clone(&rows));
        Ok(rows)
    }

    /// Full-length values of `name` as visible at `at`.
    pub(crate) fn column(&mut self, at: &Arc<Node>, name: &str) -> Result<Arc<Vec<f64>>> {
        match at.resolve(name) {
            Some(Origin::Source) => self.source.column(name).cloned().ok_or_else(|| {
                FrameError::Execution(format!("source column '{name}' disappeared"))
            }),
            Some(Origin::Defined(def)) => {
                self.selection(&def)?;
                self.defined.get(&def.id).cloned().ok_or_else(|| {
                    FrameError::Execution(format!("defined column '{name}' was not computed"))
                })
            }
            None => Err(FrameError::UnknownColumn { column: name.to_string(), expr: String::new() }),
        }
    }

    /// Evaluate `expr` at `at` for the given rows.
    pub(crate) fn eval(&mut self, at: &Arc<Node>, expr: &CompiledExpr, rows: &[u32]) -> Result<Vec<f64>> {
        let cols =
            expr.columns().iter().map(|c| self.column(at, c)).collect::<Result<Vec<_>>>()?;
        let slices: Vec<&[f64]> = cols.iter().map(|c| c.as_slice()).collect();
        if rows.len() <= CHUNK_ROWS {
            return Ok(expr.eval_rows(&slices, rows));
        }
        let parts: Vec<Vec<f64>> =
            rows.par_chunks(CHUNK_ROWS).map(|chunk| expr.eval_rows(&slices, chunk)).collect();
        Ok(parts.concat())
    }
}
