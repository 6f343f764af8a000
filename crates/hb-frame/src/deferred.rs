//! Deferred results: placeholders filled in by the next event loop.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::{FrameError, Result};
use crate::expr::CompiledExpr;
use crate::graph::Node;
use crate::histogram::{Hist1D, Hist1DModel, Hist2D, Hist2DModel, Profile1D};

pub(crate) enum ActionKind {
    Count,
    Histo1D { model: Hist1DModel, x: CompiledExpr, w: Option<CompiledExpr> },
    Histo2D { model: Hist2DModel, x: CompiledExpr, y: CompiledExpr, w: Option<CompiledExpr> },
    Profile1D { model: Hist1DModel, x: CompiledExpr, y: CompiledExpr, w: Option<CompiledExpr> },
}

impl ActionKind {
    /// Expressions evaluated per selected row: x, optional y, optional weight.
    pub(crate) fn inputs(&self) -> (Option<&CompiledExpr>, Option<&CompiledExpr>, Option<&CompiledExpr>) {
        match self {
            ActionKind::Count => (None, None, None),
            ActionKind::Histo1D { x, w, .. } => (Some(x), None, w.as_ref()),
            ActionKind::Histo2D { x, y, w, .. } | ActionKind::Profile1D { x, y, w, .. } => {
                (Some(x), Some(y), w.as_ref())
            }
        }
    }
}

pub(crate) struct Action<T> {
    pub(crate) node: Arc<Node>,
    pub(crate) label: String,
    pub(crate) kind: ActionKind,
    value: OnceLock<T>,
}

/// Handle to a result that becomes available after the graph has run.
///
/// Cloning the handle is cheap and every clone observes the same value.
pub struct Deferred<T> {
    action: Arc<Action<T>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self { action: Arc::clone(&self.action) }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("name", &self.action.label)
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl<T> Deferred<T> {
    pub(crate) fn new(node: Arc<Node>, label: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            action: Arc::new(Action { node, label: label.into(), kind, value: OnceLock::new() }),
        }
    }

    /// The computed value, or [`FrameError::NotReady`] before the graph has run.
    pub fn get(&self) -> Result<&T> {
        self.action.value.get().ok_or_else(|| FrameError::NotReady(self.action.label.clone()))
    }

    /// Whether the value has been computed.
    pub fn is_ready(&self) -> bool {
        self.action.value.get().is_some()
    }

    /// Result name (histogram name, or `count`).
    pub fn name(&self) -> &str {
        &self.action.label
    }

    fn set(&self, value: T) {
        // A second run of an already resolved action is skipped before
        // execution, so a lost race here only drops an identical value.
        let _ = self.action.value.set(value);
    }
}

/// Type-erased deferred result, used to trigger several results in one event loop.
#[derive(Debug, Clone)]
pub enum ResultHandle {
    /// Row count.
    Count(Deferred<u64>),
    /// 1D histogram.
    Hist1D(Deferred<Hist1D>),
    /// 2D histogram.
    Hist2D(Deferred<Hist2D>),
    /// 1D profile.
    Profile1D(Deferred<Profile1D>),
}

macro_rules! dispatch {
    ($self:expr, $d:ident => $body:expr) => {
        match $self {
            ResultHandle::Count($d) => $body,
            ResultHandle::Hist1D($d) => $body,
            ResultHandle::Hist2D($d) => $body,
            ResultHandle::Profile1D($d) => $body,
        }
    };
}

/// Value produced by executing one action.
pub(crate) enum Computed {
    Count(u64),
    Hist1D(Hist1D),
    Hist2D(Hist2D),
    Profile1D(Profile1D),
}

impl ResultHandle {
    /// Whether the value has been computed.
    pub fn is_ready(&self) -> bool {
        dispatch!(self, d => d.is_ready())
    }

    /// Result name.
    pub fn name(&self) -> &str {
        dispatch!(self, d => d.name())
    }

    pub(crate) fn node(&self) -> &Arc<Node> {
        dispatch!(self, d => &d.action.node)
    }

    pub(crate) fn kind(&self) -> &ActionKind {
        dispatch!(self, d => &d.action.kind)
    }

    /// Identity of the underlying action, shared by all clones.
    pub(crate) fn key(&self) -> usize {
        dispatch!(self, d => Arc::as_ptr(&d.action) as *const () as usize)
    }

    pub(crate) fn commit(&self, value: Computed) -> Result<()> {
        match (self, value) {
            (ResultHandle::Count(d), Computed::Count(v)) => d.set(v),
            (ResultHandle::Hist1D(d), Computed::Hist1D(v)) => d.set(v),
            (ResultHandle::Hist2D(d), Computed::Hist2D(v)) => d.set(v),
            (ResultHandle::Profile1D(d), Computed::Profile1D(v)) => d.set(v),
            _ => {
                return Err(FrameError::Execution(format!(
                    "result type mismatch for '{}'",
                    self.name()
                )));
            }
        }
        Ok(())
    }
}

impl From<Deferred<u64>> for ResultHandle {
    fn from(d: Deferred<u64>) -> Self {
        ResultHandle::Count(d)
    }
}

impl From<Deferred<Hist1D>> for ResultHandle {
    fn from(d: Deferred<Hist1D>) -> Self {
        ResultHandle::Hist1D(d)
    }
}

impl From<Deferred<Hist2D>> for ResultHandle {
    fn from(d: Deferred<Hist2D>) -> Self {
        ResultHandle::Hist2D(d)
    }
}

impl From<Deferred<Profile1D>> for ResultHandle {
    fn from(d: Deferred<Profile1D>) -> Self {
        ResultHandle::Profile1D(d)
    }
}

impl From<&Deferred<u64>> for ResultHandle {
    fn from(d: &Deferred<u64>) -> Self {
        ResultHandle::Count(d.clone())
    }
}

impl From<&Deferred<Hist1D>> for ResultHandle {
    fn from(d: &Deferred<Hist1D>) -> Self {
        ResultHandle::Hist1D(d.clone())
    }
}

impl From<&Deferred<Hist2D>> for ResultHandle {
    fn from(d: &Deferred<Hist2D>) -> Self {
        ResultHandle::Hist2D(d.clone())
    }
}

impl From<&Deferred<Profile1D>> for ResultHandle {
    fn from(d: &Deferred<Profile1D>) -> Self {
        ResultHandle::Profile1D(d.clone())
    }
}
