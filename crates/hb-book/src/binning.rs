//! Named bin-edge sequences.

use hb_frame::BinEdges;

use crate::error::{BookError, Result};

/// An immutable named binning.
///
/// Edges are strictly increasing and finite, with at least two of them.
/// Share one binning between descriptors and region generation through
/// `Arc<Binning>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Binning {
    name: String,
    title: String,
    edges: BinEdges,
}

impl Binning {
    /// Create a binning from explicit edges.
    pub fn new(name: impl Into<String>, title: impl Into<String>, edges: Vec<f64>) -> Result<Self> {
        let name = name.into();
        let edges = BinEdges::new(edges)
            .map_err(|e| BookError::InvalidBinning { name: name.clone(), reason: e.to_string() })?;
        Ok(Self { name, title: title.into(), edges })
    }

    /// `n` equal-width bins over `[low, high)`.
    pub fn uniform(
        name: impl Into<String>,
        title: impl Into<String>,
        n: usize,
        low: f64,
        high: f64,
    ) -> Result<Self> {
        let name = name.into();
        if n == 0 {
            return Err(BookError::InvalidBinning { name, reason: "zero bins".into() });
        }
        let width = (high - low) / n as f64;
        let mut edges: Vec<f64> = (0..n).map(|i| low + i as f64 * width).collect();
        edges.push(high);
        Self::new(name, title, edges)
    }

    /// Binning name; also the variable name used in generated region selections.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Bin edges.
    pub fn edges(&self) -> &[f64] {
        self.edges.as_slice()
    }

    /// Number of bins (`edges().len() - 1`).
    pub fn n_bins(&self) -> usize {
        self.edges.n_bins()
    }

    /// `[low, high)` of bin `i`.
    pub fn bin_range(&self, i: usize) -> Option<(f64, f64)> {
        let e = self.edges.as_slice();
        (i + 1 < e.len()).then(|| (e[i], e[i + 1]))
    }

    /// Edges in the engine's native form.
    pub fn to_edges(&self) -> BinEdges {
        self.edges.clone()
    }
}

impl AsRef<Binning> for Binning {
    fn as_ref(&self) -> &Binning {
        self
    }
}
