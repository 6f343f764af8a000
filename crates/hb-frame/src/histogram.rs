//! Histogram result types filled by the event loop.
//!
//! Bins are half-open `[low, high)`. Values below the first edge go to
//! underflow, values at or above the last edge to overflow. `NaN` values are
//! never filled.

use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};

/// Validated, strictly increasing bin edges (at least two).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct BinEdges(Vec<f64>);

impl BinEdges {
    /// Validate and wrap a list of edges.
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(FrameError::InvalidArgument(format!(
                "bin edges need at least 2 entries, got {}",
                edges.len()
            )));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(FrameError::InvalidArgument("bin edges must be finite".into()));
        }
        if let Some(w) = edges.windows(2).find(|w| w[0] >= w[1]) {
            return Err(FrameError::InvalidArgument(format!(
                "bin edges must be strictly increasing ({} >= {})",
                w[0], w[1]
            )));
        }
        Ok(Self(edges))
    }

    /// Number of bins (`len - 1`).
    pub fn n_bins(&self) -> usize {
        self.0.len() - 1
    }

    /// Edges as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Lower edge of the first bin.
    pub fn low(&self) -> f64 {
        self.0[0]
    }

    /// Upper edge of the last bin.
    pub fn high(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    /// Bin index containing `x`, `None` for under/overflow and `NaN`.
    pub fn find_bin(&self, x: f64) -> Option<usize> {
        if x.is_nan() || x < self.low() || x >= self.high() {
            return None;
        }
        // First edge strictly greater than x; the bin is the one before it.
        let upper = self.0.partition_point(|&e| e <= x);
        Some(upper - 1)
    }
}

impl TryFrom<Vec<f64>> for BinEdges {
    type Error = FrameError;

    fn try_from(v: Vec<f64>) -> Result<Self> {
        Self::new(v)
    }
}

impl From<BinEdges> for Vec<f64> {
    fn from(e: BinEdges) -> Self {
        e.0
    }
}

/// Booking model for a 1D histogram or profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Hist1DModel {
    /// Histogram name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// X axis edges.
    pub edges: BinEdges,
}

impl Hist1DModel {
    /// Create a model.
    pub fn new(name: impl Into<String>, title: impl Into<String>, edges: BinEdges) -> Self {
        Self { name: name.into(), title: title.into(), edges }
    }
}

/// Booking model for a 2D histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Hist2DModel {
    /// Histogram name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// X axis edges.
    pub x_edges: BinEdges,
    /// Y axis edges.
    pub y_edges: BinEdges,
}

impl Hist2DModel {
    /// Create a model.
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        x_edges: BinEdges,
        y_edges: BinEdges,
    ) -> Self {
        Self { name: name.into(), title: title.into(), x_edges, y_edges }
    }
}

/// Filled 1D histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist1D {
    /// Histogram name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Bin edges.
    pub edges: BinEdges,
    /// Sum of weights per bin.
    pub bin_content: Vec<f64>,
    /// Sum of squared weights per bin.
    pub sumw2: Vec<f64>,
    /// Sum of weights below the first edge.
    pub underflow: f64,
    /// Sum of weights at or above the last edge.
    pub overflow: f64,
    /// Underflow sum of squared weights.
    pub underflow_sumw2: f64,
    /// Overflow sum of squared weights.
    pub overflow_sumw2: f64,
    /// Number of in-range fills.
    pub entries: u64,
}

impl Hist1D {
    /// Empty histogram from a booking model.
    pub fn empty(model: &Hist1DModel) -> Self {
        let n = model.edges.n_bins();
        Self {
            name: model.name.clone(),
            title: model.title.clone(),
            edges: model.edges.clone(),
            bin_content: vec![0.0; n],
            sumw2: vec![0.0; n],
            underflow: 0.0,
            overflow: 0.0,
            underflow_sumw2: 0.0,
            overflow_sumw2: 0.0,
            entries: 0,
        }
    }

    /// Fill one value with weight `w`; a NaN value or weight is ignored.
    pub fn fill(&mut self, x: f64, w: f64) {
        if x.is_nan() || w.is_nan() {
            return;
        }
        let w2 = w * w;
        match self.edges.find_bin(x) {
            Some(b) => {
                self.bin_content[b] += w;
                self.sumw2[b] += w2;
                self.entries += 1;
            }
            None if x < self.edges.low() => {
                self.underflow += w;
                self.underflow_sumw2 += w2;
            }
            None => {
                self.overflow += w;
                self.overflow_sumw2 += w2;
            }
        }
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.bin_content.len()
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }
}

/// Filled 2D histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist2D {
    /// Histogram name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// X axis edges.
    pub x_edges: BinEdges,
    /// Y axis edges.
    pub y_edges: BinEdges,
    /// Row-major sum of weights, index `ix * ny + iy`.
    pub bin_content: Vec<f64>,
    /// Row-major sum of squared weights.
    pub sumw2: Vec<f64>,
    /// Sum of weights falling outside either axis.
    pub out_of_range: f64,
    /// Number of in-range fills.
    pub entries: u64,
}

impl Hist2D {
    /// Empty histogram from a booking model.
    pub fn empty(model: &Hist2DModel) -> Self {
        let n = model.x_edges.n_bins() * model.y_edges.n_bins();
        Self {
            name: model.name.clone(),
            title: model.title.clone(),
            x_edges: model.x_edges.clone(),
            y_edges: model.y_edges.clone(),
            bin_content: vec![0.0; n],
            sumw2: vec![0.0; n],
            out_of_range: 0.0,
            entries: 0,
        }
    }

    /// Fill one `(x, y)` pair with weight `w`.
    pub fn fill(&mut self, x: f64, y: f64, w: f64) {
        if x.is_nan() || y.is_nan() || w.is_nan() {
            return;
        }
        match (self.x_edges.find_bin(x), self.y_edges.find_bin(y)) {
            (Some(ix), Some(iy)) => {
                let i = ix * self.y_edges.n_bins() + iy;
                self.bin_content[i] += w;
                self.sumw2[i] += w * w;
                self.entries += 1;
            }
            _ => self.out_of_range += w,
        }
    }

    /// Content of bin `(ix, iy)`.
    pub fn bin(&self, ix: usize, iy: usize) -> f64 {
        self.bin_content[ix * self.y_edges.n_bins() + iy]
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }
}

/// Filled 1D profile: per x-bin weighted mean of a second variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile1D {
    /// Profile name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// X axis edges.
    pub edges: BinEdges,
    /// Sum of weights per bin.
    pub sum_w: Vec<f64>,
    /// Sum of squared weights per bin.
    pub sum_w2: Vec<f64>,
    /// Sum of `w * y` per bin.
    pub sum_wy: Vec<f64>,
    /// Sum of `w * y^2` per bin.
    pub sum_wy2: Vec<f64>,
    /// Number of in-range fills.
    pub entries: u64,
}

impl Profile1D {
    /// Empty profile from a booking model.
    pub fn empty(model: &Hist1DModel) -> Self {
        let n = model.edges.n_bins();
        Self {
            name: model.name.clone(),
            title: model.title.clone(),
            edges: model.edges.clone(),
            sum_w: vec![0.0; n],
            sum_w2: vec![0.0; n],
            sum_wy: vec![0.0; n],
            sum_wy2: vec![0.0; n],
            entries: 0,
        }
    }

    /// Fill one `(x, y)` pair with weight `w`. Out-of-range `x` is dropped.
    pub fn fill(&mut self, x: f64, y: f64, w: f64) {
        if y.is_nan() || w.is_nan() {
            return;
        }
        if let Some(b) = self.edges.find_bin(x) {
            self.sum_w[b] += w;
            self.sum_w2[b] += w * w;
            self.sum_wy[b] += w * y;
            self.sum_wy2[b] += w * y * y;
            self.entries += 1;
        }
    }

    /// Weighted mean of `y` in bin `b` (`0` for an empty bin).
    pub fn mean(&self, b: usize) -> f64 {
        if self.sum_w[b] == 0.0 { 0.0 } else { self.sum_wy[b] / self.sum_w[b] }
    }

    /// Error on the mean in bin `b`: spread / sqrt(effective entries).
    pub fn error(&self, b: usize) -> f64 {
        let sw = self.sum_w[b];
        if sw == 0.0 || self.sum_w2[b] == 0.0 {
            return 0.0;
        }
        let mean = self.sum_wy[b] / sw;
        let variance = (self.sum_wy2[b] / sw - mean * mean).max(0.0);
        let n_eff = sw * sw / self.sum_w2[b];
        (variance / n_eff).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn edges(v: &[f64]) -> BinEdges {
        BinEdges::new(v.to_vec()).unwrap()
    }

    #[test]
    fn edges_validation() {
        assert!(BinEdges::new(vec![0.0]).is_err());
        assert!(BinEdges::new(vec![0.0, 0.0]).is_err());
        assert!(BinEdges::new(vec![1.0, 0.0]).is_err());
        assert!(BinEdges::new(vec![0.0, f64::INFINITY]).is_err());
        assert_eq!(edges(&[0.0, 1.0, 5.0]).n_bins(), 2);
    }

    #[test]
    fn find_bin_edge_cases() {
        let e = edges(&[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(e.find_bin(-0.5), None);
        assert_eq!(e.find_bin(3.0), None);
        assert_eq!(e.find_bin(0.0), Some(0));
        assert_eq!(e.find_bin(1.0), Some(1));
        assert_eq!(e.find_bin(2.99), Some(2));
        assert_eq!(e.find_bin(f64::NAN), None);
    }

    #[test]
    fn fill_1d_with_flows() {
        let mut h = Hist1D::empty(&Hist1DModel::new("h", "", edges(&[0.0, 1.0, 2.0, 3.0])));
        for x in [0.5, 1.5, 2.5, 0.5, -1.0, 3.5] {
            h.fill(x, 1.0);
        }
        assert_eq!(h.bin_content, vec![2.0, 1.0, 1.0]);
        assert_eq!(h.underflow, 1.0);
        assert_eq!(h.overflow, 1.0);
        assert_eq!(h.entries, 4);
    }

    #[test]
    fn fill_1d_weighted_sumw2() {
        let mut h = Hist1D::empty(&Hist1DModel::new("h", "", edges(&[0.0, 1.0, 2.0])));
        h.fill(0.5, 2.0);
        h.fill(1.5, 3.0);
        h.fill(0.5, 1.0);
        assert_eq!(h.bin_content, vec![3.0, 3.0]);
        assert_eq!(h.sumw2, vec![5.0, 9.0]);
    }

    #[test]
    fn fill_2d_row_major() {
        let model = Hist2DModel::new("h2", "", edges(&[0.0, 1.0, 2.0]), edges(&[0.0, 5.0, 10.0, 15.0]));
        let mut h = Hist2D::empty(&model);
        h.fill(1.5, 12.0, 2.0);
        h.fill(0.5, 1.0, 1.0);
        h.fill(5.0, 1.0, 4.0);
        assert_eq!(h.bin(1, 2), 2.0);
        assert_eq!(h.bin(0, 0), 1.0);
        assert_eq!(h.out_of_range, 4.0);
        assert_eq!(h.entries, 2);
    }

    #[test]
    fn profile_mean_and_error() {
        let mut p = Profile1D::empty(&Hist1DModel::new("p", "", edges(&[0.0, 1.0, 2.0])));
        p.fill(0.5, 2.0, 1.0);
        p.fill(0.5, 4.0, 1.0);
        p.fill(1.5, 10.0, 3.0);
        assert_relative_eq!(p.mean(0), 3.0);
        assert_relative_eq!(p.mean(1), 10.0);
        // Spread 1, two unit-weight entries.
        assert_relative_eq!(p.error(0), 1.0 / 2f64.sqrt(), epsilon = 1e-12);
        assert_eq!(p.error(1), 0.0);
    }

    #[test]
    fn edges_try_from_validates() {
        let ok = BinEdges::try_from(vec![0.0, 1.0]).unwrap();
        assert_eq!(ok.n_bins(), 1);
        assert!(BinEdges::try_from(vec![1.0, 0.0]).is_err());
        assert_eq!(Vec::<f64>::from(ok), vec![0.0, 1.0]);
    }
}
