//! Binned lookup tables callable from expressions.
//!
//! A [`LookupTable`] registered on a [`DataSource`](crate::DataSource) under a
//! function name can be called inside any expression compiled against that
//! source, e.g. `sf_pt_eta(pt, eta)`. The call returns the content of the bin
//! containing its arguments and `0` outside the table range. Missing trailing
//! arguments default to `0`, so a 1D table may also be called with extra
//! coordinates omitted.

use crate::error::{FrameError, Result};
use crate::histogram::{BinEdges, Hist1D, Hist2D};

/// Maximum number of table dimensions.
pub const MAX_LOOKUP_DIMS: usize = 3;

/// An N-dimensional (N ≤ 3) binned table of values.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    axes: Vec<BinEdges>,
    /// Row-major contents: `((ix * ny) + iy) * nz + iz`.
    contents: Vec<f64>,
}

impl LookupTable {
    /// Build a table from its axes and row-major contents.
    pub fn new(axes: Vec<BinEdges>, contents: Vec<f64>) -> Result<Self> {
        if axes.is_empty() || axes.len() > MAX_LOOKUP_DIMS {
            return Err(FrameError::InvalidArgument(format!(
                "lookup table needs 1..={MAX_LOOKUP_DIMS} axes, got {}",
                axes.len()
            )));
        }
        let expected: usize = axes.iter().map(BinEdges::n_bins).product();
        if contents.len() != expected {
            return Err(FrameError::InvalidArgument(format!(
                "lookup table contents length {} does not match axes ({expected} bins)",
                contents.len()
            )));
        }
        Ok(Self { axes, contents })
    }

    /// Number of dimensions.
    pub fn dims(&self) -> usize {
        self.axes.len()
    }

    /// Value of the bin containing `coords`; `0` outside the range.
    pub fn value(&self, coords: &[f64]) -> f64 {
        let mut flat = 0usize;
        for (d, axis) in self.axes.iter().enumerate() {
            let x = coords.get(d).copied().unwrap_or(0.0);
            let Some(bin) = axis.find_bin(x) else {
                return 0.0;
            };
            flat = flat * axis.n_bins() + bin;
        }
        self.contents[flat]
    }
}

impl TryFrom<&Hist1D> for LookupTable {
    type Error = FrameError;

    fn try_from(h: &Hist1D) -> Result<Self> {
        Self::new(vec![h.edges.clone()], h.bin_content.clone())
    }
}

impl TryFrom<&Hist2D> for LookupTable {
    type Error = FrameError;

    fn try_from(h: &Hist2D) -> Result<Self> {
        Self::new(vec![h.x_edges.clone(), h.y_edges.clone()], h.bin_content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::Hist1DModel;

    fn edges(v: &[f64]) -> BinEdges {
        BinEdges::new(v.to_vec()).unwrap()
    }

    #[test]
    fn one_dim_lookup() {
        let t = LookupTable::new(vec![edges(&[0.0, 1.0, 2.0])], vec![0.5, 2.0]).unwrap();
        assert_eq!(t.value(&[0.3]), 0.5);
        assert_eq!(t.value(&[1.0]), 2.0);
        assert_eq!(t.value(&[2.0]), 0.0);
        assert_eq!(t.value(&[-1.0]), 0.0);
    }

    #[test]
    fn two_dim_lookup_is_row_major() {
        let t = LookupTable::new(
            vec![edges(&[0.0, 1.0, 2.0]), edges(&[0.0, 10.0, 20.0, 30.0])],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap();
        assert_eq!(t.value(&[0.5, 5.0]), 1.0);
        assert_eq!(t.value(&[0.5, 25.0]), 3.0);
        assert_eq!(t.value(&[1.5, 15.0]), 5.0);
        // Missing coordinate defaults to 0.
        assert_eq!(t.value(&[1.5]), 4.0);
    }

    #[test]
    fn shape_mismatch_rejected() {
        let err = LookupTable::new(vec![edges(&[0.0, 1.0, 2.0])], vec![1.0]).unwrap_err();
        assert!(err.to_string().contains("does not match"));
        assert!(LookupTable::new(vec![], vec![]).is_err());
    }

    #[test]
    fn histogram_with_short_contents_rejected() {
        let model = Hist1DModel::new("sf", "", edges(&[0.0, 1.0, 2.0]));
        let mut h = Hist1D::empty(&model);
        h.fill(1.5, 2.0);
        h.bin_content.truncate(1);
        assert!(LookupTable::try_from(&h).is_err());
        h.bin_content.push(2.0);
        assert_eq!(LookupTable::try_from(&h).unwrap().value(&[1.5]), 2.0);
    }
}
