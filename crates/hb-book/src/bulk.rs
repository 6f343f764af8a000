//! Batch defines and batch booking onto a [`FrameNode`].
//!
//! Every booking function takes an optional extra weight that multiplies the
//! descriptor's own weight (see [`combine_weight`]).

use crate::error::Result;
use crate::node::FrameNode;
use crate::spec::{
    AggregationSpec, Histogram1DSpec, Histogram2DSpec, Profile1DSpec, combine_weight,
};

/// Apply `(name, expression)` defines in iteration order.
pub fn bulk_define<I, K, V>(node: &mut FrameNode, defines: I) -> Result<()>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (name, expr) in defines {
        node.define(name.as_ref(), expr.as_ref())?;
    }
    Ok(())
}

/// Book every 1D histogram in `specs`.
pub fn bulk_book_1d(
    node: &mut FrameNode,
    specs: &[Histogram1DSpec],
    extra_weight: Option<&str>,
) -> Result<()> {
    for spec in specs {
        let spec = Histogram1DSpec { weight: combine_weight(&spec.weight, extra_weight), ..spec.clone() };
        node.book_histogram1d(&spec)?;
    }
    Ok(())
}

/// Book every 2D histogram in `specs`.
pub fn bulk_book_2d(
    node: &mut FrameNode,
    specs: &[Histogram2DSpec],
    extra_weight: Option<&str>,
) -> Result<()> {
    for spec in specs {
        let spec = Histogram2DSpec { weight: combine_weight(&spec.weight, extra_weight), ..spec.clone() };
        node.book_histogram2d(&spec)?;
    }
    Ok(())
}

/// Book every profile in `specs`.
pub fn bulk_book_profile1d(
    node: &mut FrameNode,
    specs: &[Profile1DSpec],
    extra_weight: Option<&str>,
) -> Result<()> {
    for spec in specs {
        let spec = Profile1DSpec { weight: combine_weight(&spec.weight, extra_weight), ..spec.clone() };
        node.book_profile1d(&spec)?;
    }
    Ok(())
}

/// Book a mixed list of descriptors, in order.
pub fn bulk_book(
    node: &mut FrameNode,
    specs: &[AggregationSpec],
    extra_weight: Option<&str>,
) -> Result<()> {
    for spec in specs {
        match spec {
            AggregationSpec::Hist1D(s) => bulk_book_1d(node, std::slice::from_ref(s), extra_weight)?,
            AggregationSpec::Hist2D(s) => bulk_book_2d(node, std::slice::from_ref(s), extra_weight)?,
            AggregationSpec::Profile1D(s) => {
                bulk_book_profile1d(node, std::slice::from_ref(s), extra_weight)?
            }
        }
    }
    Ok(())
}
