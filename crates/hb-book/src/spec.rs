//! Declarative aggregation descriptors.
//!
//! A descriptor only names what to fill; it is booked onto a
//! [`FrameNode`](crate::FrameNode) which checks name uniqueness.

use std::sync::Arc;

use hb_frame::{Hist1DModel, Hist2DModel};

use crate::binning::Binning;

/// Multiply `weight` by an optional extra factor.
///
/// An empty weight means unit weight, so only the factor remains.
pub fn combine_weight(weight: &str, extra: Option<&str>) -> String {
    let weight = weight.trim();
    match extra.map(str::trim).filter(|e| !e.is_empty()) {
        None => weight.to_string(),
        Some(extra) if weight.is_empty() => extra.to_string(),
        Some(extra) => format!("({weight}) * ({extra})"),
    }
}

/// 1D histogram of one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1DSpec {
    /// Aggregation name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// X binning.
    pub binning: Arc<Binning>,
    /// Variable expression.
    pub variable: String,
    /// Weight expression; empty for unit weight.
    pub weight: String,
}

impl Histogram1DSpec {
    /// Create a descriptor.
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        binning: Arc<Binning>,
        variable: impl Into<String>,
        weight: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            binning,
            variable: variable.into(),
            weight: weight.into(),
        }
    }

    pub(crate) fn model(&self) -> Hist1DModel {
        Hist1DModel::new(&self.name, &self.title, self.binning.to_edges())
    }
}

/// 2D histogram of two variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2DSpec {
    /// Aggregation name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// X binning.
    pub x_binning: Arc<Binning>,
    /// Y binning.
    pub y_binning: Arc<Binning>,
    /// X variable expression.
    pub x_variable: String,
    /// Y variable expression.
    pub y_variable: String,
    /// Weight expression; empty for unit weight.
    pub weight: String,
}

impl Histogram2DSpec {
    /// Create a descriptor.
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        x_binning: Arc<Binning>,
        y_binning: Arc<Binning>,
        x_variable: impl Into<String>,
        y_variable: impl Into<String>,
        weight: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            x_binning,
            y_binning,
            x_variable: x_variable.into(),
            y_variable: y_variable.into(),
            weight: weight.into(),
        }
    }

    pub(crate) fn model(&self) -> Hist2DModel {
        Hist2DModel::new(&self.name, &self.title, self.x_binning.to_edges(), self.y_binning.to_edges())
    }
}

/// Profile of `y_variable` in bins of `x_variable`.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile1DSpec {
    /// Aggregation name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// X binning.
    pub binning: Arc<Binning>,
    /// Binned variable.
    pub x_variable: String,
    /// Profiled variable.
    pub y_variable: String,
    /// Weight expression; empty for unit weight.
    pub weight: String,
}

impl Profile1DSpec {
    /// Create a descriptor.
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        binning: Arc<Binning>,
        x_variable: impl Into<String>,
        y_variable: impl Into<String>,
        weight: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            binning,
            x_variable: x_variable.into(),
            y_variable: y_variable.into(),
            weight: weight.into(),
        }
    }

    pub(crate) fn model(&self) -> Hist1DModel {
        Hist1DModel::new(&self.name, &self.title, self.binning.to_edges())
    }
}

/// Any aggregation descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationSpec {
    /// 1D histogram.
    Hist1D(Histogram1DSpec),
    /// 2D histogram.
    Hist2D(Histogram2DSpec),
    /// 1D profile.
    Profile1D(Profile1DSpec),
}

impl AggregationSpec {
    /// Aggregation name.
    pub fn name(&self) -> &str {
        match self {
            AggregationSpec::Hist1D(s) => &s.name,
            AggregationSpec::Hist2D(s) => &s.name,
            AggregationSpec::Profile1D(s) => &s.name,
        }
    }

    /// Weight expression.
    pub fn weight(&self) -> &str {
        match self {
            AggregationSpec::Hist1D(s) => &s.weight,
            AggregationSpec::Hist2D(s) => &s.weight,
            AggregationSpec::Profile1D(s) => &s.weight,
        }
    }
}

impl From<Histogram1DSpec> for AggregationSpec {
    fn from(s: Histogram1DSpec) -> Self {
        AggregationSpec::Hist1D(s)
    }
}

impl From<Histogram2DSpec> for AggregationSpec {
    fn from(s: Histogram2DSpec) -> Self {
        AggregationSpec::Hist2D(s)
    }
}

impl From<Profile1DSpec> for AggregationSpec {
    fn from(s: Profile1DSpec) -> Self {
        AggregationSpec::Profile1D(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_combination() {
        assert_eq!(combine_weight("w", None), "w");
        assert_eq!(combine_weight("w", Some("")), "w");
        assert_eq!(combine_weight("", Some("sf")), "sf");
        assert_eq!(combine_weight("w1 + w2", Some("sf")), "(w1 + w2) * (sf)");
        assert_eq!(combine_weight("", None), "");
    }

    #[test]
    fn model_carries_name_and_edges() {
        let b = Arc::new(Binning::new("pt", "", vec![0.0, 1.0, 4.0]).unwrap());
        let s = Histogram1DSpec::new("h_pt", "p_{T}", Arc::clone(&b), "pt", "");
        let m = s.model();
        assert_eq!(m.name, "h_pt");
        assert_eq!(m.title, "p_{T}");
        assert_eq!(m.edges.n_bins(), 2);
        assert_eq!(AggregationSpec::from(s).name(), "h_pt");
    }
}
