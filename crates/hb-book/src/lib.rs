//! # hb-book
//!
//! Region-tree bookkeeping over the histbook lazy frame engine.
//!
//! A [`FrameNode`] wraps a lazy frame handle and owns named child regions,
//! each a `FrameNode` scoped by one more filter. Aggregations described by
//! [`Histogram1DSpec`], [`Histogram2DSpec`] and [`Profile1DSpec`] are booked
//! onto nodes (directly, through the [`bulk`] helpers, or through a
//! declarative [`RegionSpec`] tree). [`run_all`] then fires one trigger for
//! every frame and writes each frame's tree into its own output artifact,
//! mirroring the region hierarchy.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use hb_book::{
//!     AggregationSpec, Binning, FrameNode, Histogram1DSpec, RegionSpec,
//!     generate_combinatorial_regions, run_all,
//! };
//! use hb_frame::DataSource;
//! use indexmap::IndexMap;
//!
//! let src = DataSource::from_parquet(Path::new("ttbar.parquet")).unwrap();
//! let mut ttbar = FrameNode::from_source(src);
//! ttbar.filter("njets", "njet >= 4").unwrap();
//!
//! let pt = Arc::new(Binning::new("pt", "p_{T}", vec![25.0, 50.0, 100.0]).unwrap());
//! let eta = Binning::new("eta", "#eta", vec![-2.5, 0.0, 2.5]).unwrap();
//! let mut incl = RegionSpec::new("incl", "");
//! generate_combinatorial_regions(&mut incl, &[&*pt, &eta]).unwrap();
//!
//! let hists: Vec<AggregationSpec> =
//!     vec![Histogram1DSpec::new("pt", "p_{T}", Arc::clone(&pt), "pt", "weight").into()];
//! incl.apply(&mut ttbar, &hists).unwrap();
//!
//! let mut frames = IndexMap::new();
//! frames.insert("ttbar".to_string(), ttbar);
//! run_all(&frames, Path::new("output")).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binning;
pub mod bulk;
pub mod error;
pub mod node;
pub mod region;
pub mod run;
pub mod spec;

pub use binning::Binning;
pub use bulk::{bulk_book, bulk_book_1d, bulk_book_2d, bulk_book_profile1d, bulk_define};
pub use error::{BookError, Result};
pub use node::{Booked, FrameNode};
pub use region::{RegionSpec, generate_combinatorial_regions};
pub use run::{FrameSummary, RunOptions, artifact_path, run_all, run_all_with};
pub use spec::{AggregationSpec, Histogram1DSpec, Histogram2DSpec, Profile1DSpec, combine_weight};
