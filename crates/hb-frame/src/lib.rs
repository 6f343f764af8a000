//! # hb-frame
//!
//! Lazy columnar analysis engine for histbook.
//!
//! A [`LazyFrame`] is an immutable handle onto a node of a computation graph
//! over a [`DataSource`]. Defines, filters and ranges append nodes; counts
//! and histograms return [`Deferred`] results. Nothing is read until
//! [`run_graphs`] triggers an event loop, which computes every pending result
//! of a graph in a single pass over the data.
//!
//! ## Example
//!
//! ```no_run
//! use hb_frame::{BinEdges, DataSource, Hist1DModel, LazyFrame, run_graphs};
//! use std::path::Path;
//!
//! let src = DataSource::from_parquet(Path::new("events.parquet")).unwrap();
//! let sel = LazyFrame::new(src).filter("pt > 25 && abs(eta) < 2.5", "kinematics").unwrap();
//! let edges = BinEdges::new(vec![25.0, 50.0, 100.0, 200.0]).unwrap();
//! let h = sel.histo1d(Hist1DModel::new("pt", "p_{T}", edges), "pt", "weight").unwrap();
//! let n = sel.count();
//!
//! run_graphs(&[h.clone().into(), n.clone().into()]).unwrap();
//! println!("{} events, integral {}", n.get().unwrap(), h.get().unwrap().integral());
//! println!("{}", sel.report());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod datasource;
pub mod deferred;
pub mod error;
pub mod expr;
pub mod frame;
pub(crate) mod graph;
pub mod histogram;
pub mod lookup;
pub mod report;
pub mod runner;
mod snapshot;

pub use datasource::DataSource;
pub use deferred::{Deferred, ResultHandle};
pub use error::{FrameError, Result};
pub use expr::CompiledExpr;
pub use frame::LazyFrame;
pub use histogram::{BinEdges, Hist1D, Hist1DModel, Hist2D, Hist2DModel, Profile1D};
pub use lookup::LookupTable;
pub use report::{CutInfo, CutflowReport};
pub use runner::{enable_implicit_mt, run_graphs};
