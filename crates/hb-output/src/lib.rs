//! # hb-output
//!
//! Hierarchical output container for histbook.
//!
//! An [`OutputFile`] holds a tree of [`Directory`] nodes, each with named
//! [`Record`]s (histograms and profiles). Region trees persist into it one
//! directory per region.
//!
//! ```no_run
//! use hb_output::OutputFile;
//!
//! let f = OutputFile::open("output/histo_ttbar.json").unwrap();
//! let h = f.root().get("pt0/eta1/mass").unwrap();
//! println!("{}", h.name());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod directory;
pub mod error;
pub mod file;
pub mod record;

pub use directory::Directory;
pub use error::{OutputError, Result};
pub use file::{FORMAT_TAG, OutputFile};
pub use record::Record;
