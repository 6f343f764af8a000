//! Objects that can be stored in an output directory.

use hb_frame::{Hist1D, Hist2D, Profile1D};
use serde::{Deserialize, Serialize};

/// A named, persisted aggregation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Record {
    /// 1D histogram.
    Hist1D(Hist1D),
    /// 2D histogram.
    Hist2D(Hist2D),
    /// 1D profile.
    Profile1D(Profile1D),
}

impl Record {
    /// Object name.
    pub fn name(&self) -> &str {
        match self {
            Record::Hist1D(h) => &h.name,
            Record::Hist2D(h) => &h.name,
            Record::Profile1D(p) => &p.name,
        }
    }

    /// Record with its name replaced.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        match &mut self {
            Record::Hist1D(h) => h.name = name,
            Record::Hist2D(h) => h.name = name,
            Record::Profile1D(p) => p.name = name,
        }
        self
    }

    /// The 1D histogram, if this is one.
    pub fn as_hist1d(&self) -> Option<&Hist1D> {
        match self {
            Record::Hist1D(h) => Some(h),
            _ => None,
        }
    }

    /// The 2D histogram, if this is one.
    pub fn as_hist2d(&self) -> Option<&Hist2D> {
        match self {
            Record::Hist2D(h) => Some(h),
            _ => None,
        }
    }

    /// The profile, if this is one.
    pub fn as_profile1d(&self) -> Option<&Profile1D> {
        match self {
            Record::Profile1D(p) => Some(p),
            _ => None,
        }
    }
}

impl From<Hist1D> for Record {
    fn from(h: Hist1D) -> Self {
        Record::Hist1D(h)
    }
}

impl From<Hist2D> for Record {
    fn from(h: Hist2D) -> Self {
        Record::Hist2D(h)
    }
}

impl From<Profile1D> for Record {
    fn from(p: Profile1D) -> Self {
        Record::Profile1D(p)
    }
}
