//! In-memory directory tree of an output artifact.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{OutputError, Result};
use crate::record::Record;

/// A directory holding named records and named subdirectories, both in
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    records: IndexMap<String, Record>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    dirs: IndexMap<String, Directory>,
}

impl Directory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subdirectory `name`, created if missing.
    pub fn get_or_create_dir(&mut self, name: &str) -> Result<&mut Directory> {
        check_component(name)?;
        Ok(self.dirs.entry(name.to_string()).or_default())
    }

    /// Immediate subdirectory.
    pub fn dir(&self, name: &str) -> Option<&Directory> {
        self.dirs.get(name)
    }

    /// Immediate subdirectory, mutable.
    pub fn dir_mut(&mut self, name: &str) -> Option<&mut Directory> {
        self.dirs.get_mut(name)
    }

    /// Store `record` under its own name, replacing any record of that name.
    ///
    /// Returns the replaced record.
    pub fn write(&mut self, record: Record) -> Result<Option<Record>> {
        let name = record.name().to_string();
        check_component(&name)?;
        let old = self.records.insert(name.clone(), record);
        if old.is_some() {
            log::debug!("replaced record '{name}'");
        }
        Ok(old)
    }

    /// Immediate record.
    pub fn record(&self, name: &str) -> Option<&Record> {
        self.records.get(name)
    }

    /// Record at a `/`-separated path relative to this directory.
    pub fn get(&self, path: &str) -> Result<&Record> {
        let (dirs, leaf) = match path.rsplit_once('/') {
            Some((dirs, leaf)) => (Some(dirs), leaf),
            None => (None, path),
        };
        let mut cur = self;
        if let Some(dirs) = dirs {
            for part in dirs.split('/') {
                check_component(part).map_err(|_| OutputError::InvalidPath(path.to_string()))?;
                cur = cur.dir(part).ok_or_else(|| OutputError::NotFound(path.to_string()))?;
            }
        }
        cur.record(leaf).ok_or_else(|| OutputError::NotFound(path.to_string()))
    }

    /// Record names in insertion order.
    pub fn record_names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Subdirectory names in insertion order.
    pub fn dir_names(&self) -> impl Iterator<Item = &str> {
        self.dirs.keys().map(String::as_str)
    }

    /// Records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// No records and no subdirectories.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.dirs.is_empty()
    }

    /// Total number of records in this directory and below.
    pub fn total_records(&self) -> usize {
        self.records.len() + self.dirs.values().map(Directory::total_records).sum::<usize>()
    }
}

fn check_component(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(OutputError::InvalidPath(name.to_string()));
    }
    Ok(())
}
