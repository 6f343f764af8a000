//! Output artifact on disk.
//!
//! The whole directory tree is kept in memory and serialized as one JSON
//! document on [`OutputFile::close`]. A file that is dropped while still
//! open is persisted as well; failures at that point can only be logged.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::directory::Directory;
use crate::error::{OutputError, Result};

/// Format tag stored at the top of every artifact.
pub const FORMAT_TAG: &str = "histbook-output-v1";

#[derive(Deserialize)]
struct Document {
    format: String,
    root: Directory,
}

/// A writable output artifact.
#[derive(Debug)]
pub struct OutputFile {
    path: PathBuf,
    root: Directory,
    open: bool,
}

impl OutputFile {
    /// Create (or truncate) the artifact at `path`.
    ///
    /// Parent directories are created. The file is written immediately so
    /// that an unwritable destination fails here rather than at close.
    pub fn recreate(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        let file = Self { path, root: Directory::new(), open: true };
        file.persist()?;
        Ok(file)
    }

    /// Read an existing artifact. The returned handle is already closed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = BufReader::new(fs::File::open(&path)?);
        let doc: Document = serde_json::from_reader(reader)?;
        if doc.format != FORMAT_TAG {
            return Err(OutputError::Format(doc.format));
        }
        Ok(Self { path, root: doc.root, open: false })
    }

    /// Artifact path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Top-level directory.
    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Top-level directory, mutable.
    pub fn root_mut(&mut self) -> &mut Directory {
        &mut self.root
    }

    /// Whether the file still has unsaved state.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Write the directory tree and close the file.
    pub fn close(mut self) -> Result<()> {
        self.persist()?;
        self.open = false;
        log::debug!("closed {} ({} records)", self.path.display(), self.root.total_records());
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let doc = DocumentRef { format: FORMAT_TAG, root: &self.root };
        let mut w = BufWriter::new(fs::File::create(&self.path)?);
        serde_json::to_writer(&mut w, &doc)?;
        w.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    format: &'a str,
    root: &'a Directory,
}

impl Drop for OutputFile {
    fn drop(&mut self) {
        if self.open
            && let Err(e) = self.persist()
        {
            log::error!("failed to write {} on drop: {e}", self.path.display());
        }
    }
}
