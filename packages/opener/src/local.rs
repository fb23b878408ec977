//! Local-filesystem container rooted at a directory.

use std::fs;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use crate::{FileContainer, OpenedStream, OpenerError};

/// A container exposing the files under a root directory.
///
/// Useful when a collaborator wants runtime I/O routed through this bridge
/// for paths that happen to live on local disk, and as the reference
/// container implementation backed by a real filesystem.
pub struct LocalContainer {
    root: PathBuf,
}

impl LocalContainer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl FileContainer for LocalContainer {
    fn open(&self, path: &str, mode: &str) -> Result<OpenedStream, OpenerError> {
        let target = self.resolve(path);
        match mode.chars().next() {
            Some('r') => Ok(OpenedStream::new(fs::File::open(target)?)),
            Some('w') => Ok(OpenedStream::new(fs::File::create(target)?)),
            _ => Err(OpenerError::other(format!(
                "unsupported access mode {:?}",
                mode
            ))),
        }
    }

    fn is_file(&self, path: &str) -> Result<bool, OpenerError> {
        Ok(self.resolve(path).is_file())
    }

    fn is_dir(&self, path: &str) -> Result<bool, OpenerError> {
        Ok(self.resolve(path).is_dir())
    }

    fn ls(&self, path: &str) -> Result<Vec<String>, OpenerError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.resolve(path))? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn size(&self, path: &str) -> Result<u64, OpenerError> {
        Ok(fs::metadata(self.resolve(path))?.len())
    }

    fn mtime(&self, path: &str) -> Result<u64, OpenerError> {
        let modified = fs::metadata(self.resolve(path))?.modified()?;
        Ok(modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0))
    }

    fn remove(&self, path: &str) -> Result<(), OpenerError> {
        Ok(fs::remove_file(self.resolve(path))?)
    }
}
