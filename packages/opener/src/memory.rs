//! In-memory file container.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

use crate::{FileContainer, OpenedStream, OpenerError};

type FileMap = Arc<Mutex<BTreeMap<String, Vec<u8>>>>;

/// A container mapping paths to byte blobs held in memory.
///
/// Cloning is cheap and clones share contents, so a collaborator can keep a
/// handle for assertions while a clone is registered with the bridge. Streams
/// opened for writing publish their bytes back to the map when closed.
#[derive(Clone, Default)]
pub struct MemContainer {
    files: FileMap,
}

impl MemContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the file at `path`.
    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .expect("file map poisoned")
            .insert(path.into(), bytes.into());
    }

    /// Contents of the file at `path`, if present.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .expect("file map poisoned")
            .get(path)
            .cloned()
    }
}

impl FileContainer for MemContainer {
    fn open(&self, path: &str, mode: &str) -> Result<OpenedStream, OpenerError> {
        match mode.chars().next() {
            Some('r') => {
                let bytes = self.get(path).ok_or_else(|| OpenerError::not_found(path))?;
                Ok(OpenedStream::new(MemFile {
                    path: path.to_string(),
                    buf: Cursor::new(bytes),
                    files: Arc::clone(&self.files),
                    writable: false,
                }))
            }
            Some('w') => Ok(OpenedStream::new(MemFile {
                path: path.to_string(),
                buf: Cursor::new(Vec::new()),
                files: Arc::clone(&self.files),
                writable: true,
            })),
            _ => Err(OpenerError::other(format!(
                "unsupported access mode {:?}",
                mode
            ))),
        }
    }

    fn is_file(&self, path: &str) -> Result<bool, OpenerError> {
        Ok(self
            .files
            .lock()
            .expect("file map poisoned")
            .contains_key(path))
    }

    fn is_dir(&self, path: &str) -> Result<bool, OpenerError> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        Ok(self
            .files
            .lock()
            .expect("file map poisoned")
            .keys()
            .any(|k| k.starts_with(&prefix)))
    }

    fn ls(&self, path: &str) -> Result<Vec<String>, OpenerError> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let files = self.files.lock().expect("file map poisoned");
        let mut names: Vec<String> = files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(|rest| match rest.split_once('/') {
                Some((child, _)) => child.to_string(),
                None => rest.to_string(),
            })
            .collect();
        names.dedup();
        Ok(names)
    }

    fn size(&self, path: &str) -> Result<u64, OpenerError> {
        self.get(path)
            .map(|b| b.len() as u64)
            .ok_or_else(|| OpenerError::not_found(path))
    }

    fn remove(&self, path: &str) -> Result<(), OpenerError> {
        self.files
            .lock()
            .expect("file map poisoned")
            .remove(path)
            .map(drop)
            .ok_or_else(|| OpenerError::not_found(path))
    }
}

/// A file handle over the shared map.
///
/// Read-mode handles work on a snapshot and reject writes; write-mode
/// handles buffer locally and publish to the map when dropped, which is when
/// the bridge closes the handle.
struct MemFile {
    path: String,
    buf: Cursor<Vec<u8>>,
    files: FileMap,
    writable: bool,
}

impl Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.buf.read(buf)
    }
}

impl Write for MemFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "stream is read-only",
            ));
        }
        self.buf.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.buf.seek(pos)
    }
}

impl Drop for MemFile {
    fn drop(&mut self) {
        if self.writable {
            self.files
                .lock()
                .expect("file map poisoned")
                .insert(self.path.clone(), self.buf.get_ref().clone());
        }
    }
}
