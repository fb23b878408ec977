//! Opener capability traits and the adapter over their two shapes.

use std::io::{Seek, SeekFrom};
use std::sync::Arc;

use crate::{OpenedStream, OpenerError};

/// Path handed to [`Opener::validate`] probes. No well-formed opener has an
/// entry under this name.
const PROBE_PATH: &str = ".gatefs-probe-does-not-exist";

/// A single-file factory: produces a stream for a path and access mode.
///
/// This is the minimal opener shape. Closures of the matching signature
/// qualify through a blanket impl:
///
/// ```rust
/// use gatefs_opener::{Opener, OpenedStream, OpenerError};
/// use std::io::Cursor;
///
/// let opener = Opener::factory(|_path: &str, _mode: &str| -> Result<_, OpenerError> {
///     Ok(OpenedStream::new(Cursor::new(b"payload".to_vec())))
/// });
/// assert!(opener.is_file("anything").unwrap());
/// ```
pub trait StreamOpener: Send + Sync {
    fn open(&self, path: &str, mode: &str) -> Result<OpenedStream, OpenerError>;
}

impl<F> StreamOpener for F
where
    F: Fn(&str, &str) -> Result<OpenedStream, OpenerError> + Send + Sync,
{
    fn open(&self, path: &str, mode: &str) -> Result<OpenedStream, OpenerError> {
        self(path, mode)
    }
}

/// A filesystem-like object: can open files and answer directory and
/// metadata queries about its namespace.
pub trait FileContainer: Send + Sync {
    fn open(&self, path: &str, mode: &str) -> Result<OpenedStream, OpenerError>;

    fn is_file(&self, path: &str) -> Result<bool, OpenerError>;

    fn is_dir(&self, path: &str) -> Result<bool, OpenerError>;

    /// Base names of the entries under `path`. No separators.
    fn ls(&self, path: &str) -> Result<Vec<String>, OpenerError>;

    fn size(&self, path: &str) -> Result<u64, OpenerError>;

    /// Modification time in seconds since the epoch. Containers without
    /// timestamps report zero.
    fn mtime(&self, _path: &str) -> Result<u64, OpenerError> {
        Ok(0)
    }

    /// Remove the file at `path`. Containers that cannot delete report
    /// [`OpenerError::Unsupported`].
    fn remove(&self, _path: &str) -> Result<(), OpenerError> {
        Err(OpenerError::Unsupported { op: "remove" })
    }
}

/// A caller-supplied opener normalized to one capability set.
///
/// The two accepted shapes become the two variants; the variant is chosen
/// once, by the constructor the caller reaches for. The factory variant
/// answers introspection queries with fixed values (a bare factory knows of
/// exactly one file and no directories); the container variant delegates
/// every capability.
///
/// `Opener` is cheaply cloneable and clones share identity: nested
/// registrations of the same logical opener are detected with
/// [`Opener::same_source`], which compares the underlying allocation rather
/// than any structural property.
#[derive(Clone)]
pub enum Opener {
    Factory(Arc<dyn StreamOpener>),
    Container(Arc<dyn FileContainer>),
}

impl Opener {
    /// Adapt a single-file factory.
    pub fn factory(opener: impl StreamOpener + 'static) -> Self {
        Opener::Factory(Arc::new(opener))
    }

    /// Adapt a filesystem-like container.
    pub fn container(container: impl FileContainer + 'static) -> Self {
        Opener::Container(Arc::new(container))
    }

    /// Whether `self` and `other` wrap the same caller-supplied object.
    pub fn same_source(&self, other: &Opener) -> bool {
        match (self, other) {
            (Opener::Factory(a), Opener::Factory(b)) => Arc::ptr_eq(a, b),
            (Opener::Container(a), Opener::Container(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn open(&self, path: &str, mode: &str) -> Result<OpenedStream, OpenerError> {
        match self {
            Opener::Factory(f) => f.open(path, mode),
            Opener::Container(c) => c.open(path, mode),
        }
    }

    pub fn is_file(&self, path: &str) -> Result<bool, OpenerError> {
        match self {
            Opener::Factory(_) => Ok(true),
            Opener::Container(c) => c.is_file(path),
        }
    }

    pub fn is_dir(&self, path: &str) -> Result<bool, OpenerError> {
        match self {
            Opener::Factory(_) => Ok(false),
            Opener::Container(c) => c.is_dir(path),
        }
    }

    pub fn ls(&self, path: &str) -> Result<Vec<String>, OpenerError> {
        match self {
            Opener::Factory(_) => Ok(Vec::new()),
            Opener::Container(c) => c.ls(path),
        }
    }

    /// Size of the file at `path`. A bare factory has no metadata channel,
    /// so the stream is opened and measured by seeking to its end.
    pub fn size(&self, path: &str) -> Result<u64, OpenerError> {
        match self {
            Opener::Factory(f) => {
                let OpenedStream {
                    mut stream,
                    on_close,
                } = f.open(path, "r")?;
                let size = stream.seek(SeekFrom::End(0))?;
                OpenedStream { stream, on_close }.dispose();
                Ok(size)
            }
            Opener::Container(c) => c.size(path),
        }
    }

    pub fn mtime(&self, path: &str) -> Result<u64, OpenerError> {
        match self {
            Opener::Factory(_) => Ok(0),
            Opener::Container(c) => c.mtime(path),
        }
    }

    pub fn remove(&self, path: &str) -> Result<(), OpenerError> {
        match self {
            Opener::Factory(_) => Err(OpenerError::Unsupported { op: "remove" }),
            Opener::Container(c) => c.remove(path),
        }
    }

    /// Sanity probe run before a registration is accepted.
    ///
    /// Asks for the size of a path that cannot exist. A well-formed opener
    /// answers with a not-found condition; anything else - including
    /// claiming the path has a size - rejects the opener before its first
    /// real I/O rather than at some later callback.
    pub fn validate(&self) -> Result<(), OpenerError> {
        match self.size(PROBE_PATH) {
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
            Ok(size) => Err(OpenerError::other(format!(
                "opener reported size {} for a path that cannot exist",
                size
            ))),
        }
    }
}
