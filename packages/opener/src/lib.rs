//! Opener capability layer for GateFS.
//!
//! A caller who wants a native I/O runtime to read through their own stream
//! objects supplies one of two shapes:
//!
//! - a single-file factory (anything implementing [`StreamOpener`], including
//!   plain closures), or
//! - a filesystem-like object with directory introspection ([`FileContainer`]).
//!
//! The [`Opener`] adapter normalizes both into one capability set - open,
//! is_file, is_dir, ls, size - which is what the bridge layer consumes.
//! Streams themselves are ordinary `Read + Write + Seek` values; see
//! [`ByteStream`].
//!
//! # Example
//!
//! ```rust
//! use gatefs_opener::{MemContainer, Opener};
//!
//! let container = MemContainer::new();
//! container.insert("data/a.bin", b"hello".to_vec());
//!
//! let opener = Opener::container(container);
//! assert!(opener.is_file("data/a.bin").unwrap());
//! assert_eq!(opener.size("data/a.bin").unwrap(), 5);
//! ```

mod container;
mod error;
mod local;
mod memory;
mod stream;

pub use container::{FileContainer, Opener, StreamOpener};
pub use error::OpenerError;
pub use local::LocalContainer;
pub use memory::MemContainer;
pub use stream::{ByteStream, CloseAction, OpenedStream};
