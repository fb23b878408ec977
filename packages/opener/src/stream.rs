//! Byte streams produced by openers.

use std::io::{Read, Seek, Write};

/// A stream usable by the bridge's handle table: readable, writable,
/// seekable, and movable across runtime worker threads.
///
/// Blanket-implemented, so `std::io::Cursor<Vec<u8>>` and `std::fs::File`
/// qualify without glue code. Read-only sources stay within the trait by
/// rejecting writes at call time.
pub trait ByteStream: Read + Write + Seek + Send + 'static {}

impl<T: Read + Write + Seek + Send + 'static> ByteStream for T {}

/// Action deferred until a tracked stream is closed.
pub type CloseAction = Box<dyn FnOnce() + Send>;

/// A stream returned by an opener, together with whatever release action its
/// acquisition required.
///
/// Open and close happen in unrelated call frames on unrelated threads, so
/// the release action travels with the stream as a value instead of living in
/// a scope guard. Whoever ends the stream's life is responsible for invoking
/// `on_close` after dropping the stream.
pub struct OpenedStream {
    pub stream: Box<dyn ByteStream>,
    pub on_close: Option<CloseAction>,
}

impl OpenedStream {
    /// Wrap a plain stream with no close action.
    pub fn new(stream: impl ByteStream) -> Self {
        Self::from_boxed(Box::new(stream))
    }

    /// Wrap an already-boxed stream with no close action.
    pub fn from_boxed(stream: Box<dyn ByteStream>) -> Self {
        Self {
            stream,
            on_close: None,
        }
    }

    /// Attach an action to run once the stream is closed.
    pub fn with_close_action(mut self, action: CloseAction) -> Self {
        self.on_close = Some(action);
        self
    }

    /// Drop the stream, then run the close action.
    ///
    /// Used by holders that open a stream for a one-shot query (e.g. a size
    /// probe) rather than tracking it in a handle table.
    pub fn dispose(self) {
        let OpenedStream { stream, on_close } = self;
        drop(stream);
        if let Some(action) = on_close {
            action();
        }
    }
}
