//! Live stream handles and their lifecycle.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

use gatefs_opener::{ByteStream, CloseAction, OpenedStream};

use crate::error::HandleError;

/// Identifier of a tracked stream. Opaque to the runtime, which only ever
/// passes back values it received from open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct HandleRecord {
    stream: Option<Box<dyn ByteStream>>,
    on_close: Option<CloseAction>,
}

/// Every live stream handed to the runtime, with its deferred close action.
///
/// Entries carry their own lock: a blocking read on one handle does not
/// serialize I/O on another; only insertion and removal touch the table
/// lock. Multiple opens of the same logical path produce independent
/// records, each independently closeable.
///
/// Operations on an id that was never issued - or whose record was already
/// closed - answer [`HandleError::Unknown`].
#[derive(Default)]
pub struct HandleTable {
    entries: Mutex<HashMap<u64, Arc<Mutex<HandleRecord>>>>,
    next_id: AtomicU64,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `opened`, returning the id the runtime will address
    /// it by. The close action travels with the record until `close`.
    pub fn track(&self, opened: OpenedStream) -> HandleId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = HandleRecord {
            stream: Some(opened.stream),
            on_close: opened.on_close,
        };
        self.entries
            .lock()
            .expect("handle table poisoned")
            .insert(id, Arc::new(Mutex::new(record)));
        trace!(id, "stream tracked");
        HandleId(id)
    }

    /// Number of live handles.
    pub fn live(&self) -> usize {
        self.entries.lock().expect("handle table poisoned").len()
    }

    fn entry(&self, id: HandleId) -> Result<Arc<Mutex<HandleRecord>>, HandleError> {
        self.entries
            .lock()
            .expect("handle table poisoned")
            .get(&id.0)
            .cloned()
            .ok_or(HandleError::Unknown { id })
    }

    /// Read until `buf` is full or the stream ends. A short count at
    /// end-of-stream is success, not failure.
    pub fn read(&self, id: HandleId, buf: &mut [u8]) -> Result<usize, HandleError> {
        let entry = self.entry(id)?;
        let mut record = entry.lock().expect("handle poisoned");
        let stream = record.stream.as_mut().ok_or(HandleError::Unknown { id })?;

        let mut filled = 0;
        while filled < buf.len() {
            match stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(HandleError::Io { id, source }),
            }
        }
        Ok(filled)
    }

    /// Write `buf` to the stream, returning the bytes accepted. Short
    /// writes are possible.
    pub fn write(&self, id: HandleId, buf: &[u8]) -> Result<usize, HandleError> {
        let entry = self.entry(id)?;
        let mut record = entry.lock().expect("handle poisoned");
        let stream = record.stream.as_mut().ok_or(HandleError::Unknown { id })?;
        stream.write(buf).map_err(|source| HandleError::Io { id, source })
    }

    pub fn seek(&self, id: HandleId, pos: SeekFrom) -> Result<u64, HandleError> {
        let entry = self.entry(id)?;
        let mut record = entry.lock().expect("handle poisoned");
        let stream = record.stream.as_mut().ok_or(HandleError::Unknown { id })?;
        stream.seek(pos).map_err(|source| HandleError::Io { id, source })
    }

    pub fn tell(&self, id: HandleId) -> Result<u64, HandleError> {
        let entry = self.entry(id)?;
        let mut record = entry.lock().expect("handle poisoned");
        let stream = record.stream.as_mut().ok_or(HandleError::Unknown { id })?;
        stream
            .stream_position()
            .map_err(|source| HandleError::Io { id, source })
    }

    pub fn flush(&self, id: HandleId) -> Result<(), HandleError> {
        let entry = self.entry(id)?;
        let mut record = entry.lock().expect("handle poisoned");
        let stream = record.stream.as_mut().ok_or(HandleError::Unknown { id })?;
        stream.flush().map_err(|source| HandleError::Io { id, source })
    }

    /// Stop tracking `id`: release the stream, then run the deferred close
    /// action. Both happen exactly once; later operations on `id` answer
    /// [`HandleError::Unknown`].
    pub fn close(&self, id: HandleId) -> Result<(), HandleError> {
        let entry = self
            .entries
            .lock()
            .expect("handle table poisoned")
            .remove(&id.0)
            .ok_or(HandleError::Unknown { id })?;

        let mut record = entry.lock().expect("handle poisoned");
        drop(record.stream.take());
        if let Some(action) = record.on_close.take() {
            action();
        }
        trace!(%id, "stream closed");
        Ok(())
    }
}
