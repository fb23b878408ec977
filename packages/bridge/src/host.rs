//! The native runtime's registration surface, and an in-process stand-in.

use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::sync::Mutex;

use libc::c_int;

use crate::error::HostError;
use crate::ffi::{CallbackTable, StatRecord};

/// The slice of the native runtime that installation needs: prefix-addressed
/// handler registration. One method per runtime entry point consumed.
///
/// Everything else about the runtime - its worker threads, its path
/// dispatch, which callback it invokes when - is outside this crate; the
/// runtime honors the [`CallbackTable`] contract and strips the handler
/// prefix from paths before invoking path-addressed callbacks.
pub trait VfsHost {
    /// Prefixes that already have handlers installed.
    fn known_prefixes(&self) -> Vec<String>;

    /// Hand the runtime a callback table for `prefix`.
    fn install_handler(&self, prefix: &str, callbacks: CallbackTable) -> Result<(), HostError>;

    /// Remove the handler for `prefix`, returning its table so the caller
    /// can release per-plugin user data before the runtime's bookkeeping
    /// is gone.
    fn remove_handler(&self, prefix: &str) -> Result<Option<CallbackTable>, HostError>;
}

/// In-process host that dispatches paths to installed tables the way the
/// real runtime would: longest prefix wins, and the prefix is stripped
/// before a callback sees the path.
///
/// Used by this workspace's tests, which install independent `MemoryHost`s
/// with independent bridge states side by side; also usable by embedders
/// who want the bridge's dispatch without a native runtime in the process.
#[derive(Default)]
pub struct MemoryHost {
    handlers: Mutex<HashMap<String, CallbackTable>>,
    open_files: Mutex<HashMap<usize, CallbackTable>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn handler_for(&self, path: &str) -> Result<(String, CallbackTable), HostError> {
        let handlers = self.handlers.lock().expect("handlers poisoned");
        handlers
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, table)| (prefix.clone(), *table))
            .ok_or_else(|| HostError::Other {
                message: format!("no handler for path {:?}", path),
            })
    }

    fn table_for(&self, file: *mut c_void) -> CallbackTable {
        *self
            .open_files
            .lock()
            .expect("open files poisoned")
            .get(&(file as usize))
            .expect("handle was not produced by this host")
    }

    /// Open `path` through whichever handler owns its prefix, as the
    /// runtime would on a worker thread. A null return is the handler's
    /// open-failed sentinel.
    pub fn open(&self, path: &str, access: &str) -> Result<*mut c_void, HostError> {
        let (prefix, table) = self.handler_for(path)?;
        let stripped = cstring(&path[prefix.len()..])?;
        let access = cstring(access)?;
        let handle = unsafe { (table.open)(table.user_data, stripped.as_ptr(), access.as_ptr()) };
        if !handle.is_null() {
            self.open_files
                .lock()
                .expect("open files poisoned")
                .insert(handle as usize, table);
        }
        Ok(handle)
    }

    /// Stat `path`; `None` is the handler's failure status.
    pub fn stat(&self, path: &str) -> Result<Option<StatRecord>, HostError> {
        let (prefix, table) = self.handler_for(path)?;
        let stripped = cstring(&path[prefix.len()..])?;
        let mut record = StatRecord::default();
        let status = unsafe { (table.stat)(table.user_data, stripped.as_ptr(), &mut record) };
        Ok((status == 0).then_some(record))
    }

    /// List `path`; `None` is the handler's failure listing.
    pub fn read_dir(&self, path: &str) -> Result<Option<Vec<String>>, HostError> {
        let (prefix, table) = self.handler_for(path)?;
        let stripped = cstring(&path[prefix.len()..])?;
        let list = unsafe { (table.read_dir)(table.user_data, stripped.as_ptr()) };
        if list.is_null() {
            return Ok(None);
        }
        let mut names = Vec::new();
        unsafe {
            let mut i = 0;
            while !(*list.add(i)).is_null() {
                names.push(CStr::from_ptr(*list.add(i)).to_string_lossy().into_owned());
                i += 1;
            }
            (table.release_name_list)(list);
        }
        Ok(Some(names))
    }

    /// Remove `path` through its handler; `false` is the failure status.
    pub fn remove(&self, path: &str) -> Result<bool, HostError> {
        let (prefix, table) = self.handler_for(path)?;
        let stripped = cstring(&path[prefix.len()..])?;
        let status = unsafe { (table.remove)(table.user_data, stripped.as_ptr()) };
        Ok(status == 0)
    }

    /// Read into `buf`, returning the bytes filled.
    ///
    /// # Safety
    /// `file` must be a live non-null handle from [`MemoryHost::open`].
    pub unsafe fn read(&self, file: *mut c_void, buf: &mut [u8]) -> usize {
        let table = self.table_for(file);
        (table.read)(file, buf.as_mut_ptr() as *mut c_void, 1, buf.len())
    }

    /// Write `buf`, returning the bytes accepted.
    ///
    /// # Safety
    /// `file` must be a live non-null handle from [`MemoryHost::open`].
    pub unsafe fn write(&self, file: *mut c_void, buf: &[u8]) -> usize {
        let table = self.table_for(file);
        (table.write)(file, buf.as_ptr() as *const c_void, 1, buf.len())
    }

    /// # Safety
    /// `file` must be a live non-null handle from [`MemoryHost::open`].
    pub unsafe fn seek(&self, file: *mut c_void, offset: i64, whence: c_int) -> c_int {
        let table = self.table_for(file);
        (table.seek)(file, offset, whence)
    }

    /// # Safety
    /// `file` must be a live non-null handle from [`MemoryHost::open`].
    pub unsafe fn tell(&self, file: *mut c_void) -> u64 {
        let table = self.table_for(file);
        (table.tell)(file)
    }

    /// # Safety
    /// `file` must be a live non-null handle from [`MemoryHost::open`].
    pub unsafe fn flush(&self, file: *mut c_void) -> c_int {
        let table = self.table_for(file);
        (table.flush)(file)
    }

    /// Close the handle. After this call `file` is dead.
    ///
    /// # Safety
    /// `file` must be a live non-null handle from [`MemoryHost::open`],
    /// closed at most once.
    pub unsafe fn close(&self, file: *mut c_void) -> c_int {
        let table = self
            .open_files
            .lock()
            .expect("open files poisoned")
            .remove(&(file as usize))
            .expect("handle was not produced by this host");
        (table.close)(file)
    }
}

impl VfsHost for MemoryHost {
    fn known_prefixes(&self) -> Vec<String> {
        self.handlers
            .lock()
            .expect("handlers poisoned")
            .keys()
            .cloned()
            .collect()
    }

    fn install_handler(&self, prefix: &str, callbacks: CallbackTable) -> Result<(), HostError> {
        let mut handlers = self.handlers.lock().expect("handlers poisoned");
        if handlers.contains_key(prefix) {
            return Err(HostError::PrefixTaken {
                prefix: prefix.to_string(),
            });
        }
        handlers.insert(prefix.to_string(), callbacks);
        Ok(())
    }

    fn remove_handler(&self, prefix: &str) -> Result<Option<CallbackTable>, HostError> {
        Ok(self
            .handlers
            .lock()
            .expect("handlers poisoned")
            .remove(prefix))
    }
}

fn cstring(value: &str) -> Result<CString, HostError> {
    CString::new(value).map_err(|_| HostError::Other {
        message: format!("path {:?} contains a NUL byte", value),
    })
}
