//! Callback entry points invoked by the native runtime.
//!
//! These are the narrow C-compatible functions behind [`CallbackTable`].
//! The runtime calls them on its own worker threads, concurrently and
//! without coordination with the registering collaborator. Its calling
//! convention has no channel for unwinding, so every body runs inside
//! `catch_unwind` and converts any failure - a missing registration, a
//! stream error, a panic in caller-supplied opener code - into the
//! per-thread diagnostic plus that operation's sentinel return. Nothing
//! escapes unconverted.

use std::ffi::{c_void, CStr};
use std::io::SeekFrom;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;

use lazy_static::lazy_static;
use libc::{c_char, c_int};
use tracing::trace;

use gatefs_opener::{Opener, OpenerError};

use crate::ffi::{
    clear_last_error, gatefs_release_name_list, name_list_into_raw, set_last_error, CallbackTable,
    StatRecord, SEEK_CUR, SEEK_END, SEEK_SET, STAT_MODE_DIR, STAT_MODE_FILE, TELL_FAILED,
};
use crate::handles::{HandleId, HandleTable};
use crate::key::{ModeClass, RegistrationKey};
use crate::registry::OpenerRegistry;

/// The bridge's shared mutable state: the opener registry and the handle
/// table, reachable from callbacks through the table's `user_data` pointer.
///
/// The state is explicitly owned and injectable rather than an implicit
/// global - tests install independent instances against independent hosts.
/// [`BridgeState::global`] offers a process-wide default for integrations
/// with a single runtime.
pub struct BridgeState {
    pub(crate) registry: OpenerRegistry,
    pub(crate) handles: Arc<HandleTable>,
}

lazy_static! {
    static ref GLOBAL_STATE: Arc<BridgeState> = BridgeState::new();
}

impl BridgeState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            registry: OpenerRegistry::new(),
            handles: Arc::new(HandleTable::new()),
        })
    }

    /// The process-wide default instance.
    pub fn global() -> &'static Arc<BridgeState> {
        &GLOBAL_STATE
    }

    /// Number of live stream handles, mainly for teardown assertions.
    pub fn live_handles(&self) -> usize {
        self.handles.live()
    }
}

/// Per-file token crossing the boundary as an opaque pointer. Carries its
/// own reference to the handle table, since per-file callbacks do not
/// receive `user_data` back.
struct HandleToken {
    id: HandleId,
    handles: Arc<HandleTable>,
}

/// Build the callback table for `state`.
///
/// The table owns one strong reference to `state` through `user_data`;
/// `install::uninstall` reclaims it.
pub(crate) fn callback_table(state: &Arc<BridgeState>) -> CallbackTable {
    CallbackTable {
        user_data: Arc::into_raw(Arc::clone(state)) as *mut c_void,
        open: vsi_open,
        stat: vsi_stat,
        read_dir: vsi_read_dir,
        remove: vsi_remove,
        read: vsi_read,
        write: vsi_write,
        seek: vsi_seek,
        tell: vsi_tell,
        flush: vsi_flush,
        close: vsi_close,
        release_name_list: gatefs_release_name_list,
    }
}

/// Run a callback body, converting any failure or panic into the diagnostic
/// channel plus `sentinel`.
fn boundary<T>(sentinel: T, body: impl FnOnce() -> Result<T, String>) -> T {
    clear_last_error();
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => value,
        Ok(Err(message)) => {
            set_last_error(&message);
            sentinel
        }
        Err(_) => {
            set_last_error("panic across callback boundary");
            sentinel
        }
    }
}

/// # Safety
/// `user_data` must be the `Arc<BridgeState>` pointer from `callback_table`
/// and the plugin must still be installed.
unsafe fn state_ref<'a>(user_data: *mut c_void) -> Result<&'a BridgeState, String> {
    (user_data as *const BridgeState)
        .as_ref()
        .ok_or_else(|| "bridge state pointer is null".to_string())
}

/// # Safety
/// `file` must be a handle returned by the open callback and not yet closed.
unsafe fn token_ref<'a>(file: *mut c_void) -> Result<&'a HandleToken, String> {
    (file as *const HandleToken)
        .as_ref()
        .ok_or_else(|| "stream handle is null".to_string())
}

/// # Safety
/// `ptr` must be null or a NUL-terminated string valid for the call.
unsafe fn cstr<'a>(ptr: *const c_char) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err("path pointer is null".to_string());
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| "path is not valid UTF-8".to_string())
}

fn resolve(state: &BridgeState, keys: &[RegistrationKey], what: &str) -> Result<Opener, String> {
    keys.iter()
        .find_map(|key| state.registry.resolve(key))
        .ok_or_else(|| format!("open failed: no opener registered for {}", what))
}

pub(crate) unsafe extern "C" fn vsi_open(
    user_data: *mut c_void,
    path: *const c_char,
    access: *const c_char,
) -> *mut c_void {
    boundary(ptr::null_mut(), || {
        let state = unsafe { state_ref(user_data) }?;
        let path = unsafe { cstr(path) }?;
        let access = unsafe { cstr(access) }?;

        let mode = ModeClass::parse(access).map_err(|e| e.to_string())?;
        let key = RegistrationKey::for_path(path, mode);
        let opener = resolve(state, &[key], &format!("{:?} (mode {:?})", path, access))?;
        let opened = opener
            .open(path, access)
            .map_err(|e| format!("open failed for {:?}: {}", path, e))?;

        let id = state.handles.track(opened);
        trace!(%id, path, access, "opened through bridge");
        let token = Box::new(HandleToken {
            id,
            handles: Arc::clone(&state.handles),
        });
        Ok(Box::into_raw(token) as *mut c_void)
    })
}

fn stat_record(opener: &Opener, path: &str) -> Result<StatRecord, OpenerError> {
    if opener.is_file(path)? {
        Ok(StatRecord {
            size: opener.size(path)?,
            mtime: opener.mtime(path)? as i64,
            mode: STAT_MODE_FILE,
        })
    } else if opener.is_dir(path)? {
        Ok(StatRecord {
            size: 0,
            mtime: 0,
            mode: STAT_MODE_DIR,
        })
    } else {
        Err(OpenerError::not_found(path))
    }
}

pub(crate) unsafe extern "C" fn vsi_stat(
    user_data: *mut c_void,
    path: *const c_char,
    out: *mut StatRecord,
) -> c_int {
    boundary(-1, || {
        let state = unsafe { state_ref(user_data) }?;
        let path = unsafe { cstr(path) }?;
        if out.is_null() {
            return Err("stat output pointer is null".to_string());
        }

        // The queried path may be a file inside a registered directory, or
        // the registered directory itself.
        let opener = resolve(
            state,
            &[
                RegistrationKey::for_path(path, ModeClass::Read),
                RegistrationKey::for_directory(path, ModeClass::Read),
            ],
            &format!("{:?}", path),
        )?;
        let record =
            stat_record(&opener, path).map_err(|e| format!("stat failed for {:?}: {}", path, e))?;
        unsafe { *out = record };
        Ok(0)
    })
}

pub(crate) unsafe extern "C" fn vsi_read_dir(
    user_data: *mut c_void,
    path: *const c_char,
) -> *mut *mut c_char {
    boundary(ptr::null_mut(), || {
        let state = unsafe { state_ref(user_data) }?;
        let path = unsafe { cstr(path) }?;

        let key = RegistrationKey::for_directory(path, ModeClass::Read);
        let opener = resolve(state, &[key], &format!("directory {:?}", path))?;
        let names = opener
            .ls(path)
            .map_err(|e| format!("listing failed for {:?}: {}", path, e))?;
        Ok(name_list_into_raw(names))
    })
}

pub(crate) unsafe extern "C" fn vsi_remove(user_data: *mut c_void, path: *const c_char) -> c_int {
    boundary(-1, || {
        let state = unsafe { state_ref(user_data) }?;
        let path = unsafe { cstr(path) }?;

        // Deletion happens while a write registration is active (clearing a
        // resource about to be overwritten), so the write key wins.
        let opener = resolve(
            state,
            &[
                RegistrationKey::for_path(path, ModeClass::Write),
                RegistrationKey::for_path(path, ModeClass::Read),
            ],
            &format!("{:?}", path),
        )?;
        opener
            .remove(path)
            .map_err(|e| format!("remove failed for {:?}: {}", path, e))?;
        Ok(0)
    })
}

pub(crate) unsafe extern "C" fn vsi_read(
    file: *mut c_void,
    buffer: *mut c_void,
    size: usize,
    count: usize,
) -> usize {
    boundary(0, || {
        let token = unsafe { token_ref(file) }?;
        if size == 0 || count == 0 {
            return Ok(0);
        }
        if buffer.is_null() {
            return Err("read buffer is null".to_string());
        }
        let total = size.checked_mul(count).ok_or("read request overflows")?;
        let buf = unsafe { std::slice::from_raw_parts_mut(buffer as *mut u8, total) };

        let n = token
            .handles
            .read(token.id, buf)
            .map_err(|e| e.to_string())?;
        Ok(n / size)
    })
}

pub(crate) unsafe extern "C" fn vsi_write(
    file: *mut c_void,
    buffer: *const c_void,
    size: usize,
    count: usize,
) -> usize {
    boundary(0, || {
        let token = unsafe { token_ref(file) }?;
        if size == 0 || count == 0 {
            return Ok(0);
        }
        if buffer.is_null() {
            return Err("write buffer is null".to_string());
        }
        let total = size.checked_mul(count).ok_or("write request overflows")?;
        let buf = unsafe { std::slice::from_raw_parts(buffer as *const u8, total) };

        let n = token
            .handles
            .write(token.id, buf)
            .map_err(|e| e.to_string())?;
        Ok(n / size)
    })
}

pub(crate) unsafe extern "C" fn vsi_seek(file: *mut c_void, offset: i64, whence: c_int) -> c_int {
    boundary(-1, || {
        let token = unsafe { token_ref(file) }?;
        let pos = match whence {
            SEEK_SET if offset >= 0 => SeekFrom::Start(offset as u64),
            SEEK_SET => return Err(format!("negative absolute seek offset {}", offset)),
            SEEK_CUR => SeekFrom::Current(offset),
            SEEK_END => SeekFrom::End(offset),
            other => return Err(format!("invalid seek origin {}", other)),
        };
        token
            .handles
            .seek(token.id, pos)
            .map_err(|e| e.to_string())?;
        Ok(0)
    })
}

pub(crate) unsafe extern "C" fn vsi_tell(file: *mut c_void) -> u64 {
    boundary(TELL_FAILED, || {
        let token = unsafe { token_ref(file) }?;
        token.handles.tell(token.id).map_err(|e| e.to_string())
    })
}

pub(crate) unsafe extern "C" fn vsi_flush(file: *mut c_void) -> c_int {
    boundary(-1, || {
        let token = unsafe { token_ref(file) }?;
        token
            .handles
            .flush(token.id)
            .map_err(|e| e.to_string())?;
        Ok(0)
    })
}

pub(crate) unsafe extern "C" fn vsi_close(file: *mut c_void) -> c_int {
    boundary(-1, || {
        if file.is_null() {
            return Err("stream handle is null".to_string());
        }
        // Consume the token: the runtime must not pass this handle again.
        let token = unsafe { Box::from_raw(file as *mut HandleToken) };
        token
            .handles
            .close(token.id)
            .map_err(|e| e.to_string())?;
        trace!(id = %token.id, "closed through bridge");
        Ok(0)
    })
}
