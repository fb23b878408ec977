//! C-compatible types shared with the native runtime.
//!
//! The runtime addresses the bridge through [`CallbackTable`], a fixed
//! function-pointer table installed under the reserved prefix. Failures
//! inside callbacks are reported through a per-thread diagnostic slot that
//! the runtime (or an embedder) reads back with
//! [`gatefs_last_error_message`]; the failing callback itself only returns
//! a sentinel value.

use std::cell::RefCell;
use std::ffi::{c_void, CString};
use std::ptr;
use std::slice;

use libc::{c_char, c_int};

/// Seek origins, matching stdio conventions.
pub const SEEK_SET: c_int = 0;
pub const SEEK_CUR: c_int = 1;
pub const SEEK_END: c_int = 2;

/// Mode bits reported by the stat callback.
pub const STAT_MODE_FILE: u32 = 0o100000;
pub const STAT_MODE_DIR: u32 = 0o040000;

/// Sentinel offset returned by the tell callback on failure.
pub const TELL_FAILED: u64 = u64::MAX;

/// Size-and-mode record populated by the stat callback.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct StatRecord {
    pub size: u64,
    pub mtime: i64,
    pub mode: u32,
}

impl StatRecord {
    pub fn is_file(&self) -> bool {
        self.mode & STAT_MODE_FILE != 0
    }

    pub fn is_dir(&self) -> bool {
        self.mode & STAT_MODE_DIR != 0
    }
}

pub type OpenCallback = unsafe extern "C" fn(
    user_data: *mut c_void,
    path: *const c_char,
    access: *const c_char,
) -> *mut c_void;
pub type StatCallback =
    unsafe extern "C" fn(user_data: *mut c_void, path: *const c_char, out: *mut StatRecord) -> c_int;
pub type ReadDirCallback =
    unsafe extern "C" fn(user_data: *mut c_void, path: *const c_char) -> *mut *mut c_char;
pub type RemoveCallback =
    unsafe extern "C" fn(user_data: *mut c_void, path: *const c_char) -> c_int;
pub type ReadCallback = unsafe extern "C" fn(
    file: *mut c_void,
    buffer: *mut c_void,
    size: usize,
    count: usize,
) -> usize;
pub type WriteCallback = unsafe extern "C" fn(
    file: *mut c_void,
    buffer: *const c_void,
    size: usize,
    count: usize,
) -> usize;
pub type SeekCallback = unsafe extern "C" fn(file: *mut c_void, offset: i64, whence: c_int) -> c_int;
pub type TellCallback = unsafe extern "C" fn(file: *mut c_void) -> u64;
pub type FlushCallback = unsafe extern "C" fn(file: *mut c_void) -> c_int;
pub type CloseCallback = unsafe extern "C" fn(file: *mut c_void) -> c_int;
pub type ReleaseNameListCallback = unsafe extern "C" fn(list: *mut *mut c_char);

/// The fixed dispatch surface handed to the runtime at install time.
///
/// Path-addressed callbacks receive `user_data` back; per-file callbacks
/// receive the opaque handle returned by `open` instead. Directory listings
/// are owned by the plugin and returned through `release_name_list` when
/// the runtime is done walking them.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct CallbackTable {
    pub user_data: *mut c_void,
    pub open: OpenCallback,
    pub stat: StatCallback,
    pub read_dir: ReadDirCallback,
    pub remove: RemoveCallback,
    pub read: ReadCallback,
    pub write: WriteCallback,
    pub seek: SeekCallback,
    pub tell: TellCallback,
    pub flush: FlushCallback,
    pub close: CloseCallback,
    pub release_name_list: ReleaseNameListCallback,
}

// The table is shared with runtime worker threads. `user_data` is an
// `Arc<BridgeState>`, which is Send + Sync.
unsafe impl Send for CallbackTable {}
unsafe impl Sync for CallbackTable {}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

pub(crate) fn set_last_error(message: impl AsRef<str>) {
    let c = CString::new(message.as_ref())
        .unwrap_or_else(|_| CString::new("error").expect("CString"));
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = Some(c);
    });
}

pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = None;
    });
}

/// Most recent diagnostic reported by a callback on the current thread.
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|cell| {
        cell.borrow()
            .as_ref()
            .map(|c| c.to_string_lossy().into_owned())
    })
}

/// C accessor for the current thread's diagnostic. Returns an empty string
/// when none is recorded. The pointer stays valid until the next callback
/// on this thread.
#[no_mangle]
pub extern "C" fn gatefs_last_error_message() -> *const c_char {
    static EMPTY: &[u8] = b"\0";
    LAST_ERROR.with(|cell| match cell.borrow().as_ref() {
        Some(s) => s.as_ptr(),
        None => EMPTY.as_ptr() as *const c_char,
    })
}

#[no_mangle]
pub extern "C" fn gatefs_clear_last_error() {
    clear_last_error();
}

/// Convert names into a heap-allocated, NUL-terminated array of C strings.
/// Ownership passes to the caller, who returns it to
/// [`gatefs_release_name_list`].
pub(crate) fn name_list_into_raw(names: Vec<String>) -> *mut *mut c_char {
    let mut out: Vec<*mut c_char> = Vec::with_capacity(names.len() + 1);
    for name in names {
        let c = CString::new(name).unwrap_or_else(|_| CString::new("?").expect("CString"));
        out.push(c.into_raw());
    }
    out.push(ptr::null_mut());
    Box::into_raw(out.into_boxed_slice()) as *mut *mut c_char
}

/// Free a listing produced by the read_dir callback.
///
/// # Safety
/// - `list` must be a pointer produced by the read_dir callback (or null).
/// - `list` must not be freed more than once.
#[no_mangle]
pub unsafe extern "C" fn gatefs_release_name_list(list: *mut *mut c_char) {
    if list.is_null() {
        return;
    }
    let mut len = 0;
    while !(*list.add(len)).is_null() {
        len += 1;
    }
    let entries = slice::from_raw_parts_mut(list, len + 1);
    for entry in entries.iter().take(len) {
        drop(CString::from_raw(*entry));
    }
    drop(Box::from_raw(entries as *mut [*mut c_char]));
}
