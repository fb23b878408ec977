//! Bridge between caller-supplied openers and a native VFS runtime.
//!
//! A native I/O runtime with a pluggable virtual-filesystem layer can read
//! and write through high-level stream objects instead of its built-in
//! drivers. The runtime invokes this bridge through a narrow C-compatible
//! callback table on its own worker threads; the bridge resolves the opener
//! registered for the path, tracks the resulting stream in a handle table,
//! and converts every failure into the runtime's error-reporting
//! conventions. No unwind ever crosses the boundary.
//!
//! Typical flow:
//!
//! ```rust
//! use gatefs_bridge::{install, uninstall, BridgeState, MemoryHost};
//! use gatefs_opener::{MemContainer, Opener};
//!
//! let host = MemoryHost::new();
//! let state = BridgeState::new();
//! install(&host, &state).unwrap();
//!
//! let container = MemContainer::new();
//! container.insert("data/a.bin", b"twelve bytes".to_vec());
//!
//! let registration = state
//!     .register("data/a.bin", "r", Opener::container(container))
//!     .unwrap();
//!
//! // The runtime opens the synthetic path and reads through the callbacks.
//! let file = host.open(registration.vsi_path(), "r").unwrap();
//! assert!(!file.is_null());
//! let mut buf = [0u8; 12];
//! assert_eq!(unsafe { host.read(file, &mut buf) }, 12);
//! # unsafe { host.close(file) };
//! # drop(registration);
//! # uninstall(&host).unwrap();
//! ```

mod dispatch;
mod error;
mod ffi;
mod handles;
mod host;
mod install;
mod key;
mod register;
mod registry;

pub use dispatch::BridgeState;
pub use error::{HandleError, HostError, InstallError, RegistrationError};
pub use ffi::{
    gatefs_clear_last_error, gatefs_last_error_message, gatefs_release_name_list, last_error,
    CallbackTable, CloseCallback, FlushCallback, OpenCallback, ReadCallback, ReadDirCallback,
    ReleaseNameListCallback, RemoveCallback, SeekCallback, StatCallback, StatRecord, TellCallback,
    WriteCallback, SEEK_CUR, SEEK_END, SEEK_SET, STAT_MODE_DIR, STAT_MODE_FILE, TELL_FAILED,
};
pub use handles::{HandleId, HandleTable};
pub use host::{MemoryHost, VfsHost};
pub use install::{install, uninstall, vsi_path, InstallOutcome, PLUGIN_PREFIX};
pub use key::{ModeClass, RegistrationKey};
pub use register::Registration;
pub use registry::{OpenerRegistry, RegistrationGuard};
