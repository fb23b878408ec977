//! GateFS: route a native I/O runtime's reads and writes through
//! caller-supplied stream objects.
//!
//! A registration binds an [`Opener`] - a single-file factory or a
//! filesystem-like container - to a key derived from the user-visible path
//! and access mode, and yields a synthetic path under the reserved prefix.
//! Opening that synthetic path through the runtime dispatches back into the
//! bridge, which serves the runtime's open/read/seek/tell/close callbacks
//! from the registered opener's streams.
//!
//! The crates are layered: `gatefs-opener` holds the capability traits and
//! shipped containers, `gatefs-bridge` holds the registry, handle table,
//! C dispatch surface, and installer. This facade re-exports both.

pub use gatefs_bridge::{
    install, last_error, uninstall, vsi_path, BridgeState, CallbackTable, HandleError, HandleId,
    HandleTable, HostError, InstallError, InstallOutcome, MemoryHost, ModeClass, OpenerRegistry,
    Registration, RegistrationError, RegistrationGuard, RegistrationKey, StatRecord, VfsHost,
    PLUGIN_PREFIX, SEEK_CUR, SEEK_END, SEEK_SET, STAT_MODE_DIR, STAT_MODE_FILE, TELL_FAILED,
};
pub use gatefs_opener::{
    ByteStream, CloseAction, FileContainer, LocalContainer, MemContainer, OpenedStream, Opener,
    OpenerError, StreamOpener,
};
