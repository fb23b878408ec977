//! Integration tests driving the bridge through the installed callback
//! table, the way the native runtime would: paths go in with the reserved
//! prefix, handles come back as opaque pointers, and failures surface as
//! sentinel returns plus the per-thread diagnostic.

use std::io::Cursor;

use gatefs_bridge::{
    install, last_error, uninstall, BridgeState, InstallOutcome, MemoryHost, SEEK_END, SEEK_SET,
};
use gatefs_opener::{MemContainer, OpenedStream, Opener, OpenerError};

fn installed() -> (MemoryHost, std::sync::Arc<BridgeState>) {
    let host = MemoryHost::new();
    let state = BridgeState::new();
    assert_eq!(install(&host, &state).unwrap(), InstallOutcome::Installed);
    (host, state)
}

fn twelve_byte_container() -> MemContainer {
    let container = MemContainer::new();
    container.insert("data/sample.bin", b"twelve bytes".to_vec());
    container
}

#[test]
fn read_through_matches_source() {
    let (host, state) = installed();
    let container = twelve_byte_container();
    let registration = state
        .register("data/sample.bin", "r", Opener::container(container.clone()))
        .unwrap();

    let file = host.open(registration.vsi_path(), "r").unwrap();
    assert!(!file.is_null());

    let mut buf = [0u8; 12];
    assert_eq!(unsafe { host.read(file, &mut buf) }, 12);
    assert_eq!(&buf[..], container.get("data/sample.bin").unwrap());

    assert_eq!(unsafe { host.close(file) }, 0);
    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn partial_read_then_close_scenario() {
    let (host, state) = installed();
    let registration = state
        .register(
            "data/sample.bin",
            "r",
            Opener::container(twelve_byte_container()),
        )
        .unwrap();

    let file = host.open(registration.vsi_path(), "r").unwrap();
    assert!(!file.is_null());

    // First 5 bytes.
    let mut buf = [0u8; 5];
    assert_eq!(unsafe { host.read(file, &mut buf) }, 5);
    assert_eq!(&buf, b"twelv");

    // Asking for 20 more returns the remaining 7; the short count is
    // success, not failure.
    let mut buf = [0u8; 20];
    assert_eq!(unsafe { host.read(file, &mut buf) }, 7);
    assert_eq!(&buf[..7], b"e bytes");
    assert_eq!(last_error(), None);

    assert_eq!(unsafe { host.close(file) }, 0);
    assert_eq!(state.live_handles(), 0);

    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn seek_and_tell_through_callbacks() {
    let (host, state) = installed();
    let registration = state
        .register(
            "data/sample.bin",
            "r",
            Opener::container(twelve_byte_container()),
        )
        .unwrap();

    let file = host.open(registration.vsi_path(), "rb").unwrap();

    assert_eq!(unsafe { host.seek(file, 0, SEEK_END) }, 0);
    assert_eq!(unsafe { host.tell(file) }, 12);

    assert_eq!(unsafe { host.seek(file, 7, SEEK_SET) }, 0);
    let mut buf = [0u8; 5];
    assert_eq!(unsafe { host.read(file, &mut buf) }, 5);
    assert_eq!(&buf, b"bytes");

    unsafe { host.close(file) };
    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn open_of_unregistered_key_fails_without_a_handle() {
    let (host, _state) = installed();

    let file = host.open("/gatefs/never/registered.bin", "r").unwrap();
    assert!(file.is_null());
    let diagnostic = last_error().expect("diagnostic reported");
    assert!(diagnostic.contains("no opener registered"));
    assert!(diagnostic.contains("never/registered.bin"));

    uninstall(&host).unwrap();
}

#[test]
fn open_after_scope_exit_fails_cleanly() {
    let (host, state) = installed();
    let registration = state
        .register(
            "data/sample.bin",
            "r",
            Opener::container(twelve_byte_container()),
        )
        .unwrap();
    let path = registration.vsi_path().to_string();

    let file = host.open(&path, "r").unwrap();
    assert!(!file.is_null());
    unsafe { host.close(file) };

    drop(registration);
    let file = host.open(&path, "r").unwrap();
    assert!(file.is_null());
    assert!(last_error().unwrap().contains("no opener registered"));

    uninstall(&host).unwrap();
}

#[test]
fn sidecar_paths_resolve_through_the_same_registration() {
    let (host, state) = installed();
    let container = twelve_byte_container();
    container.insert("data/sample.bin.aux.xml", b"<aux/>".to_vec());

    let registration = state
        .register("data/sample.bin", "r", Opener::container(container))
        .unwrap();

    // The sibling file was never registered by name; it reuses the key.
    let file = host.open("/gatefs/data/sample.bin.aux.xml", "r").unwrap();
    assert!(!file.is_null());
    let mut buf = [0u8; 6];
    assert_eq!(unsafe { host.read(file, &mut buf) }, 6);
    assert_eq!(&buf, b"<aux/>");
    unsafe { host.close(file) };

    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn stat_reports_file_and_directory() {
    let (host, state) = installed();
    let registration = state
        .register(
            "data/sample.bin",
            "r",
            Opener::container(twelve_byte_container()),
        )
        .unwrap();

    let file_stat = host.stat("/gatefs/data/sample.bin").unwrap().unwrap();
    assert!(file_stat.is_file());
    assert_eq!(file_stat.size, 12);

    let dir_stat = host.stat("/gatefs/data").unwrap().unwrap();
    assert!(dir_stat.is_dir());

    assert!(host.stat("/gatefs/data/absent.bin").unwrap().is_none());

    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn read_dir_returns_base_names() {
    let (host, state) = installed();
    let container = MemContainer::new();
    container.insert("dir/a.tif", b"1".to_vec());
    container.insert("dir/a.tif.aux.xml", b"2".to_vec());

    let registration = state
        .register("dir/a.tif", "r", Opener::container(container))
        .unwrap();

    let names = host.read_dir("/gatefs/dir").unwrap().unwrap();
    assert_eq!(names, vec!["a.tif".to_string(), "a.tif.aux.xml".to_string()]);

    // A directory nobody registered produces the failure listing.
    assert!(host.read_dir("/gatefs/elsewhere").unwrap().is_none());

    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn write_remove_roundtrip() {
    let (host, state) = installed();
    let container = MemContainer::new();
    container.insert("out/old.bin", b"stale".to_vec());

    let registration = state
        .register("out/fresh.bin", "w", Opener::container(container.clone()))
        .unwrap();

    // Overwrite flow: the runtime clears the old resource first.
    assert!(host.remove("/gatefs/out/old.bin").unwrap());
    assert_eq!(container.get("out/old.bin"), None);

    let file = host.open(registration.vsi_path(), "w").unwrap();
    assert!(!file.is_null());
    assert_eq!(unsafe { host.write(file, b"fresh bytes") }, 11);
    assert_eq!(unsafe { host.flush(file) }, 0);
    assert_eq!(unsafe { host.close(file) }, 0);

    assert_eq!(container.get("out/fresh.bin"), Some(b"fresh bytes".to_vec()));

    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn factory_opener_serves_streams() {
    let (host, state) = installed();

    let payload = b"factory payload".to_vec();
    let opener = Opener::factory(move |path: &str, _mode: &str| {
        if path == "virtual/one.bin" {
            Ok(OpenedStream::new(Cursor::new(payload.clone())))
        } else {
            Err(OpenerError::not_found(path))
        }
    });

    let registration = state.register("virtual/one.bin", "r", opener).unwrap();

    let stat = host.stat(registration.vsi_path()).unwrap().unwrap();
    assert!(stat.is_file());
    assert_eq!(stat.size, 15);

    let file = host.open(registration.vsi_path(), "r").unwrap();
    let mut buf = [0u8; 15];
    assert_eq!(unsafe { host.read(file, &mut buf) }, 15);
    assert_eq!(&buf[..], b"factory payload");
    unsafe { host.close(file) };

    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn panicking_opener_is_contained_at_the_boundary() {
    let (host, state) = installed();

    let opener = Opener::factory(|path: &str, _mode: &str| -> Result<OpenedStream, OpenerError> {
        if path.ends_with("boom.bin") {
            panic!("opener exploded");
        }
        Err(OpenerError::not_found(path))
    });

    let registration = state.register("virtual/boom.bin", "r", opener).unwrap();

    let file = host.open(registration.vsi_path(), "r").unwrap();
    assert!(file.is_null());
    assert!(last_error().unwrap().contains("panic"));

    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn concurrent_keys_are_isolated() {
    let (host, state) = installed();
    let host = std::sync::Arc::new(host);
    let mut threads = Vec::new();

    for i in 0..4 {
        let host = std::sync::Arc::clone(&host);
        let state = std::sync::Arc::clone(&state);
        threads.push(std::thread::spawn(move || {
            let path = format!("thread{}/blob.bin", i);
            let body = format!("payload for thread {}", i);
            let container = MemContainer::new();
            container.insert(path.clone(), body.clone().into_bytes());

            for _ in 0..50 {
                let registration = state
                    .register(&path, "r", Opener::container(container.clone()))
                    .unwrap();
                let file = host.open(registration.vsi_path(), "r").unwrap();
                assert!(!file.is_null());

                let mut buf = vec![0u8; body.len()];
                assert_eq!(unsafe { host.read(file, &mut buf) }, body.len());
                assert_eq!(buf, body.as_bytes());
                assert_eq!(unsafe { host.close(file) }, 0);
            }
        }));
    }
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(state.live_handles(), 0);
    uninstall(host.as_ref()).unwrap();
}

#[test]
fn independent_states_do_not_share_registrations() {
    let host_a = MemoryHost::new();
    let host_b = MemoryHost::new();
    let state_a = BridgeState::new();
    let state_b = BridgeState::new();
    install(&host_a, &state_a).unwrap();
    install(&host_b, &state_b).unwrap();

    let registration = state_a
        .register(
            "data/sample.bin",
            "r",
            Opener::container(twelve_byte_container()),
        )
        .unwrap();

    // Host B's table points at state B, which has no registration.
    let file = host_b.open(registration.vsi_path(), "r").unwrap();
    assert!(file.is_null());

    let file = host_a.open(registration.vsi_path(), "r").unwrap();
    assert!(!file.is_null());
    unsafe { host_a.close(file) };

    drop(registration);
    uninstall(&host_a).unwrap();
    uninstall(&host_b).unwrap();
}
