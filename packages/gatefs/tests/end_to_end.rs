//! End-to-end scenarios through the facade: a collaborator registers an
//! opener, hands the synthetic path to the runtime, and the runtime's
//! worker threads read through the bridge.

use std::fs;
use std::io::Cursor;
use std::sync::Arc;

use gatefs::{
    install, uninstall, BridgeState, LocalContainer, MemContainer, MemoryHost, OpenedStream,
    Opener, OpenerError, SEEK_SET,
};

#[test]
fn register_open_read_close() {
    let host = MemoryHost::new();
    let state = BridgeState::new();
    install(&host, &state).unwrap();

    let container = MemContainer::new();
    container.insert("scenes/first.bin", b"scene payload".to_vec());

    let registration = state
        .register("scenes/first.bin", "r", Opener::container(container))
        .unwrap();
    assert!(registration.vsi_path().starts_with("/gatefs/"));

    let file = host.open(registration.vsi_path(), "r").unwrap();
    assert!(!file.is_null());

    let mut buf = [0u8; 13];
    assert_eq!(unsafe { host.read(file, &mut buf) }, 13);
    assert_eq!(&buf[..], b"scene payload");
    assert_eq!(unsafe { host.close(file) }, 0);

    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn closures_work_as_openers() {
    let host = MemoryHost::new();
    let state = BridgeState::new();
    install(&host, &state).unwrap();

    let opener = Opener::factory(|path: &str, _mode: &str| {
        if path == "mem/blob.bin" {
            Ok(OpenedStream::new(Cursor::new(b"from a closure".to_vec())))
        } else {
            Err(OpenerError::not_found(path))
        }
    });

    let registration = state.register("mem/blob.bin", "r", opener).unwrap();
    let file = host.open(registration.vsi_path(), "r").unwrap();
    assert!(!file.is_null());

    unsafe {
        host.seek(file, 7, SEEK_SET);
        let mut buf = [0u8; 7];
        assert_eq!(host.read(file, &mut buf), 7);
        assert_eq!(&buf, b"closure");
        host.close(file);
    }

    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn local_files_round_trip_through_the_bridge() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("raster.bin"), b"pixels").unwrap();

    let host = MemoryHost::new();
    let state = BridgeState::new();
    install(&host, &state).unwrap();

    let registration = state
        .register(
            "raster.bin",
            "r",
            Opener::container(LocalContainer::new(dir.path())),
        )
        .unwrap();

    let stat = host.stat(registration.vsi_path()).unwrap().unwrap();
    assert!(stat.is_file());
    assert_eq!(stat.size, 6);

    let file = host.open(registration.vsi_path(), "rb").unwrap();
    let mut buf = [0u8; 6];
    assert_eq!(unsafe { host.read(file, &mut buf) }, 6);
    assert_eq!(&buf, b"pixels");
    unsafe { host.close(file) };

    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn listing_a_registered_directory() {
    let host = MemoryHost::new();
    let state = BridgeState::new();
    install(&host, &state).unwrap();

    let container = MemContainer::new();
    container.insert("dir/a.tif", vec![0u8; 4]);
    container.insert("dir/a.tif.aux.xml", b"<aux/>".to_vec());

    let registration = state
        .register("dir/a.tif", "r", Opener::container(container))
        .unwrap();

    let names = host.read_dir("/gatefs/dir").unwrap().unwrap();
    assert_eq!(names, vec!["a.tif".to_string(), "a.tif.aux.xml".to_string()]);

    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn write_mode_registration_publishes_bytes() {
    let host = MemoryHost::new();
    let state = BridgeState::new();
    install(&host, &state).unwrap();

    let container = MemContainer::new();
    let registration = state
        .register("out/result.bin", "w", Opener::container(container.clone()))
        .unwrap();

    let file = host.open(registration.vsi_path(), "w").unwrap();
    assert!(!file.is_null());
    assert_eq!(unsafe { host.write(file, b"written through bridge") }, 22);
    assert_eq!(unsafe { host.close(file) }, 0);

    assert_eq!(
        container.get("out/result.bin"),
        Some(b"written through bridge".to_vec())
    );

    drop(registration);
    uninstall(&host).unwrap();
}

#[test]
fn reader_threads_share_one_registration() {
    let host = Arc::new(MemoryHost::new());
    let state = BridgeState::new();
    install(host.as_ref(), &state).unwrap();

    let container = MemContainer::new();
    container.insert("shared/blob.bin", b"same bytes for everyone".to_vec());

    let registration = Arc::new(
        state
            .register("shared/blob.bin", "r", Opener::container(container))
            .unwrap(),
    );

    let mut threads = Vec::new();
    for _ in 0..4 {
        let host = Arc::clone(&host);
        let registration = Arc::clone(&registration);
        threads.push(std::thread::spawn(move || {
            for _ in 0..25 {
                let file = host.open(registration.vsi_path(), "r").unwrap();
                assert!(!file.is_null());
                let mut buf = [0u8; 23];
                assert_eq!(unsafe { host.read(file, &mut buf) }, 23);
                assert_eq!(&buf[..], b"same bytes for everyone");
                assert_eq!(unsafe { host.close(file) }, 0);
            }
        }));
    }
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(state.live_handles(), 0);
    drop(registration);
    uninstall(host.as_ref()).unwrap();
}

#[test]
fn global_state_serves_single_runtime_integrations() {
    let host = MemoryHost::new();
    let state = BridgeState::global();
    install(&host, state).unwrap();

    let container = MemContainer::new();
    container.insert("global/one.bin", b"shared state".to_vec());

    let registration = state
        .register("global/one.bin", "r", Opener::container(container))
        .unwrap();
    let file = host.open(registration.vsi_path(), "r").unwrap();
    assert!(!file.is_null());
    let mut buf = [0u8; 12];
    assert_eq!(unsafe { host.read(file, &mut buf) }, 12);
    unsafe { host.close(file) };

    drop(registration);
    uninstall(&host).unwrap();
}
