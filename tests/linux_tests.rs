//! Linux-specific tests against the live /proc filesystem

#![cfg(target_os = "linux")]

use std::net::{TcpListener, TcpStream};
use std::path::Path;

use netowner::{walk_processes, NativeBackend, Spy, SpyConfig, TcpState};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A loopback connection held open for the duration of a test
fn loopback_pair() -> (TcpListener, TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let client = TcpStream::connect(listener.local_addr().expect("local addr"))
        .expect("Failed to connect");
    let (server, _) = listener.accept().expect("Failed to accept");
    (listener, client, server)
}

#[test]
fn test_detects_native_backend() {
    if !Path::new("/proc/net/tcp").exists() {
        return;
    }
    let spy = Spy::new(SpyConfig::default());
    assert_eq!(spy.backend_name(), "native");
}

#[test]
fn test_own_connection_is_listed() {
    init_logging();
    if !Path::new("/proc/net/tcp").exists() {
        return;
    }
    let (_listener, client, _server) = loopback_pair();
    let local = client.local_addr().expect("client addr");
    let remote = client.peer_addr().expect("peer addr");

    let conns = Spy::new(SpyConfig::default())
        .connections()
        .expect("Failed to read connections");
    assert!(
        conns
            .iter()
            .any(|c| c.local_addr() == local && c.remote_addr() == remote),
        "client side of {local} -> {remote} should be established"
    );
}

#[test]
fn test_own_connection_is_attributed_to_us() {
    init_logging();
    if !Path::new("/proc/net/tcp").exists() {
        return;
    }
    let (_listener, client, _server) = loopback_pair();
    let local = client.local_addr().expect("client addr");

    let procs = Spy::new(SpyConfig::default())
        .processes()
        .expect("Failed to attribute connections");
    let ours = procs
        .iter()
        .find(|p| p.connection.local_addr() == local)
        .expect("our connection should have an owner");
    assert_eq!(ours.process.pid, std::process::id());
    assert!(!ours.process.name.is_empty());
}

#[test]
fn test_listener_shows_up_in_listen_state() {
    if !Path::new("/proc/net/tcp").exists() {
        return;
    }
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let port = listener.local_addr().expect("local addr").port();

    let native = NativeBackend::new(SpyConfig::default());
    let listening = native.connections_in_state(Some(TcpState::Listen));
    assert!(listening.iter().any(|c| c.local_port == port));

    let established = native.connections_in_state(Some(TcpState::Established));
    assert!(established.iter().all(|c| c.state == TcpState::Established));
}

#[test]
fn test_walk_finds_our_sockets() {
    if !Path::new("/proc/self/fd").exists() {
        return;
    }
    let _pair = loopback_pair();
    let index = walk_processes(Path::new("/proc")).expect("Failed to walk /proc");
    let me = std::process::id();
    assert!(index.values().any(|p| p.pid == me));
}
