//! macOS-specific tests using netstat and lsof

#![cfg(target_os = "macos")]

use std::net::{TcpListener, TcpStream};

use netowner::{Spy, SpyConfig};

#[test]
fn test_detects_external_backend() {
    let spy = Spy::new(SpyConfig::default());
    assert_eq!(spy.backend_name(), "external");
}

#[test]
fn test_own_connection_via_tools() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let client =
        TcpStream::connect(listener.local_addr().expect("local addr")).expect("Failed to connect");
    let _server = listener.accept().expect("Failed to accept");
    let local = client.local_addr().expect("client addr");

    let spy = Spy::new(SpyConfig::default());
    let conns = spy.connections().expect("netstat should run");
    assert!(conns.iter().any(|c| c.local_addr() == local));

    let procs = spy.processes().expect("lsof should run");
    let ours = procs
        .iter()
        .find(|p| p.connection.local_addr() == local)
        .expect("our connection should have an owner");
    assert_eq!(ours.process.pid, std::process::id());
}
