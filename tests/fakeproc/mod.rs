//! A synthetic introspection tree for integration tests

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::os::unix::fs::{symlink, MetadataExt};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};

use netowner::{encode_address, TcpState};
use tempfile::TempDir;

const HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode\n";

pub struct FakeProc {
    dir: TempDir,
    listeners: Vec<UnixListener>,
}

impl FakeProc {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("proc/net")).expect("Failed to create net dir");
        fs::create_dir_all(dir.path().join("sockets")).expect("Failed to create socket dir");
        Self {
            dir,
            listeners: Vec::new(),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("proc")
    }

    /// Create a process directory with a `comm` file
    pub fn process(&self, pid: u32, name: &str) -> &Self {
        let pid_dir = self.root().join(pid.to_string());
        fs::create_dir_all(pid_dir.join("fd")).expect("Failed to create fd dir");
        fs::write(pid_dir.join("comm"), format!("{name}\n")).expect("Failed to write comm");
        self
    }

    /// Give `pid` a socket at descriptor `fd` and return its inode
    pub fn socket(&mut self, pid: u32, fd: u32) -> u64 {
        let socket_path = self
            .dir
            .path()
            .join("sockets")
            .join(format!("{pid}-{fd}"));
        let listener = UnixListener::bind(&socket_path).expect("Failed to bind socket");
        self.listeners.push(listener);
        self.link(pid, fd, &socket_path);
        fs::metadata(&socket_path).expect("Failed to stat socket").ino()
    }

    /// Give `pid` a regular file at descriptor `fd`
    pub fn file(&self, pid: u32, fd: u32) {
        let file_path = self.dir.path().join(format!("file-{pid}-{fd}"));
        fs::write(&file_path, "data").expect("Failed to write file");
        self.link(pid, fd, &file_path);
    }

    fn link(&self, pid: u32, fd: u32, target: &Path) {
        let link = self.root().join(pid.to_string()).join("fd").join(fd.to_string());
        symlink(target, link).expect("Failed to create fd link");
    }

    /// Write `net/<name>` with the given rows under the usual header
    pub fn table(&self, name: &str, rows: &[String]) {
        let mut content = String::from(HEADER);
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        fs::write(self.root().join("net").join(name), content).expect("Failed to write table");
    }
}

/// One connection table row in kernel format
pub fn row(slot: usize, local: SocketAddr, remote: SocketAddr, state: TcpState, inode: u64) -> String {
    format!(
        "{slot:4}: {}:{:04X} {}:{:04X} {:02X} 00000000:00000000 00:00000000 00000000  1000        0 {inode} 1 ffff88007e75a740 20 4 30 10 -1",
        encode_address(&local.ip()),
        local.port(),
        encode_address(&remote.ip()),
        remote.port(),
        state.code(),
    )
}
