//! Socket identifier to process index, built by walking `<root>/<pid>/fd`.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use nix::sys::stat::{stat, SFlag};

use crate::error::{Error, Result};
use crate::types::{Process, SocketIndex};

/// Longest process name kept; `comm` itself is capped at 16 bytes.
const NAME_BUF_LEN: usize = 64;

/// Walk every process under `proc_root` and map each open socket's inode to
/// the process holding it.
///
/// Processes and descriptors that vanish or deny access during the walk are
/// skipped. Only an unreadable `proc_root` fails the walk.
///
/// # Errors
/// Returns [`Error::RootUnavailable`] if `proc_root` cannot be listed
pub fn walk_processes(proc_root: &Path) -> Result<SocketIndex> {
    let entries = fs::read_dir(proc_root)
        .map_err(|e| Error::root_unavailable(proc_root.display().to_string(), e))?;

    let mut index = SocketIndex::new();
    let mut path = proc_root.to_path_buf();
    let mut pids = 0usize;

    for entry in entries.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(parse_pid) else {
            continue;
        };
        pids += 1;

        path.push(entry.file_name());
        index_process(pid, &mut path, &mut index);
        path.pop();
    }

    debug!(
        "indexed {} sockets across {pids} processes under {}",
        index.len(),
        proc_root.display()
    );
    Ok(index)
}

fn parse_pid(name: &str) -> Option<u32> {
    if !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok().filter(|&pid| pid > 0)
}

/// Add the sockets of one process. `path` points at the process directory
/// and is restored before returning.
fn index_process(pid: u32, path: &mut PathBuf, index: &mut SocketIndex) {
    path.push("fd");
    let fds = match fs::read_dir(&*path) {
        Ok(fds) => fds,
        Err(e) => {
            trace!("skipping pid {pid}: {e}");
            path.pop();
            return;
        }
    };

    let mut process: Option<Process> = None;
    for fd in fds.flatten() {
        if !fd.file_type().is_ok_and(|t| t.is_symlink()) {
            continue;
        }

        path.push(fd.file_name());
        let inode = socket_inode(path);
        path.pop();

        let Some(inode) = inode else {
            continue;
        };
        let owner = process.get_or_insert_with(|| {
            path.pop();
            let name = read_name(path);
            path.push("fd");
            Process::new(pid, name)
        });
        index.insert(inode, owner.clone());
    }

    path.pop();
}

/// Inode of the socket a descriptor link resolves to, if it is one
fn socket_inode(fd_path: &Path) -> Option<u64> {
    let st = stat(fd_path).ok()?;
    if st.st_mode & SFlag::S_IFMT.bits() != SFlag::S_IFSOCK.bits() {
        return None;
    }
    #[allow(clippy::useless_conversion)]
    Some(u64::from(st.st_ino))
}

/// First line of `<pid dir>/comm`, or an empty name if it cannot be read
fn read_name(pid_dir: &mut PathBuf) -> String {
    pid_dir.push("comm");
    let mut buf = [0u8; NAME_BUF_LEN];
    let read = File::open(&*pid_dir).and_then(|mut f| f.read(&mut buf));
    pid_dir.pop();

    match read {
        Ok(len) => {
            let name = &buf[..len];
            let end = name.iter().position(|&b| b == b'\n').unwrap_or(len);
            String::from_utf8_lossy(&name[..end]).into_owned()
        }
        Err(e) => {
            trace!("no name for {}: {e}", pid_dir.display());
            String::new()
        }
    }
}

/// Build the index with the `procfs` crate instead of the hand-rolled walk.
///
/// # Errors
/// Returns [`Error::RootUnavailable`] if `proc_root` cannot be listed
#[cfg(all(feature = "linux-procfs", target_os = "linux"))]
pub fn walk_processes_procfs(proc_root: &Path) -> Result<SocketIndex> {
    use procfs::process::{all_processes_with_root, FDTarget};

    let processes = all_processes_with_root(proc_root)
        .map_err(|e| Error::root_unavailable(proc_root.display().to_string(), e))?;

    let mut index = SocketIndex::new();
    for process in processes.flatten() {
        let Ok(fds) = process.fd() else {
            continue;
        };
        let Ok(pid) = u32::try_from(process.pid()) else {
            continue;
        };
        let mut owner: Option<Process> = None;
        for fd in fds.flatten() {
            if let FDTarget::Socket(inode) = fd.target {
                let owner = owner.get_or_insert_with(|| {
                    let name = process.stat().map(|s| s.comm).unwrap_or_default();
                    Process::new(pid, name)
                });
                index.insert(inode, owner.clone());
            }
        }
    }

    debug!("indexed {} sockets via procfs", index.len());
    Ok(index)
}
