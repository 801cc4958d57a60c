#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Netowner
//!
//! Discover the TCP connections on a host and attribute each one to the
//! process that owns it.
//!
//! On Linux the connection tables under `/proc/net` are parsed directly and
//! joined against a walk of every process's open descriptors, by socket
//! inode. Where no `/proc` exists the same answers come from `netstat` and
//! `lsof`.
//!
//! Connections and processes are read in two separate scans, so the result
//! is a best effort: a connection that closes in between is simply missing.
//!
//! ## Quick Start
//!
//! ```no_run
//! use netowner::Spy;
//!
//! let spy = Spy::detect();
//!
//! // No privileges needed for this one
//! for conn in spy.connections()? {
//!     println!("{conn}");
//! }
//!
//! // Other users' processes are only visible as root
//! for owned in spy.processes()? {
//!     println!("{owned}");
//! }
//! # Ok::<(), netowner::Error>(())
//! ```
//!
//! ## Features
//!
//! - `linux-procfs` - Build the socket index with the `procfs` crate
//! - `serde-support` - Serialization for all data structures and JSON fixtures

mod backend;
mod config;
mod error;
mod external;
mod fixture;
mod join;
mod pool;
mod process;
mod procnet;
mod spy;
mod types;

// Re-export core types
pub use error::{Error, Result};
pub use types::{Connection, ConnectionProcess, Process, Protocol, SocketIndex, TcpState};

// Facade and strategies
pub use backend::{Backend, NativeBackend};
pub use config::{SpyConfig, DEFAULT_PROC_ROOT};
pub use external::{
    parse_lsof, parse_lsof_inodes, parse_netstat, CommandRunner, ExternalBackend, SystemRunner,
    LSOF_FIELDS, LSOF_INODE_FIELDS,
};
pub use fixture::FixtureBackend;
pub use spy::Spy;

// Building blocks. `ExternalBackend::socket_index` (lsof inode mode) is one
// too: it pairs with `NativeBackend::connections_in_state` and `attribute`
// where `/proc/net` is readable but per-process `fd` directories are not.
pub use join::attribute;
pub use pool::{BufferPool, PooledBuffer};
#[cfg(all(feature = "linux-procfs", target_os = "linux"))]
pub use process::walk_processes_procfs;
pub use process::walk_processes;
pub use procnet::{decode_address, encode_address, read_tables, ProcNet};
