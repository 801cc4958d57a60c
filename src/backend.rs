//! Interchangeable discovery strategies behind [`crate::Spy`].

use std::path::Path;

use log::debug;

use crate::config::SpyConfig;
use crate::error::Result;
use crate::join::attribute;
use crate::pool::BufferPool;
use crate::procnet::read_tables;
use crate::types::{Connection, ConnectionProcess, SocketIndex, TcpState};

/// A way of answering the two discovery queries
#[cfg_attr(test, mockall::automock)]
pub trait Backend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Established TCP connections
    ///
    /// # Errors
    /// Returns an error only if the underlying source is entirely unavailable
    fn connections(&self) -> Result<Vec<Connection>>;

    /// Established TCP connections with their owning processes.
    /// Connections without an owner are left out.
    ///
    /// # Errors
    /// Returns an error only if the underlying source is entirely unavailable
    fn processes(&self) -> Result<Vec<ConnectionProcess>>;
}

/// Discovery straight from the introspection filesystem
#[derive(Debug, Default)]
pub struct NativeBackend {
    config: SpyConfig,
    pool: BufferPool,
}

impl NativeBackend {
    #[must_use]
    pub fn new(config: SpyConfig) -> Self {
        Self {
            config,
            pool: BufferPool::new(),
        }
    }

    /// Root of the introspection filesystem in use
    #[must_use]
    pub fn proc_root(&self) -> &Path {
        &self.config.proc_root
    }

    /// Rows of the connection tables in `wanted` state, every state for `None`
    #[must_use]
    pub fn connections_in_state(&self, wanted: Option<TcpState>) -> Vec<Connection> {
        read_tables(&self.config.tables(), wanted, &self.pool)
    }

    /// Socket identifier to process index for the whole process table
    ///
    /// # Errors
    /// Returns an error if the process root cannot be listed
    pub fn socket_index(&self) -> Result<SocketIndex> {
        #[cfg(all(feature = "linux-procfs", target_os = "linux"))]
        {
            crate::process::walk_processes_procfs(&self.config.proc_root)
        }
        #[cfg(not(all(feature = "linux-procfs", target_os = "linux")))]
        {
            crate::process::walk_processes(&self.config.proc_root)
        }
    }
}

impl Backend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn connections(&self) -> Result<Vec<Connection>> {
        Ok(self.connections_in_state(Some(TcpState::Established)))
    }

    fn processes(&self) -> Result<Vec<ConnectionProcess>> {
        let index = self.socket_index()?;
        let connections = self.connections_in_state(Some(TcpState::Established));
        let total = connections.len();
        let attributed = attribute(connections, &index);
        debug!(
            "attributed {} of {total} connections under {}",
            attributed.len(),
            self.config.proc_root.display()
        );
        Ok(attributed)
    }
}
