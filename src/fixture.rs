//! Fixed responses for reproducible tests of code built on [`crate::Spy`].

#[cfg(feature = "serde-support")]
use std::path::Path;

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::Result;
use crate::join::attribute;
use crate::types::{Connection, ConnectionProcess, SocketIndex};

/// Answers every query with the same connections and owners
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureBackend {
    connections: Vec<Connection>,
    index: SocketIndex,
}

impl FixtureBackend {
    /// `index` maps the connections' inodes to their owners; connections
    /// missing from it are left out of [`Backend::processes`].
    #[must_use]
    pub fn new(connections: Vec<Connection>, index: SocketIndex) -> Self {
        Self { connections, index }
    }

    /// Load connections and owners from a JSON file:
    ///
    /// ```json
    /// {
    ///   "connections": [{ "protocol": "tcp", "local_address": "10.0.0.1", ... , "inode": 7 }],
    ///   "processes": [{ "inode": 7, "pid": 42, "name": "nginx" }]
    /// }
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid fixture JSON
    #[cfg(feature = "serde-support")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Parse fixture JSON, see [`FixtureBackend::from_json_file`]
    ///
    /// # Errors
    /// Returns an error if `raw` is not valid fixture JSON
    #[cfg(feature = "serde-support")]
    pub fn from_json(raw: &str) -> Result<Self> {
        let file: FixtureFile =
            serde_json::from_str(raw).map_err(|e| crate::Error::fixture(e.to_string()))?;
        let index = file
            .processes
            .into_iter()
            .map(|p| (p.inode, crate::Process::new(p.pid, p.name)))
            .collect();
        Ok(Self::new(file.connections, index))
    }
}

impl Backend for FixtureBackend {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn connections(&self) -> Result<Vec<Connection>> {
        Ok(self.connections.clone())
    }

    fn processes(&self) -> Result<Vec<ConnectionProcess>> {
        Ok(attribute(self.connections.iter().copied(), &self.index))
    }
}

#[cfg(feature = "serde-support")]
#[derive(Debug, Serialize, Deserialize)]
struct FixtureFile {
    connections: Vec<Connection>,
    #[serde(default)]
    processes: Vec<FixtureProcess>,
}

#[cfg(feature = "serde-support")]
#[derive(Debug, Serialize, Deserialize)]
struct FixtureProcess {
    inode: u64,
    pid: u32,
    #[serde(default)]
    name: String,
}
