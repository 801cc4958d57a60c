//! Fallback discovery through `netstat` and `lsof`, for hosts without an
//! introspection filesystem.

mod lsof;
mod netstat;

use std::process::Command;

use log::debug;

pub use lsof::{parse_lsof, parse_lsof_inodes, LSOF_FIELDS, LSOF_INODE_FIELDS};
pub use netstat::parse_netstat;

use crate::backend::Backend;
use crate::config::SpyConfig;
use crate::error::{Error, Result};
use crate::types::{Connection, ConnectionProcess, SocketIndex};

/// Runs an external command to completion and returns its standard output
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// # Errors
    /// Returns an error if the command cannot be started or exits unsuccessfully
    fn run(&self, program: &str, args: &[String]) -> Result<String>;
}

/// Runs commands with [`std::process::Command`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String> {
        debug!("running {program} {}", args.join(" "));
        let output = Command::new(program).args(args).output()?;
        if !output.status.success() {
            return Err(Error::tool_failed(
                program,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// `netstat` flags: numeric, wide, TCP only
fn netstat_args() -> Vec<String> {
    #[cfg(target_os = "linux")]
    let args = ["-n", "-W", "-t"];
    #[cfg(not(target_os = "linux"))]
    let args = ["-n", "-W", "-p", "tcp"];
    args.iter().map(ToString::to_string).collect()
}

/// `lsof` flags: established TCP files only, numeric hosts and ports, no
/// warnings, field output with the given selection
fn lsof_args(fields: &str) -> Vec<String> {
    ["-iTCP", "-sTCP:ESTABLISHED", "-n", "-P", "-w", "-F", fields]
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Discovery by running `netstat` and `lsof`
#[derive(Debug, Clone)]
pub struct ExternalBackend<R = SystemRunner> {
    runner: R,
    netstat: String,
    lsof: String,
}

impl ExternalBackend<SystemRunner> {
    #[must_use]
    pub fn new(config: &SpyConfig) -> Self {
        Self::with_runner(config, SystemRunner)
    }
}

impl<R: CommandRunner> ExternalBackend<R> {
    /// Use `runner` in place of spawning real processes
    #[must_use]
    pub fn with_runner(config: &SpyConfig, runner: R) -> Self {
        Self {
            runner,
            netstat: config.netstat_binary.clone(),
            lsof: config.lsof_binary.clone(),
        }
    }

    /// Socket identifier to process index from `lsof`'s inode mode.
    ///
    /// Not used by [`Backend::processes`]; join it with connections from
    /// another source through [`crate::attribute`].
    ///
    /// # Errors
    /// Returns an error if `lsof` fails or its output cannot be parsed
    pub fn socket_index(&self) -> Result<SocketIndex> {
        let out = self.runner.run(&self.lsof, &lsof_args(LSOF_INODE_FIELDS))?;
        parse_lsof_inodes(&out)
    }
}

impl<R: CommandRunner> Backend for ExternalBackend<R> {
    fn name(&self) -> &'static str {
        "external"
    }

    fn connections(&self) -> Result<Vec<Connection>> {
        let out = self.runner.run(&self.netstat, &netstat_args())?;
        let connections = parse_netstat(&out);
        debug!("{} established connections from {}", connections.len(), self.netstat);
        Ok(connections)
    }

    fn processes(&self) -> Result<Vec<ConnectionProcess>> {
        let out = self.runner.run(&self.lsof, &lsof_args(LSOF_FIELDS))?;
        let records = parse_lsof(&out)?;
        debug!("{} attributed connections from {}", records.len(), self.lsof);
        Ok(records)
    }
}
