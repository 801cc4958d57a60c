//! Parsing of `lsof -F` field output.
//!
//! Every line starts with a one-character tag. A `p` line opens a new
//! process and the lines after it describe that process and its files until
//! the next `p`:
//!
//! ```text
//! p13100
//! cmpd
//! PTCP
//! n[::1]:6600
//! PTCP
//! n[::1]:6600->[::1]:50992
//! ```
//!
//! Unknown tags are an error: they mean the tool was asked for, or emitted,
//! fields in an order these parsers do not expect.

use log::trace;

use super::netstat::split_endpoint;
use crate::error::{Error, Result};
use crate::types::{Connection, ConnectionProcess, Process, Protocol, SocketIndex, TcpState};

/// Field selection for address mode; [`parse_lsof`] depends on it.
pub const LSOF_FIELDS: &str = "cPn";

/// Field selection for inode mode; [`parse_lsof_inodes`] depends on it.
pub const LSOF_INODE_FIELDS: &str = "cPi";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Pid,
    Command,
    Uid,
    Fd,
    Protocol,
    Name,
    Inode,
}

impl Field {
    const fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'p' => Some(Self::Pid),
            'c' => Some(Self::Command),
            'u' => Some(Self::Uid),
            'f' => Some(Self::Fd),
            'P' => Some(Self::Protocol),
            'n' => Some(Self::Name),
            'i' => Some(Self::Inode),
            _ => None,
        }
    }
}

/// Split output into `(field, value)` pairs, rejecting unknown tags
fn fields(out: &str) -> impl Iterator<Item = Result<(Field, &str)>> {
    out.lines()
        .map(str::trim_start)
        .filter(|line| line.len() > 1)
        .map(|line| {
            let mut chars = line.chars();
            let tag = chars.next().unwrap_or_default();
            let value = chars.as_str();
            Field::from_tag(tag)
                .map(|field| (field, value))
                .ok_or_else(|| Error::unexpected_field(tag, value))
        })
}

/// The process the following lines belong to
#[derive(Debug, Default)]
struct Current {
    pid: Option<u32>,
    name: String,
    uid: u32,
    protocol: Option<Protocol>,
}

impl Current {
    fn start(&mut self, value: &str) -> Result<()> {
        let pid = value
            .parse()
            .map_err(|_| Error::invalid_format("lsof 'p' field", value))?;
        *self = Self {
            pid: Some(pid),
            ..Self::default()
        };
        Ok(())
    }

    fn process(&self) -> Option<Process> {
        self.pid
            .filter(|&pid| pid > 0)
            .map(|pid| Process::new(pid, self.name.clone()))
    }
}

/// Connections with their processes from `lsof -F cPn` output.
///
/// `n` lines without `->` are listening sockets and are skipped, as are
/// entries of any protocol but TCP. A record is produced only once a
/// process is current and both endpoints parsed. The state is taken to be
/// established; `lsof` is asked to filter on it.
///
/// # Errors
/// Returns an error on an unknown field tag or an unparseable pid or
/// endpoint
pub fn parse_lsof(out: &str) -> Result<Vec<ConnectionProcess>> {
    let mut records = Vec::new();
    let mut current = Current::default();

    for field in fields(out) {
        let (field, value) = field?;
        match field {
            Field::Pid => current.start(value)?,
            Field::Command => current.name = value.to_string(),
            Field::Uid => current.uid = value.parse().unwrap_or_default(),
            Field::Protocol => current.protocol = value.parse().ok(),
            Field::Fd | Field::Inode => {}
            Field::Name => {
                let Some((local, remote)) = value.split_once("->") else {
                    trace!("skipping listen entry {value:?}");
                    continue;
                };
                let (local_address, local_port) = split_endpoint(local)
                    .ok_or_else(|| Error::invalid_format("lsof local address", local))?;
                let (remote_address, remote_port) = split_endpoint(remote)
                    .ok_or_else(|| Error::invalid_format("lsof remote address", remote))?;

                let Some(process) = current.process() else {
                    trace!("no current process for {value:?}");
                    continue;
                };
                if current.protocol != Some(Protocol::Tcp) {
                    trace!("skipping non-TCP entry {value:?}");
                    continue;
                }
                records.push(ConnectionProcess {
                    connection: Connection {
                        protocol: Protocol::Tcp,
                        local_address,
                        local_port,
                        remote_address,
                        remote_port,
                        state: TcpState::Established,
                        uid: current.uid,
                        inode: 0,
                    },
                    process,
                });
            }
        }
    }

    Ok(records)
}

/// Socket identifier to process index from `lsof -F cPi` output.
///
/// # Errors
/// Returns an error on an unknown field tag or an unparseable pid or inode
pub fn parse_lsof_inodes(out: &str) -> Result<SocketIndex> {
    let mut index = SocketIndex::new();
    let mut current = Current::default();

    for field in fields(out) {
        let (field, value) = field?;
        match field {
            Field::Pid => current.start(value)?,
            Field::Command => current.name = value.to_string(),
            Field::Inode => {
                let inode = value
                    .parse()
                    .map_err(|_| Error::invalid_format("lsof 'i' field", value))?;
                if let Some(process) = current.process() {
                    index.insert(inode, process);
                }
            }
            Field::Uid | Field::Fd | Field::Protocol | Field::Name => {}
        }
    }

    Ok(index)
}
