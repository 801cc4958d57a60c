use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Transport protocol of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(rename_all = "lowercase"))]
pub enum Protocol {
    /// Transmission Control Protocol
    Tcp,
    /// User Datagram Protocol
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("tcp") {
            Ok(Self::Tcp)
        } else if s.eq_ignore_ascii_case("udp") {
            Ok(Self::Udp)
        } else {
            Err(format!("unknown protocol: {s}"))
        }
    }
}

/// TCP connection state, numbered as in the kernel's state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum TcpState {
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    NewSynRecv,
    /// A code this crate does not know about
    Unknown(u8),
}

impl TcpState {
    /// Map a kernel state code to a state
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x01 => Self::Established,
            0x02 => Self::SynSent,
            0x03 => Self::SynRecv,
            0x04 => Self::FinWait1,
            0x05 => Self::FinWait2,
            0x06 => Self::TimeWait,
            0x07 => Self::Close,
            0x08 => Self::CloseWait,
            0x09 => Self::LastAck,
            0x0A => Self::Listen,
            0x0B => Self::Closing,
            0x0C => Self::NewSynRecv,
            other => Self::Unknown(other),
        }
    }

    /// The kernel state code
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Established => 0x01,
            Self::SynSent => 0x02,
            Self::SynRecv => 0x03,
            Self::FinWait1 => 0x04,
            Self::FinWait2 => 0x05,
            Self::TimeWait => 0x06,
            Self::Close => 0x07,
            Self::CloseWait => 0x08,
            Self::LastAck => 0x09,
            Self::Listen => 0x0A,
            Self::Closing => 0x0B,
            Self::NewSynRecv => 0x0C,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Established => write!(f, "ESTABLISHED"),
            Self::SynSent => write!(f, "SYN_SENT"),
            Self::SynRecv => write!(f, "SYN_RECV"),
            Self::FinWait1 => write!(f, "FIN_WAIT1"),
            Self::FinWait2 => write!(f, "FIN_WAIT2"),
            Self::TimeWait => write!(f, "TIME_WAIT"),
            Self::Close => write!(f, "CLOSE"),
            Self::CloseWait => write!(f, "CLOSE_WAIT"),
            Self::LastAck => write!(f, "LAST_ACK"),
            Self::Listen => write!(f, "LISTEN"),
            Self::Closing => write!(f, "CLOSING"),
            Self::NewSynRecv => write!(f, "NEW_SYN_RECV"),
            Self::Unknown(code) => write!(f, "UNKNOWN({code:#04x})"),
        }
    }
}

/// A single transport connection as seen in one query pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct Connection {
    pub protocol: Protocol,
    pub local_address: IpAddr,
    pub local_port: u16,
    pub remote_address: IpAddr,
    pub remote_port: u16,
    pub state: TcpState,
    /// Owner of the socket; zero when the source does not report it
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub uid: u32,
    /// Kernel socket identifier. Only meaningful for joining within the same
    /// query pass: the kernel reuses identifiers once sockets close.
    #[cfg_attr(feature = "serde-support", serde(default))]
    pub inode: u64,
}

impl Connection {
    /// Local endpoint as a socket address
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        SocketAddr::new(self.local_address, self.local_port)
    }

    /// Remote endpoint as a socket address
    #[must_use]
    pub const fn remote_addr(&self) -> SocketAddr {
        SocketAddr::new(self.remote_address, self.remote_port)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} {}",
            self.protocol,
            self.local_addr(),
            self.remote_addr(),
            self.state
        )
    }
}

/// The process owning a socket
///
/// Pids are recycled by the OS, so a `Process` is only a statement about the
/// query pass that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct Process {
    pub pid: u32,
    /// Short executable name, empty when it could not be read
    pub name: String,
}

impl Process {
    #[must_use]
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }
}

/// A connection paired with its owning process
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct ConnectionProcess {
    pub connection: Connection,
    pub process: Process,
}

impl fmt::Display for ConnectionProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (pid {} {})",
            self.connection, self.process.pid, self.process.name
        )
    }
}

/// Socket identifier to owning process, rebuilt for every query
pub type SocketIndex = HashMap<u64, Process>;
