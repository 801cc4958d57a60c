//! Parser for the kernel's `net/tcp` and `net/tcp6` connection tables.
//!
//! Each row looks like
//!
//! ```text
//!   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
//!    3: A12CF62E:E4D7 57FC1EC0:01BB 01 00000000:00000000 02:000006FA 00000000  1000        0 639474 ...
//! ```
//!
//! Addresses are hex dumps of 32-bit words stored in host (little-endian)
//! order, so every 4-byte block has to be flipped to get network order.
//! Ports and the state are plain hex numbers.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;

use log::{debug, trace};

use crate::pool::BufferPool;
use crate::types::{Connection, Protocol, TcpState};

/// Columns up to and including the inode.
const MIN_COLUMNS: usize = 10;

const COL_LOCAL: usize = 1;
const COL_REMOTE: usize = 2;
const COL_STATE: usize = 3;
const COL_UID: usize = 7;
const COL_INODE: usize = 9;

/// Lazy, single-pass iterator over the rows of a connection table
///
/// Borrows the raw table bytes, so it cannot outlive the buffer they live in.
/// Rows that do not parse are skipped.
#[derive(Debug)]
pub struct ProcNet<'a> {
    rest: &'a [u8],
    wanted: Option<TcpState>,
}

impl<'a> ProcNet<'a> {
    /// Iterate over established connections only
    #[must_use]
    pub fn new(table: &'a [u8]) -> Self {
        Self::with_state(table, Some(TcpState::Established))
    }

    /// Iterate over rows in every state, listen sockets included
    #[must_use]
    pub fn all(table: &'a [u8]) -> Self {
        Self::with_state(table, None)
    }

    /// Iterate over rows in `wanted` state, or every row for `None`
    #[must_use]
    pub fn with_state(table: &'a [u8], wanted: Option<TcpState>) -> Self {
        let (_header, rest) = split_line(table);
        Self { rest, wanted }
    }
}

impl Iterator for ProcNet<'_> {
    type Item = Connection;

    fn next(&mut self) -> Option<Connection> {
        while !self.rest.is_empty() {
            let (line, rest) = split_line(self.rest);
            self.rest = rest;

            match parse_row(line) {
                Some(conn) if self.wanted.map_or(true, |state| state == conn.state) => {
                    return Some(conn)
                }
                Some(_) => {}
                None => trace!(
                    "skipping connection table row: {:?}",
                    String::from_utf8_lossy(line)
                ),
            }
        }
        None
    }
}

fn split_line(buf: &[u8]) -> (&[u8], &[u8]) {
    match buf.iter().position(|&b| b == b'\n') {
        Some(pos) => (&buf[..pos], &buf[pos + 1..]),
        None => (buf, &[]),
    }
}

fn parse_row(line: &[u8]) -> Option<Connection> {
    let mut columns = [&[][..]; MIN_COLUMNS];
    let mut count = 0;
    for field in line
        .split(|b| b.is_ascii_whitespace())
        .filter(|f| !f.is_empty())
        .take(MIN_COLUMNS)
    {
        columns[count] = field;
        count += 1;
    }
    if count < MIN_COLUMNS {
        return None;
    }

    let (local_address, local_port) = parse_endpoint(columns[COL_LOCAL])?;
    let (remote_address, remote_port) = parse_endpoint(columns[COL_REMOTE])?;
    let state = u8::try_from(parse_hex(columns[COL_STATE])?).ok()?;

    Some(Connection {
        protocol: Protocol::Tcp,
        local_address,
        local_port,
        remote_address,
        remote_port,
        state: TcpState::from_code(state),
        uid: u32::try_from(parse_dec(columns[COL_UID])?).ok()?,
        inode: parse_dec(columns[COL_INODE])?,
    })
}

/// Parse `ADDRESS:PORT`, both hex encoded
fn parse_endpoint(field: &[u8]) -> Option<(IpAddr, u16)> {
    let colon = field.iter().position(|&b| b == b':')?;
    let address = decode_address(&field[..colon])?;
    let port = u16::try_from(parse_hex(&field[colon + 1..])?).ok()?;
    Some((address, port))
}

/// Decode a table address into its canonical form.
///
/// `hex` must be 8 (IPv4) or 32 (IPv6) hex digits. Each 4-byte block is
/// byte-reversed; reversing the whole buffer would scramble IPv6 addresses.
#[must_use]
pub fn decode_address(hex: &[u8]) -> Option<IpAddr> {
    match hex.len() {
        8 => {
            let mut bytes = [0u8; 4];
            decode_blocks(hex, &mut bytes)?;
            Some(IpAddr::V4(Ipv4Addr::from(bytes)))
        }
        32 => {
            let mut bytes = [0u8; 16];
            decode_blocks(hex, &mut bytes)?;
            Some(IpAddr::V6(Ipv6Addr::from(bytes)))
        }
        _ => None,
    }
}

fn decode_blocks(hex: &[u8], out: &mut [u8]) -> Option<()> {
    for (block, digits) in out.chunks_exact_mut(4).zip(hex.chunks_exact(8)) {
        for (i, pair) in digits.chunks_exact(2).enumerate() {
            block[3 - i] = (from_hex_digit(pair[0])? << 4) | from_hex_digit(pair[1])?;
        }
    }
    Some(())
}

/// Encode an address the way the kernel prints it in the connection tables.
#[must_use]
pub fn encode_address(address: &IpAddr) -> String {
    let bytes = match address {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    };
    let mut out = String::with_capacity(bytes.len() * 2);
    for block in bytes.chunks_exact(4) {
        for byte in block.iter().rev() {
            let _ = write!(out, "{byte:02X}");
        }
    }
    out
}

const fn from_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn parse_hex(field: &[u8]) -> Option<u64> {
    if field.is_empty() || field.len() > 16 {
        return None;
    }
    field
        .iter()
        .try_fold(0u64, |acc, &c| Some((acc << 4) | u64::from(from_hex_digit(c)?)))
}

fn parse_dec(field: &[u8]) -> Option<u64> {
    if field.is_empty() {
        return None;
    }
    field.iter().try_fold(0u64, |acc, &c| {
        if c.is_ascii_digit() {
            acc.checked_mul(10)?.checked_add(u64::from(c - b'0'))
        } else {
            None
        }
    })
}

/// Read the given connection tables and collect the rows in `wanted` state.
///
/// A table that cannot be read (an address family compiled out, say)
/// contributes no rows and is not an error.
pub fn read_tables<P: AsRef<Path>>(
    tables: &[P],
    wanted: Option<TcpState>,
    pool: &BufferPool,
) -> Vec<Connection> {
    let mut connections = Vec::new();
    let mut buf = pool.acquire();

    for table in tables {
        let table = table.as_ref();
        buf.clear();
        if let Err(e) = read_into(table, &mut buf) {
            debug!("skipping connection table {}: {e}", table.display());
            continue;
        }
        let before = connections.len();
        connections.extend(ProcNet::with_state(&buf, wanted));
        debug!(
            "read {} connections from {}",
            connections.len() - before,
            table.display()
        );
    }

    connections
}

fn read_into(path: &Path, buf: &mut Vec<u8>) -> io::Result<usize> {
    File::open(path)?.read_to_end(buf)
}
