//! Parsing of `netstat -n` connection listings.
//!
//! BSD spells endpoints `10.0.1.6.58287`, Linux `10.0.1.6:58287`; both are
//! split on whichever separator comes last.

use std::net::IpAddr;

use log::trace;

use crate::types::{Connection, Protocol, TcpState};

/// Proto Recv-Q Send-Q Local Foreign State
const COLUMNS: usize = 6;

/// Established TCP connections from netstat output. Everything else,
/// headers included, is skipped.
#[must_use]
pub fn parse_netstat(out: &str) -> Vec<Connection> {
    out.lines()
        .filter_map(|line| {
            let conn = parse_line(line);
            if conn.is_none() {
                trace!("skipping netstat line: {line:?}");
            }
            conn
        })
        .collect()
}

fn parse_line(line: &str) -> Option<Connection> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < COLUMNS || fields[5] != "ESTABLISHED" {
        return None;
    }
    if !fields[0].starts_with("tcp") {
        return None;
    }

    let (local_address, local_port) = split_endpoint(fields[3])?;
    let (remote_address, remote_port) = split_endpoint(fields[4])?;

    Some(Connection {
        protocol: Protocol::Tcp,
        local_address,
        local_port,
        remote_address,
        remote_port,
        state: TcpState::Established,
        uid: 0,
        inode: 0,
    })
}

/// Split `ADDRESS<sep>PORT` on the last `.` or `:`
pub(crate) fn split_endpoint(endpoint: &str) -> Option<(IpAddr, u16)> {
    let sep = endpoint.rfind(&['.', ':'][..])?;
    let port = endpoint[sep + 1..].parse().ok()?;
    Some((parse_host(&endpoint[..sep])?, port))
}

/// Parse a host, dropping brackets and any `%scope` suffix
pub(crate) fn parse_host(host: &str) -> Option<IpAddr> {
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    let host = host.split_once('%').map_or(host, |(addr, _scope)| addr);
    host.parse().ok()
}
