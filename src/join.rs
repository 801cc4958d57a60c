use log::trace;

use crate::types::{Connection, ConnectionProcess, SocketIndex};

/// Pair each connection with the process owning its socket.
///
/// Connections whose inode is not in `index` are dropped; they closed or
/// were opened between the two scans. Input order is preserved.
pub fn attribute<I>(connections: I, index: &SocketIndex) -> Vec<ConnectionProcess>
where
    I: IntoIterator<Item = Connection>,
{
    connections
        .into_iter()
        .filter_map(|connection| match index.get(&connection.inode) {
            Some(process) => Some(ConnectionProcess {
                connection,
                process: process.clone(),
            }),
            None => {
                trace!("no owner for inode {} ({connection})", connection.inode);
                None
            }
        })
        .collect()
}
