//! Print established TCP connections grouped by owning process.
//!
//! Only the caller's own processes are visible without root.

use std::collections::BTreeMap;

use netowner::{Connection, Spy};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let spy = Spy::detect();
    let mut by_pid: BTreeMap<(u32, String), Vec<Connection>> = BTreeMap::new();
    for owned in spy.processes()? {
        by_pid
            .entry((owned.process.pid, owned.process.name))
            .or_default()
            .push(owned.connection);
    }

    if by_pid.is_empty() {
        println!("No attributable connections (try running as root)");
    }
    for ((pid, name), connections) in &by_pid {
        println!("{pid:>7} {name}");
        for conn in connections {
            println!("        {conn}");
        }
    }
    Ok(())
}
