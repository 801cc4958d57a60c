//! Print every established TCP connection on this host.
//!
//! Run with `RUST_LOG=debug` to see which strategy was picked.

use netowner::Spy;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let spy = Spy::detect();
    let connections = spy.connections()?;

    println!("{} established connections ({})", connections.len(), spy.backend_name());
    for conn in &connections {
        println!("  {conn}  uid={} inode={}", conn.uid, conn.inode);
    }
    Ok(())
}
