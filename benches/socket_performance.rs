//! Performance benchmarks for connection discovery

use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use netowner::{
    attribute, encode_address, parse_lsof, parse_netstat, BufferPool, Process, ProcNet,
    SocketIndex, Spy,
};

const HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode\n";

/// A connection table with `rows` entries, every fourth one listening
fn synthetic_table(rows: u32) -> String {
    let mut table = String::from(HEADER);
    for i in 0..rows {
        let local = IpAddr::V4(Ipv4Addr::from(0x0a00_0000 + i));
        let remote = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
        let state = if i % 4 == 0 { 0x0A } else { 0x01 };
        let _ = writeln!(
            table,
            "{i:4}: {}:{:04X} {}:01BB {state:02X} 00000000:00000000 00:00000000 00000000  1000        0 {} 1 ffff88007e75a740 20 4 30 10 -1",
            encode_address(&local),
            40000 + (i % 20000),
            encode_address(&remote),
            100_000 + u64::from(i),
        );
    }
    table
}

fn bench_table_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("proc_net_parsing");
    for rows in [100u32, 1_000, 10_000] {
        let table = synthetic_table(rows);
        group.bench_with_input(BenchmarkId::new("established", rows), &table, |b, table| {
            b.iter(|| black_box(ProcNet::new(table.as_bytes()).count()));
        });
        group.bench_with_input(BenchmarkId::new("all_states", rows), &table, |b, table| {
            b.iter(|| black_box(ProcNet::all(table.as_bytes()).count()));
        });
    }
    group.finish();
}

fn bench_join(c: &mut Criterion) {
    let table = synthetic_table(10_000);
    let connections: Vec<_> = ProcNet::new(table.as_bytes()).collect();
    let index: SocketIndex = connections
        .iter()
        .step_by(2)
        .map(|c| (c.inode, Process::new(c.inode as u32, "worker")))
        .collect();

    c.bench_function("attribute_10k", |b| {
        b.iter(|| black_box(attribute(connections.iter().copied(), &index)));
    });
}

fn bench_buffer_pool(c: &mut Criterion) {
    let pool = BufferPool::new();
    c.bench_function("buffer_pool_acquire", |b| {
        b.iter(|| {
            let mut buf = pool.acquire();
            buf.extend_from_slice(HEADER.as_bytes());
            black_box(buf.len())
        });
    });
}

fn bench_tool_parsing(c: &mut Criterion) {
    let mut netstat = String::new();
    let mut lsof = String::new();
    for i in 0..1_000u32 {
        let _ = writeln!(
            netstat,
            "tcp4       0      0  10.0.0.{}.{}     93.184.216.34.443     ESTABLISHED",
            i % 250,
            40000 + i
        );
        let _ = write!(
            lsof,
            "p{}\ncproc{i}\nf3\nPTCP\nn10.0.0.1:{}->93.184.216.34:443\n",
            i + 1,
            40000 + i
        );
    }

    c.bench_function("parse_netstat_1k", |b| {
        b.iter(|| black_box(parse_netstat(&netstat)));
    });
    c.bench_function("parse_lsof_1k", |b| {
        b.iter(|| black_box(parse_lsof(&lsof).expect("valid lsof output")));
    });
}

/// Full discovery on this host
fn bench_live_discovery(c: &mut Criterion) {
    let spy = Spy::detect();
    c.bench_function("live_connections", |b| {
        b.iter(|| black_box(spy.connections().map(|c| c.len()).unwrap_or_default()));
    });
    c.bench_function("live_processes", |b| {
        b.iter(|| black_box(spy.processes().map(|p| p.len()).unwrap_or_default()));
    });
}

criterion_group!(
    benches,
    bench_table_parsing,
    bench_join,
    bench_buffer_pool,
    bench_tool_parsing,
    bench_live_discovery
);
criterion_main!(benches);
