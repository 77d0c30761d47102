//! Criterion benchmarks for layout geometry queries.
//!
//! # Purpose
//!
//! `adjacency_for` and `transition_target_at_edge` run on every mouse move
//! near a screen edge while a client is active, so their cost sets a floor
//! on how fine-grained the edge-check polling can be. This file measures
//! both against a handful of cluster sizes, from a single server+client
//! pair up to a 6-screen grid.
//!
//! # How to run
//!
//! ```bash
//! cargo bench --package konflikt-core --bench geometry_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use konflikt_core::domain::geometry::Side;
use konflikt_core::domain::layout::LayoutManager;

/// Builds a manager with `width` is always server-a row: 1920x1080, with
/// `count` clients laid out left to right, each registered via the same
/// auto-arrange path the Server Endpoint uses for `client_registration`.
fn manager_with_clients(count: usize) -> LayoutManager {
    let mut manager = LayoutManager::new();
    manager.set_server_screen("srv".to_string(), "Server".to_string(), "m0".to_string(), 1920, 1080);
    for i in 0..count {
        manager.register_client(
            format!("cli-{i}"),
            format!("Client {i}"),
            format!("m{}", i + 1),
            1920,
            1080,
        );
    }
    manager
}

/// Benchmarks `adjacency_for` at cluster sizes of 1, 3, and 6 clients.
///
/// Cost is expected to grow linearly with cluster size since every call
/// scans the full screen list once.
fn bench_adjacency_for(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjacency_for");
    for count in [1usize, 3, 6] {
        let manager = manager_with_clients(count);
        group.bench_with_input(BenchmarkId::new("clients", count), &manager, |b, manager| {
            b.iter(|| black_box(manager.adjacency_for(black_box("srv"))))
        });
    }
    group.finish();
}

/// Benchmarks `transition_target_at_edge` for a cursor crossing from the
/// server screen onto its right-hand neighbor, at the same cluster sizes.
fn bench_transition_target_at_edge(c: &mut Criterion) {
    let mut group = c.benchmark_group("transition_target_at_edge");
    for count in [1usize, 3, 6] {
        let manager = manager_with_clients(count);
        group.bench_with_input(BenchmarkId::new("clients", count), &manager, |b, manager| {
            b.iter(|| {
                black_box(manager.transition_target_at_edge(
                    black_box("srv"),
                    black_box(Side::Right),
                    black_box(1919),
                    black_box(540),
                ))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_adjacency_for, bench_transition_target_at_edge);
criterion_main!(benches);
