//! Performance benchmarks for relaxation and export.
//!
//! Run with: `cargo bench --bench relaxation`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Single iteration, 256 nodes | <5ms | Pairwise repulsion dominates |
//! | Cached export | <10μs | LRU cache hit |
//! | Scan step (observe + place) | <50μs | Anchor search on placed neighbors |

use criterion::{
    black_box, criterion_group, criterion_main,
    BenchmarkId, Criterion, Throughput,
};

use lumen_atlas::atlas::relax_input;
use lumen_atlas::{
    Atlas, CancellationToken, Dimensions, EdgeSet, NodeId, NodeMetadata, SessionId, SharedAtlas,
    Vec2,
};

/// Square panel of `side × side` nodes, wired as a serpentine strip and
/// observed on a 10-unit camera grid.
fn build_panel(side: usize) -> (Atlas, Vec<NodeId>) {
    let mut atlas = Atlas::default();
    let session = SessionId::new("session_bench");
    let ids: Vec<NodeId> = (0..side * side)
        .map(|_| atlas.create_node(NodeMetadata::new()))
        .collect();
    for w in ids.windows(2) {
        atlas
            .upsert_edge(EdgeSet::Strip, w[0], w[1], 1.0)
            .expect("strip edge");
    }
    for (i, &id) in ids.iter().enumerate() {
        let (row, col) = (i / side, i % side);
        let col = if row % 2 == 0 { col } else { side - 1 - col };
        atlas
            .observe_and_place(
                id,
                Vec2::new(col as f64 * 10.0, row as f64 * 10.0),
                Some(session.clone()),
            )
            .expect("observe");
    }
    (atlas, ids)
}

/// Benchmark one relaxation iteration at increasing node counts.
fn bench_single_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_iteration");

    for side in [4, 8, 16] {
        let (atlas, ids) = build_panel(side);
        let input = atlas.prepare_relaxation();
        let policy = atlas.policy().clone().with_max_iterations(1);
        let cancel = CancellationToken::new();

        group.throughput(Throughput::Elements(ids.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("nodes", ids.len()),
            &input,
            |b, input| {
                b.iter(|| relax_input(black_box(input), &policy, &cancel).expect("relax"))
            },
        );
    }

    group.finish();
}

/// Benchmark a full relaxation run to convergence.
fn bench_full_relaxation(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_relaxation");
    group.sample_size(20);

    for side in [4, 8] {
        let (atlas, ids) = build_panel(side);
        group.bench_with_input(
            BenchmarkId::new("nodes", ids.len()),
            &atlas,
            |b, atlas| {
                b.iter(|| {
                    let mut atlas = atlas.clone();
                    atlas.relax(&CancellationToken::new()).expect("relax")
                })
            },
        );
    }

    group.finish();
}

/// Benchmark export, uncached and through the shared cache.
fn bench_export(c: &mut Criterion) {
    let (mut atlas, _) = build_panel(8);
    atlas.relax(&CancellationToken::new()).expect("relax");

    c.bench_function("export_3d_uncached", |b| {
        b.iter(|| atlas.export(black_box(Dimensions::Three)))
    });

    let shared = SharedAtlas::from(atlas);
    shared.export(Dimensions::Three);
    c.bench_function("export_3d_cached", |b| {
        b.iter(|| shared.export(black_box(Dimensions::Three)))
    });
}

/// Benchmark the per-node cost of a scan step.
fn bench_scan_step(c: &mut Criterion) {
    let (atlas, ids) = build_panel(8);
    let tail = *ids.last().expect("non-empty panel");

    c.bench_function("observe_and_place", |b| {
        b.iter(|| {
            let mut atlas = atlas.clone();
            let node = atlas.create_node(NodeMetadata::new());
            atlas
                .upsert_edge(EdgeSet::Strip, tail, node, 1.0)
                .expect("strip edge");
            atlas
                .observe_and_place(node, black_box(Vec2::new(-10.0, 70.0)), None)
                .expect("observe")
        })
    });
}

criterion_group!(
    benches,
    bench_single_iteration,
    bench_full_relaxation,
    bench_export,
    bench_scan_step,
);
criterion_main!(benches);
