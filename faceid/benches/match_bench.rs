use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use visage_facedb::KnownEncoding;
use visage_faceid::{Matcher, Snapshot, euclidean};

fn pseudo_vec(dim: usize, seed: u64) -> Vec<f32> {
    let mut v = Vec::with_capacity(dim);
    let mut state = seed;
    for _ in 0..dim {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        v.push(((state >> 33) as f32) / (u32::MAX as f32) - 0.25);
    }
    v
}

fn snapshot(dim: usize, n: usize) -> Snapshot {
    let entries = (0..n)
        .map(|i| KnownEncoding {
            identity_id: i as u64 + 1,
            encoding_id: i as u64 + 1,
            name: format!("person-{i}"),
            vector: pseudo_vec(dim, i as u64 * 7919 + 1),
        })
        .collect();
    Snapshot::new(dim, entries)
}

fn bench_best_match(c: &mut Criterion) {
    let dim = 128;
    let matcher = Matcher::default();
    let query = pseudo_vec(dim, 424242);

    let mut group = c.benchmark_group("best_match_128d");
    for n in [100usize, 1_000, 10_000] {
        let snap = snapshot(dim, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &snap, |b, snap| {
            b.iter(|| black_box(matcher.best_match(snap, Some(black_box(&query)))));
        });
    }
    group.finish();
}

fn bench_euclidean(c: &mut Criterion) {
    let a = pseudo_vec(128, 1);
    let b = pseudo_vec(128, 2);
    c.bench_function("euclidean_128d", |bench| {
        bench.iter(|| black_box(euclidean(black_box(&a), black_box(&b))));
    });
}

criterion_group!(benches, bench_best_match, bench_euclidean);
criterion_main!(benches);
