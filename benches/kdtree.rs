use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use kdtree_index::kdtree::{ArrayAccessor, KdTree, KdTreeBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn generate_points(n: usize) -> Vec<[f64; 3]> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|_| {
            [
                rng.gen_range(-180.0..180.0),
                rng.gen_range(-90.0..90.0),
                rng.gen_range(0.0..1000.0),
            ]
        })
        .collect()
}

fn construct_incremental(points: &[[f64; 3]]) -> KdTree<[f64; 3], ArrayAccessor, 3> {
    let mut tree = KdTree::<[f64; 3], _, 3>::new(ArrayAccessor);
    for point in points {
        tree.insert(*point);
    }
    tree
}

fn construct_bulk(points: &[[f64; 3]]) -> KdTree<[f64; 3], ArrayAccessor, 3> {
    let mut builder =
        KdTreeBuilder::<[f64; 3], _, 3>::new(ArrayAccessor).with_capacity(points.len());
    builder.extend(points.iter().copied());
    builder.finish()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let sizes = vec![1_000, 100_000];

    for size in sizes {
        let points = generate_points(size);

        let mut group = c.benchmark_group("construction");
        group.bench_with_input(BenchmarkId::new("insert", size), &points, |b, points| {
            b.iter(|| construct_incremental(points))
        });
        group.bench_with_input(BenchmarkId::new("builder", size), &points, |b, points| {
            b.iter(|| construct_bulk(points))
        });
        group.bench_with_input(BenchmarkId::new("optimise", size), &points, |b, points| {
            b.iter_batched(
                || construct_incremental(points),
                |mut tree| {
                    tree.optimise();
                    tree
                },
                criterion::BatchSize::LargeInput,
            )
        });
        group.finish();

        let incremental = construct_incremental(&points);
        let balanced = construct_bulk(&points);
        let queries = generate_points(100);

        let mut group = c.benchmark_group("find_nearest");
        group.bench_with_input(BenchmarkId::new("insert", size), &queries, |b, queries| {
            b.iter(|| {
                for query in queries {
                    incremental.find_nearest(query, f64::INFINITY);
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("builder", size), &queries, |b, queries| {
            b.iter(|| {
                for query in queries {
                    balanced.find_nearest(query, f64::INFINITY);
                }
            })
        });
        group.finish();

        let mut group = c.benchmark_group("count_within_range");
        group.bench_with_input(BenchmarkId::new("builder", size), &queries, |b, queries| {
            b.iter(|| {
                queries
                    .iter()
                    .map(|query| balanced.count_within_range(query, 25.0))
                    .sum::<usize>()
            })
        });
        group.finish();
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
