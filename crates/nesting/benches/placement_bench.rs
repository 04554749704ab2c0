//! Benchmarks for the placement engine and fitness evaluation.
//!
//! Measures buffering, greedy placement at a few scales and layout scoring.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lamina_nesting::geometry::{buffer, polygon_from_coords};
use lamina_nesting::{build_templates, evaluate_fitness, Lamina, PieceSpec, PlacementContext};

fn mixed_pieces(n: usize) -> Vec<PieceSpec> {
    (0..n)
        .map(|i| {
            let w = 10.0 + (i as f64 * 3.0) % 20.0;
            let h = 8.0 + (i as f64 * 7.0) % 15.0;
            if i % 3 == 0 {
                PieceSpec::new(&[(0.0, 0.0), (w, 0.0), (w / 2.0, h)], 1)
            } else {
                PieceSpec::new(&[(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)], 1)
            }
        })
        .collect()
}

fn bench_place_greedily(c: &mut Criterion) {
    let mut group = c.benchmark_group("place_greedily");
    group.sample_size(10);

    let lamina = Lamina::rectangle(200.0, 200.0).unwrap();
    for &n in &[5, 10, 20] {
        let templates = build_templates(&mixed_pieces(n));
        group.bench_with_input(BenchmarkId::new("buffer_2", n), &templates, |b, t| {
            b.iter(|| {
                let mut ctx = PlacementContext::new(&lamina, 2.0);
                ctx.place_greedily(black_box(t).iter());
                black_box(ctx.into_pieces())
            })
        });
    }
    group.finish();
}

fn bench_buffer(c: &mut Criterion) {
    let l_shape = polygon_from_coords(&[
        (0.0, 0.0),
        (30.0, 0.0),
        (30.0, 10.0),
        (10.0, 10.0),
        (10.0, 30.0),
        (0.0, 30.0),
    ]);
    c.bench_function("buffer_l_shape", |b| {
        b.iter(|| buffer(black_box(&l_shape), black_box(2.0)))
    });
}

fn bench_fitness(c: &mut Criterion) {
    let lamina = Lamina::rectangle(200.0, 200.0).unwrap();
    let templates = build_templates(&mixed_pieces(20));
    let mut ctx = PlacementContext::new(&lamina, 1.0);
    ctx.place_greedily(templates.iter());
    let layout = ctx.into_pieces();

    c.bench_function("evaluate_fitness_20", |b| {
        b.iter(|| evaluate_fitness(black_box(&layout), lamina.area(), 1.0, templates.len()))
    });
}

criterion_group!(benches, bench_place_greedily, bench_buffer, bench_fitness);
criterion_main!(benches);
