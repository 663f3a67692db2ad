//! Criterion benchmarks for u-blend.
//!
//! Uses synthetic gradation curves to measure model building and the
//! full build → solve → interpret pipeline on the MILP backend.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use u_blend::blend::{BlendConfig, BlendProblem, BlendRunner, Material, TargetProfile};
use u_blend::cp::MilpSolver;

// ===========================================================================
// Synthetic gradations: pass fractions decreasing from coarse to fine sieves
// ===========================================================================

fn random_curve<R: Rng>(rng: &mut R, sieves: usize) -> Vec<f64> {
    let mut pass = 1.0f64;
    (0..sieves)
        .map(|_| {
            pass *= rng.random_range(0.4..0.95);
            (pass * 100.0).round() / 100.0
        })
        .collect()
}

fn random_problem(materials: usize, sieves: usize) -> BlendProblem {
    let mut rng = StdRng::seed_from_u64(42);
    let materials = (0..materials)
        .map(|i| {
            Material::new(
                format!("M{i}"),
                format!("Material {i}"),
                random_curve(&mut rng, sieves),
            )
        })
        .collect();
    let target = TargetProfile::new(random_curve(&mut rng, sieves));
    match BlendProblem::new(materials, target) {
        Ok(problem) => problem,
        Err(e) => panic!("synthetic problem rejected: {e}"),
    }
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("blend_build");

    for &(m, s) in &[(3, 6), (6, 12), (12, 24)] {
        let problem = random_problem(m, s);
        let config = BlendConfig::default();
        group.bench_with_input(
            BenchmarkId::new(format!("m{}_s{}", m, s), m),
            &(problem, config),
            |b, (p, c)| {
                b.iter(|| {
                    let model = BlendRunner::build(black_box(p), black_box(c));
                    black_box(model)
                })
            },
        );
    }
    group.finish();
}

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("blend_solve");
    group.sample_size(10);

    let solver = MilpSolver::new();
    for &(m, s) in &[(2, 4), (3, 6), (4, 8)] {
        let problem = random_problem(m, s);
        let config = BlendConfig::coarse();
        group.bench_with_input(
            BenchmarkId::new(format!("m{}_s{}", m, s), m),
            &(problem, config),
            |b, (p, c)| {
                b.iter(|| {
                    let outcome = BlendRunner::run(black_box(p), black_box(c), &solver);
                    black_box(outcome)
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_solve);
criterion_main!(benches);
