use criterion::{Criterion, criterion_group, criterion_main};
use maskmatch::board::Board;
use maskmatch::{Problem, ReturnKind, SolverConfig, solve};

fn bench_count(c: &mut Criterion) {
    let board = Board::new(6, 6);
    let problem = Problem::from_groups(board.mask_groups(&[3, 2, 2]));

    c.bench_function("count_6x6_322_parallel", |b| {
        b.iter(|| solve(&problem, &SolverConfig::default()).unwrap().count)
    });

    let sequential = SolverConfig { parallel: false, ..SolverConfig::default() };
    c.bench_function("count_6x6_322_sequential", |b| {
        b.iter(|| solve(&problem, &sequential).unwrap().count)
    });

    let uncollapsed = SolverConfig { symmetry: false, ..SolverConfig::default() };
    c.bench_function("count_6x6_322_no_collapse", |b| {
        b.iter(|| solve(&problem, &uncollapsed).unwrap().count)
    });
}

fn bench_enumerate(c: &mut Criterion) {
    let board = Board::new(5, 5);
    let problem = Problem::from_groups(board.mask_groups(&[3, 2]));

    let masks = SolverConfig { return_kind: ReturnKind::CombinedMasks, ..SolverConfig::default() };
    c.bench_function("enumerate_masks_5x5_32", |b| {
        b.iter(|| solve(&problem, &masks).unwrap().combined_masks.unwrap().len())
    });

    let indices = SolverConfig { return_kind: ReturnKind::Indices, ..SolverConfig::default() };
    c.bench_function("enumerate_indices_5x5_32", |b| {
        b.iter(|| solve(&problem, &indices).unwrap().indices.unwrap().len())
    });
}

criterion_group!(benches, bench_count, bench_enumerate);
criterion_main!(benches);
