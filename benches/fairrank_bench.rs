//! Criterion benchmarks for u-fairrank.
//!
//! Uses synthetic random scores and interactions to measure matrix
//! construction, LP solve, and metric evaluation at a few problem sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use u_fairrank::data::InteractionData;
use u_fairrank::fairness::{FairnessMode, FairnessOptimizer, FairnessProblem, OptimizerConfig};
use u_fairrank::matrices::{
    BuilderConfig, ItemGroups, PrecomputedScores, RankingMatrices, RankingMatrixBuilder,
    UserGroups,
};
use u_fairrank::metrics::{MetricsConfig, MetricsEngine};

// ===========================================================================
// Synthetic instance
// ===========================================================================

struct Instance {
    model: PrecomputedScores,
    data: InteractionData,
    users: UserGroups,
    items: ItemGroups,
}

fn instance(total_users: usize, total_items: usize, seed: u64) -> Instance {
    let mut rng = StdRng::seed_from_u64(seed);

    let rows: Vec<Vec<f64>> = (0..total_users)
        .map(|_| (0..total_items).map(|_| rng.random_range(0.0..1.0)).collect())
        .collect();
    let model = PrecomputedScores::from_rows("random", rows).expect("rectangular scores");

    let mut train = Vec::new();
    let mut test = Vec::new();
    for user in 0..total_users {
        for _ in 0..rng.random_range(1..8) {
            train.push((user, rng.random_range(0..total_items)));
        }
        for _ in 0..rng.random_range(1..4) {
            test.push((user, rng.random_range(0..total_items)));
        }
    }
    let data = InteractionData::from_pairs(total_users, total_items, &train, &test)
        .expect("pairs in range");

    // 5% most active users vs the rest; 20% of items as short head
    let active = (total_users / 20).max(1);
    let users = UserGroups::from_members(
        total_users,
        &[(0..active).collect(), (active..total_users).collect()],
    )
    .expect("disjoint user groups");
    let head = total_items / 5;
    let items = ItemGroups::new(total_items, 0..head, head..total_items).expect("disjoint items");

    Instance {
        model,
        data,
        users,
        items,
    }
}

fn matrices(inst: &Instance, topk: usize) -> RankingMatrices {
    RankingMatrixBuilder::new(BuilderConfig::default().with_topk(topk))
        .build(&inst.model, &inst.data, &inst.items)
        .expect("matrices")
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_build_matrices(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_matrices");

    for &(users, items) in &[(100usize, 500usize), (1000, 2000)] {
        let inst = instance(users, items, 42);
        group.bench_with_input(
            BenchmarkId::new(format!("u{}_i{}", users, items), users),
            &inst,
            |b, inst| b.iter(|| black_box(matrices(black_box(inst), 50))),
        );
    }
    group.finish();
}

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("fairness_solve");
    group.sample_size(10);

    for &users in &[20usize, 50, 100] {
        let inst = instance(users, 200, 7);
        let built = matrices(&inst, 20);
        let optimizer = FairnessOptimizer::new(OptimizerConfig::default().with_k(10));
        let mode = FairnessMode::ConsumerProvider {
            user_epsilon: 0.01,
            item_epsilon: 0.01,
        };
        group.bench_with_input(BenchmarkId::from_parameter(users), &built, |b, built| {
            b.iter(|| {
                let problem = FairnessProblem::new(built, &inst.users, &inst.items, &inst.data)
                    .expect("consistent problem");
                black_box(optimizer.solve(black_box(&problem), mode))
            })
        });
    }
    group.finish();
}

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");

    let inst = instance(200, 500, 3);
    let built = matrices(&inst, 20);
    let problem =
        FairnessProblem::new(&built, &inst.users, &inst.items, &inst.data).expect("problem");
    let result = FairnessOptimizer::new(OptimizerConfig::default().with_k(10))
        .solve(&problem, FairnessMode::None)
        .expect("solve");
    let engine = MetricsEngine::new(MetricsConfig::default());

    group.bench_function("evaluate_groups", |b| {
        b.iter(|| {
            black_box(engine.evaluate_groups(
                &inst.users,
                black_box(&result.selection),
                &built.candidates,
                &inst.data,
            ))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_build_matrices, bench_solve, bench_metrics);
criterion_main!(benches);
