use approx::assert_abs_diff_eq;
use std::collections::{HashMap, HashSet};
use u_fairrank::data::{IdMap, InteractionData};
use u_fairrank::fairness::{
    FairnessMode, FairnessOptimizer, FairnessProblem, FormulationConfig, GapSign, OptimizerConfig,
};
use u_fairrank::matrices::{
    BuilderConfig, ItemGroups, PrecomputedScores, RankingMatrices, RankingMatrixBuilder,
    UserGroups,
};
use u_fairrank::metrics::{
    catalog_coverage, ndcgk, novelty, round_to, MetricsConfig, MetricsEngine,
};
use u_fairrank::sweep::{ErrorPolicy, SweepConfig, SweepContext, SweepRunner};
use u_fairrank::FairRankError;

/// Three users, six items, five candidates each, lists of two.
///
/// Users 0 and 1 are active and their two best candidates are training
/// hits; user 2 is inactive and has no hit among its candidates.
struct ThreeUsers {
    data: InteractionData,
    users: UserGroups,
    items: ItemGroups,
    matrices: RankingMatrices,
}

impl ThreeUsers {
    fn new() -> Self {
        let user_ids = IdMap::from_ids("user", ["alice", "bob", "carol"]);
        let item_ids = IdMap::from_ids("item", ["i0", "i1", "i2", "i3", "i4", "i5"]);

        let active = user_ids.resolve_lines("alice\nbob\n").unwrap();
        let inactive = user_ids.resolve_lines("carol\n").unwrap();
        let shorthead = item_ids.resolve_lines("i0\ni1\ni2\n").unwrap();
        let longtail = item_ids.resolve_lines("i3\ni4\n").unwrap();

        let model = PrecomputedScores::from_rows(
            "ToyModel",
            vec![
                vec![0.9, 0.8, 0.7, 0.6, 0.5, 0.1],
                vec![0.5, 0.6, 0.7, 0.8, 0.9, 0.1],
                vec![0.9, 0.8, 0.7, 0.6, 0.5, 0.1],
            ],
        )
        .unwrap();
        let data = InteractionData::from_pairs(
            3,
            6,
            &[(0, 0), (0, 1), (1, 4), (1, 3), (2, 5)],
            &[(0, 0), (0, 2), (1, 4), (2, 3)],
        )
        .unwrap();
        let users = UserGroups::from_members(3, &[active, inactive]).unwrap();
        let items = ItemGroups::new(6, shorthead, longtail).unwrap();
        let matrices = RankingMatrixBuilder::new(BuilderConfig::default().with_topk(5))
            .build(&model, &data, &items)
            .unwrap();

        Self {
            data,
            users,
            items,
            matrices,
        }
    }

    fn problem(&self) -> FairnessProblem<'_> {
        FairnessProblem::new(&self.matrices, &self.users, &self.items, &self.data).unwrap()
    }
}

fn optimizer(formulation: FormulationConfig) -> FairnessOptimizer {
    FairnessOptimizer::new(
        OptimizerConfig::default()
            .with_k(2)
            .with_formulation(formulation),
    )
}

#[test]
fn mode_none_picks_the_two_best_candidates() {
    let toy = ThreeUsers::new();
    let result = optimizer(FormulationConfig::flat_sum())
        .solve(&toy.problem(), FairnessMode::None)
        .unwrap();

    for user in 0..3 {
        assert_abs_diff_eq!(result.selection.get(user, 0), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result.selection.get(user, 1), 1.0, epsilon = 1e-6);
        for rank in 2..5 {
            assert_abs_diff_eq!(result.selection.get(user, rank), 0.0, epsilon = 1e-6);
        }
    }
    assert_abs_diff_eq!(result.ndcg_gap().unwrap(), 2.0, epsilon = 1e-6);

    let engine = MetricsEngine::new(MetricsConfig::default().with_k(2));
    let lists = engine.predicted_lists(&result.selection, &toy.matrices.candidates);
    assert_eq!(lists[0], vec![0, 1]);
    assert_eq!(lists[1], vec![4, 3]);
    assert_eq!(lists[2], vec![0, 1]);
}

#[test]
fn consumer_penalty_shrinks_the_activity_gap() {
    let toy = ThreeUsers::new();
    for formulation in [
        FormulationConfig::flat_sum(),
        FormulationConfig::dcg_change(),
    ] {
        let opt = optimizer(formulation);
        let baseline = opt.solve(&toy.problem(), FairnessMode::None).unwrap();
        let fair = opt
            .solve(&toy.problem(), FairnessMode::Consumer { user_epsilon: 10.0 })
            .unwrap();

        let base_gap = baseline.ndcg_gap().unwrap();
        let fair_gap = fair.ndcg_gap().unwrap();
        assert!(
            fair_gap.abs() < base_gap.abs() - 1e-6,
            "{formulation:?}: gap {fair_gap} vs {base_gap}"
        );
        assert!(fair.relevance < baseline.relevance - 1e-6);
    }
}

#[test]
fn zero_penalty_reaches_the_unconstrained_optimum() {
    let toy = ThreeUsers::new();
    for formulation in [
        FormulationConfig::flat_sum(),
        FormulationConfig::proportional(),
        FormulationConfig::dcg_change(),
    ] {
        let opt = optimizer(formulation);
        let baseline = opt.solve(&toy.problem(), FairnessMode::None).unwrap();
        let both = opt
            .solve(
                &toy.problem(),
                FairnessMode::ConsumerProvider {
                    user_epsilon: 0.0,
                    item_epsilon: 0.0,
                },
            )
            .unwrap();
        assert_abs_diff_eq!(
            both.objective_value,
            baseline.objective_value,
            epsilon = 1e-6
        );
    }
}

/// One active user whose hits sit below the cut and one inactive user with
/// hits at ranks 0 and 3, so either group's DCG can still move both ways.
fn two_users_with_movable_hits() -> (InteractionData, UserGroups, ItemGroups, RankingMatrices) {
    let model = PrecomputedScores::from_rows(
        "ToyModel",
        vec![vec![0.9, 0.8, 0.7, 0.6, 0.1], vec![0.9, 0.8, 0.7, 0.6, 0.1]],
    )
    .unwrap();
    let data =
        InteractionData::from_pairs(2, 5, &[(0, 2), (0, 3), (1, 0), (1, 3)], &[]).unwrap();
    let users = UserGroups::from_members(2, &[vec![0], vec![1]]).unwrap();
    let items = ItemGroups::new(5, [0, 1], [2, 3, 4]).unwrap();
    let matrices = RankingMatrixBuilder::new(BuilderConfig::default().with_topk(4))
        .build(&model, &data, &items)
        .unwrap();
    (data, users, items, matrices)
}

#[test]
fn gap_sign_decides_which_group_is_pushed_down() {
    let (data, users, items, matrices) = two_users_with_movable_hits();
    let problem = FairnessProblem::new(&matrices, &users, &items, &data).unwrap();
    let solve = |sign: GapSign, mode: FairnessMode| {
        optimizer(FormulationConfig::flat_sum().with_gap_sign(sign))
            .solve(&problem, mode)
            .unwrap()
    };

    let baseline = solve(GapSign::FirstMinusSecond, FairnessMode::None);
    // active user has no hit in its top 2, inactive user has one
    assert_abs_diff_eq!(baseline.dcg_gap().unwrap(), -1.0, epsilon = 1e-6);

    let large = FairnessMode::Consumer { user_epsilon: 10.0 };
    let first_minus_second = solve(GapSign::FirstMinusSecond, large);
    let second_minus_first = solve(GapSign::SecondMinusFirst, large);

    // G[0] - G[1] is penalized: the inactive user takes its second hit
    assert_abs_diff_eq!(first_minus_second.dcg_gap().unwrap(), -2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(first_minus_second.selection.get(1, 3), 1.0, epsilon = 1e-6);
    // G[1] - G[0] is penalized: the active user takes both hits, the
    // inactive user drops its own
    assert_abs_diff_eq!(second_minus_first.dcg_gap().unwrap(), 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(second_minus_first.selection.get(0, 2), 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(second_minus_first.selection.get(0, 3), 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(second_minus_first.selection.get(1, 0), 0.0, epsilon = 1e-6);
}

#[test]
fn every_selection_has_exactly_k_items() {
    let toy = ThreeUsers::new();
    let opt = optimizer(FormulationConfig::proportional());
    for mode in [
        FairnessMode::None,
        FairnessMode::Consumer { user_epsilon: 0.5 },
        FairnessMode::Provider { item_epsilon: 0.5 },
        FairnessMode::ConsumerProvider {
            user_epsilon: 0.5,
            item_epsilon: 0.5,
        },
    ] {
        let result = opt.solve(&toy.problem(), mode).unwrap();
        assert!(result.selection.is_within_bounds(1e-6));
        for user in 0..3 {
            assert_abs_diff_eq!(result.selection.row_sum(user), 2.0, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(result.total_exposure(), 6.0, epsilon = 1e-6);
    }
}

#[test]
fn user_without_training_interactions_does_not_break_recall() {
    let model = PrecomputedScores::from_rows(
        "ToyModel",
        vec![vec![0.9, 0.5, 0.1], vec![0.2, 0.8, 0.4]],
    )
    .unwrap();
    // user 1 has held-out items but no training interactions
    let data = InteractionData::from_pairs(2, 3, &[(0, 0), (0, 2)], &[(0, 1), (1, 1)]).unwrap();
    let users = UserGroups::from_members(2, &[vec![0], vec![1]]).unwrap();
    let items = ItemGroups::new(3, [0], [1, 2]).unwrap();
    let matrices = RankingMatrixBuilder::new(BuilderConfig::default().with_topk(3))
        .build(&model, &data, &items)
        .unwrap();
    let problem = FairnessProblem::new(&matrices, &users, &items, &data).unwrap();

    let result = FairnessOptimizer::new(OptimizerConfig::default().with_k(1))
        .solve(&problem, FairnessMode::Consumer { user_epsilon: 0.1 })
        .unwrap();
    assert_eq!(result.group_recall.len(), 2);
    assert!(result.group_recall.iter().all(|r| r.is_finite()));

    let metrics = MetricsEngine::new(MetricsConfig::default().with_k(1))
        .evaluate_all(&result.selection, &matrices.candidates, &data)
        .unwrap();
    assert_eq!(metrics.evaluated_users, 2);
    assert!(metrics.recall.is_some());
}

#[test]
fn novelty_of_two_items() {
    let popularity = HashMap::from([("A", 10u64), ("B", 5u64)]);
    let value = novelty(&["A", "B"], &popularity, 100, 2).unwrap();
    assert_abs_diff_eq!(round_to(value, 5), 3.82193, epsilon = 1e-9);
}

#[test]
fn ndcg_of_a_perfect_prefix_is_one() {
    let actual = vec![3usize, 8, 1, 9, 4];
    let relevant: HashSet<usize> = actual.iter().copied().collect();
    for len in 1..=actual.len() {
        assert_abs_diff_eq!(ndcgk(&relevant, &actual[..len]).unwrap(), 1.0, epsilon = 1e-12);
    }
}

#[test]
fn empty_lists_are_reported_not_divided() {
    let relevant: HashSet<usize> = HashSet::from([1]);
    assert!(matches!(
        ndcgk(&relevant, &[]),
        Err(FairRankError::ZeroDenominator(_))
    ));
    assert!(matches!(
        catalog_coverage::<usize>(&[], 0),
        Err(FairRankError::ZeroDenominator(_))
    ));
}

#[test]
fn sweep_reports_every_cell_with_its_parameters() {
    let toy = ThreeUsers::new();
    let runner = SweepRunner::new(
        SweepConfig::default()
            .with_user_epsilons(vec![0.01, 10.0])
            .with_item_epsilons(vec![0.01])
            .with_error_policy(ErrorPolicy::Continue)
            .with_parallel(true),
        optimizer(FormulationConfig::flat_sum()),
        MetricsEngine::new(MetricsConfig::default().with_k(2)),
    )
    .unwrap();
    let context = SweepContext::new(
        "toy",
        "activity",
        "popularity",
        &toy.matrices,
        &toy.users,
        &toy.items,
        &toy.data,
    )
    .unwrap();

    let report = runner.run(&context).unwrap();
    assert!(report.is_complete());
    // N + 2 C + 1 P + 2 CP
    assert_eq!(report.reports.len(), 6);

    let none = &report.reports[0];
    assert_eq!(
        none.key.to_string(),
        "dataset=toy model=ToyModel users=activity items=popularity mode=N uepsilon=- iepsilon=-"
    );
    assert!(none.exposure_balanced(1e-6), "{}", none.exposure_check());
    assert_eq!(none.groups.len(), 2);
    // alice: [i0, i1] vs {i0, i2}; bob: [i4, i3] vs {i4}
    assert_eq!(none.groups[0].precision, Some(0.5));
    assert_eq!(none.all.evaluated_users, 3);
    assert_eq!(none.all.skipped_users, 0);
}
