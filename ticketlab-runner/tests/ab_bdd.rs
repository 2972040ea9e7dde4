//! BDD tests for the A/B comparator.

use ticketlab_core::domain::{Draw, ScoreSnapshot};
use ticketlab_core::error::EngineError;
use ticketlab_core::generator::StrategyKind;
use ticketlab_runner::{run_ab, run_ab_with_provider, AbError, AbSide, SweepConfig, UniformScores};

fn fixed_history(n: usize) -> Vec<Draw> {
    (0..n)
        .map(|i| Draw::new(i, None, vec![1, 2, 3, 4, 5], vec![1, 2]))
        .collect()
}

fn ab_config(a: &str, b: &str, test_window: usize, calibration_window: usize) -> SweepConfig {
    SweepConfig::from_toml(&format!(
        r#"
[sweep]
tickets_per_draw = 3

[ab]
test_window = {test_window}
calibration_window = {calibration_window}
a = {{ seed = 7, strategy = "{a}" }}
b = {{ seed = 8, strategy = "{b}" }}
"#
    ))
    .expect("config should parse")
}

fn favoured_snapshot() -> ScoreSnapshot {
    let main = (1..=50).map(|i| if i <= 5 { 50.0 } else { 1.0 }).collect();
    let stars = (1..=12).map(|i| if i <= 2 { 50.0 } else { 1.0 }).collect();
    ScoreSnapshot::from_weights(main, stars).unwrap()
}

#[test]
fn bdd_scenario_dominating_arm_wins() {
    // GIVEN every test draw is {1..5 | 1,2} and scores favour exactly those ids
    let history = fixed_history(30);
    let snapshot = favoured_snapshot();

    // AND arm A is top-k (always a perfect match) and arm B samples by weight
    let config = ab_config("top_k", "weighted_random", 10, 10);

    // WHEN the comparator runs
    let report = run_ab(&config, &snapshot, &history).expect("comparison should succeed");

    // THEN A matches at least as many ids on every draw, wins, and has margin >= 0
    assert_eq!(report.winner, AbSide::A);
    assert!(report.margin >= 0.0);
    assert_eq!(report.paired.b_wins, 0);
    assert_eq!(report.paired.draws, 10);
    assert_eq!(report.a.test.stats.as_ref().unwrap().mean_composite, 60.0);
    assert_eq!(report.winning_arm().strategy.kind(), StrategyKind::TopK);
}

#[test]
fn bdd_scenario_split_is_chronological() {
    // GIVEN 30 draws, a 10-draw test window and an 8-draw calibration tail
    let history = fixed_history(30);
    let config = ab_config("top_k", "hybrid", 10, 8);

    // WHEN the comparator runs
    let report = run_ab(&config, &ScoreSnapshot::uniform(), &history).unwrap();

    // THEN the test window is the 10 most recent draws and calibration precedes it
    assert_eq!(report.test_draws.first, 20);
    assert_eq!(report.test_draws.last, 29);
    let cal = report.calibration_draws.unwrap();
    assert_eq!((cal.first, cal.last, cal.len), (12, 19, 8));

    // AND both arms were aggregated on each part
    assert_eq!(report.a.test.evaluated_units, 30);
    assert_eq!(report.b.calibration.as_ref().unwrap().evaluated_units, 24);
}

#[test]
fn bdd_scenario_identical_arms_are_a_non_decisive_tie() {
    // GIVEN both arms configured identically
    let mut config = ab_config("weighted_random", "weighted_random", 6, 0);
    config.ab.b.seed = config.ab.a.seed;

    // WHEN the comparator runs through a provider
    let report = run_ab_with_provider(&config, &UniformScores, &fixed_history(6)).unwrap();

    // THEN A is kept as winner, the result is not decisive, and the margin is 0
    assert_eq!(report.winner, AbSide::A);
    assert!(!report.decisive);
    assert_eq!(report.margin, 0.0);
    assert_eq!(report.paired.ties, 6);
}

#[test]
fn bdd_scenario_windows_larger_than_history_fail() {
    // GIVEN 10 draws but 8 test + 5 calibration requested
    let config = ab_config("top_k", "hybrid", 8, 5);

    // WHEN the comparator runs
    let err = run_ab(&config, &ScoreSnapshot::uniform(), &fixed_history(10)).unwrap_err();

    // THEN it reports insufficient history
    assert!(matches!(
        err,
        AbError::Engine(EngineError::InsufficientHistory {
            requested: 13,
            available: 10
        })
    ));
}

#[test]
fn bdd_scenario_all_failed_arm_is_an_error_not_a_loss() {
    // GIVEN a test window made entirely of malformed draws
    let mut history = fixed_history(12);
    for d in history.iter_mut().skip(8) {
        d.stars = vec![13, 1];
    }
    let config = ab_config("top_k", "hybrid", 4, 4);

    // WHEN the comparator runs
    let err = run_ab(&config, &ScoreSnapshot::uniform(), &history).unwrap_err();

    // THEN it refuses to declare a winner
    assert!(matches!(err, AbError::NoEvaluatedUnits { side: AbSide::A }));
}
