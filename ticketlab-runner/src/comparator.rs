//! A/B comparison of two configurations on a held-out window.
//!
//! History is split chronologically: the most recent `test_window` draws are
//! held out, and the `calibration_window` draws right before them form the
//! calibration tail. Both arms are aggregated on each part with the sweep's
//! accumulators. The winner is decided on the test window with the ranker's
//! score ordering, and the numeric margin is always reported so near-ties are
//! visible.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use ticketlab_core::domain::{Draw, ScoreSnapshot};
use ticketlab_core::error::EngineError;
use ticketlab_core::generator::{Generator, Strategy};

use crate::aggregate::{ConfigAccumulator, ConfigurationResult};
use crate::config::{ConfigError, SweepConfig};
use crate::leaderboard::compare_scores;
use crate::profiling::StageTimer;
use crate::scores::ScoreProvider;
use crate::sweep::{build_pool, evaluate_configuration, evaluate_per_draw, SweepError};

#[derive(Debug, Error)]
pub enum AbError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Sweep(#[from] SweepError),

    #[error("arm {side} has no evaluated units in the test window")]
    NoEvaluatedUnits { side: AbSide },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbSide {
    A,
    B,
}

impl fmt::Display for AbSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// Chronological draw indices covered by one part of the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRange {
    pub first: usize,
    pub last: usize,
    pub len: usize,
}

impl DrawRange {
    fn of(draws: &[Draw]) -> Option<Self> {
        Some(Self {
            first: draws.first()?.index,
            last: draws.last()?.index,
            len: draws.len(),
        })
    }
}

/// One arm's results on both parts of the split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmReport {
    pub seed: u64,
    pub strategy: Strategy,
    /// `None` when the calibration window is empty.
    pub calibration: Option<ConfigurationResult>,
    pub test: ConfigurationResult,
}

/// Draw-by-draw comparison over the test window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedSummary {
    /// Draws where both arms had at least one evaluated ticket.
    pub draws: usize,
    pub a_wins: usize,
    pub b_wins: usize,
    pub ties: usize,
    /// Draws where either arm had no evaluated ticket.
    pub skipped: usize,
    /// Mean of (A − B) per-draw mean composite, over compared draws.
    pub mean_difference: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbReport {
    pub a: ArmReport,
    pub b: ArmReport,
    pub winner: AbSide,
    /// False when the two arms tie on every ranking key.
    pub decisive: bool,
    /// A's test mean composite minus B's.
    pub margin: f64,
    pub paired: PairedSummary,
    pub calibration_draws: Option<DrawRange>,
    pub test_draws: DrawRange,
    pub snapshot_digest: String,
}

impl AbReport {
    pub fn winning_arm(&self) -> &ArmReport {
        match self.winner {
            AbSide::A => &self.a,
            AbSide::B => &self.b,
        }
    }
}

/// Query `provider` once, then compare the two configured arms.
pub fn run_ab_with_provider(
    config: &SweepConfig,
    provider: &dyn ScoreProvider,
    history: &[Draw],
) -> Result<AbReport, AbError> {
    config.validate()?;
    let snapshot = provider.snapshot()?;
    info!(
        provider = provider.name(),
        digest = %snapshot.digest(),
        "score snapshot loaded"
    );
    run_ab(config, &snapshot, history)
}

/// Compare `config.ab.a` against `config.ab.b`. `history` must be oldest first.
pub fn run_ab(
    config: &SweepConfig,
    snapshot: &ScoreSnapshot,
    history: &[Draw],
) -> Result<AbReport, AbError> {
    config.validate()?;
    let (calibration, test) = split_history(
        history,
        config.ab.calibration_window,
        config.ab.test_window,
    )?;
    let (seed_a, strategy_a) = config.arm_a();
    let (seed_b, strategy_b) = config.arm_b();
    let gen_a = Generator::new(snapshot, strategy_a)?;
    let gen_b = Generator::new(snapshot, strategy_b)?;
    let pool = build_pool(config.sweep.threads)?;
    let tickets = config.sweep.tickets_per_draw;

    info!(
        a = %strategy_a,
        seed_a,
        b = %strategy_b,
        seed_b,
        calibration = calibration.len(),
        test = test.len(),
        "A/B comparison started"
    );

    let run = || {
        let _timer = StageTimer::new("ab_compare");
        let arm = |generator: &Generator<'_>, seed: u64| {
            let per_draw = evaluate_per_draw(generator, seed, test, tickets, config.win);
            let calib = (!calibration.is_empty()).then(|| {
                evaluate_configuration(generator, seed, calibration, tickets, config.win)
                    .finish(seed, *generator.strategy(), &config.scoring)
            });
            (per_draw, calib)
        };
        (arm(&gen_a, seed_a), arm(&gen_b, seed_b))
    };
    let ((draws_a, calib_a), (draws_b, calib_b)) = match &pool {
        Some(tp) => tp.install(run),
        None => run(),
    };

    let test_a = merge(&draws_a, config).finish(seed_a, strategy_a, &config.scoring);
    let test_b = merge(&draws_b, config).finish(seed_b, strategy_b, &config.scoring);
    if test_a.stats.is_none() {
        return Err(AbError::NoEvaluatedUnits { side: AbSide::A });
    }
    if test_b.stats.is_none() {
        return Err(AbError::NoEvaluatedUnits { side: AbSide::B });
    }

    let ordering = compare_scores(&test_a, &test_b);
    let winner = match ordering {
        Ordering::Greater => AbSide::B,
        _ => AbSide::A,
    };
    let margin = test_a.mean_composite().unwrap_or(0.0) - test_b.mean_composite().unwrap_or(0.0);
    let paired = paired_summary(&draws_a, &draws_b, config);

    info!(
        %winner,
        margin,
        decisive = ordering != Ordering::Equal,
        a_wins = paired.a_wins,
        b_wins = paired.b_wins,
        ties = paired.ties,
        "A/B comparison finished"
    );

    Ok(AbReport {
        a: ArmReport {
            seed: seed_a,
            strategy: strategy_a,
            calibration: calib_a,
            test: test_a,
        },
        b: ArmReport {
            seed: seed_b,
            strategy: strategy_b,
            calibration: calib_b,
            test: test_b,
        },
        winner,
        decisive: ordering != Ordering::Equal,
        margin,
        paired,
        calibration_draws: DrawRange::of(calibration),
        test_draws: DrawRange::of(test).ok_or(EngineError::InsufficientHistory {
            requested: 1,
            available: 0,
        })?,
        snapshot_digest: snapshot.digest(),
    })
}

/// Split into (calibration tail, test window), both oldest first.
pub fn split_history(
    history: &[Draw],
    calibration_window: usize,
    test_window: usize,
) -> Result<(&[Draw], &[Draw]), EngineError> {
    let needed = calibration_window + test_window;
    if test_window == 0 || needed > history.len() {
        return Err(EngineError::InsufficientHistory {
            requested: needed,
            available: history.len(),
        });
    }
    let test_start = history.len() - test_window;
    Ok((
        &history[test_start - calibration_window..test_start],
        &history[test_start..],
    ))
}

fn merge(per_draw: &[ConfigAccumulator], config: &SweepConfig) -> ConfigAccumulator {
    per_draw
        .iter()
        .fold(ConfigAccumulator::new(config.win), |acc, d| acc.merge(*d))
}

fn paired_summary(
    a: &[ConfigAccumulator],
    b: &[ConfigAccumulator],
    config: &SweepConfig,
) -> PairedSummary {
    let mut summary = PairedSummary {
        draws: 0,
        a_wins: 0,
        b_wins: 0,
        ties: 0,
        skipped: 0,
        mean_difference: None,
    };
    let mut total_diff = 0.0;
    for (da, db) in a.iter().zip(b) {
        let (Some(ma), Some(mb)) = (
            da.mean_composite(&config.scoring),
            db.mean_composite(&config.scoring),
        ) else {
            summary.skipped += 1;
            continue;
        };
        summary.draws += 1;
        total_diff += ma - mb;
        match ma.total_cmp(&mb) {
            Ordering::Greater => summary.a_wins += 1,
            Ordering::Less => summary.b_wins += 1,
            Ordering::Equal => summary.ties += 1,
        }
    }
    if summary.draws > 0 {
        summary.mean_difference = Some(total_diff / summary.draws as f64);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArmConfig;
    use ticketlab_core::generator::StrategyKind;

    fn history(n: usize) -> Vec<Draw> {
        (0..n)
            .map(|i| Draw::new(i, None, vec![1, 2, 3, 4, 5], vec![1, 2]))
            .collect()
    }

    fn config(a: StrategyKind, b: StrategyKind) -> SweepConfig {
        let mut cfg = SweepConfig::default();
        cfg.ab.test_window = 4;
        cfg.ab.calibration_window = 3;
        cfg.ab.a = ArmConfig { seed: 1, strategy: a };
        cfg.ab.b = ArmConfig { seed: 2, strategy: b };
        cfg.sweep.tickets_per_draw = 2;
        cfg
    }

    fn favoured_snapshot() -> ScoreSnapshot {
        let main = (1..=50).map(|i| if i <= 5 { 100.0 } else { 1.0 }).collect();
        let stars = (1..=12).map(|i| if i <= 2 { 100.0 } else { 1.0 }).collect();
        ScoreSnapshot::from_weights(main, stars).unwrap()
    }

    #[test]
    fn split_takes_tail_for_test() {
        let h = history(10);
        let (cal, test) = split_history(&h, 3, 4).unwrap();
        assert_eq!(cal.iter().map(|d| d.index).collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(test.iter().map(|d| d.index).collect::<Vec<_>>(), vec![6, 7, 8, 9]);
    }

    #[test]
    fn split_rejects_oversized_windows() {
        let h = history(5);
        assert!(matches!(
            split_history(&h, 3, 4),
            Err(EngineError::InsufficientHistory {
                requested: 7,
                available: 5
            })
        ));
        assert!(split_history(&h, 0, 0).is_err());
    }

    #[test]
    fn identical_arms_tie_with_a_retained() {
        let mut cfg = config(StrategyKind::WeightedRandom, StrategyKind::WeightedRandom);
        cfg.ab.b.seed = 1;
        let report = run_ab(&cfg, &ScoreSnapshot::uniform(), &history(10)).unwrap();
        assert_eq!(report.winner, AbSide::A);
        assert!(!report.decisive);
        assert_eq!(report.margin, 0.0);
        assert_eq!(report.paired.ties, 4);
        assert_eq!(report.paired.mean_difference, Some(0.0));
    }

    #[test]
    fn dominant_arm_wins_with_non_negative_margin() {
        let cfg = config(StrategyKind::TopK, StrategyKind::WeightedRandom);
        let report = run_ab(&cfg, &favoured_snapshot(), &history(10)).unwrap();
        assert_eq!(report.winner, AbSide::A);
        assert!(report.margin >= 0.0);
        assert_eq!(report.paired.b_wins, 0);
        assert_eq!(report.a.test.stats.as_ref().unwrap().win_rate, 1.0);
        assert!(report.a.calibration.is_some());
    }

    /// Drawn ids {1..5 | 1,2} outweighed by never-drawn decoys {46..50 | 11,12}.
    fn decoy_snapshot() -> ScoreSnapshot {
        let main = (1..=50)
            .map(|i| match i {
                1..=5 => 1.0,
                46..=50 => 1.5,
                _ => 0.0,
            })
            .collect();
        let stars = (1..=12)
            .map(|i| match i {
                1 | 2 => 1.0,
                11 | 12 => 1.5,
                _ => 0.0,
            })
            .collect();
        ScoreSnapshot::from_weights(main, stars).unwrap()
    }

    #[test]
    fn weaker_arm_a_loses() {
        // Top-k takes only decoys. Seed 2 weighted tickets on draws 6..9 each hit
        // at least one drawn id, 23 matches over the eight units.
        let cfg = config(StrategyKind::TopK, StrategyKind::WeightedRandom);
        let report = run_ab(&cfg, &decoy_snapshot(), &history(10)).unwrap();
        assert!(report.decisive);
        assert_eq!(report.winner, AbSide::B);
        assert!(report.margin < 0.0);
        assert_eq!(report.paired.b_wins, 4);
        assert_eq!(report.paired.a_wins, 0);

        let a = report.a.test.stats.as_ref().unwrap();
        let b = report.b.test.stats.as_ref().unwrap();
        assert_eq!(a.sum_main + a.sum_stars, 0);
        assert_eq!(b.sum_main + b.sum_stars, 23);
    }

    #[test]
    fn all_malformed_test_window_is_an_error() {
        let mut h = history(10);
        for d in h.iter_mut().skip(6) {
            d.main = vec![1, 1, 1, 1, 1];
        }
        let cfg = config(StrategyKind::TopK, StrategyKind::WeightedRandom);
        let err = run_ab(&cfg, &ScoreSnapshot::uniform(), &h).unwrap_err();
        assert!(matches!(err, AbError::NoEvaluatedUnits { side: AbSide::A }));
    }

    #[test]
    fn empty_calibration_window_is_allowed() {
        let mut cfg = config(StrategyKind::TopK, StrategyKind::Hybrid);
        cfg.ab.calibration_window = 0;
        let report = run_ab(&cfg, &ScoreSnapshot::uniform(), &history(4)).unwrap();
        assert!(report.a.calibration.is_none());
        assert!(report.calibration_draws.is_none());
        assert_eq!(report.test_draws.len, 4);
    }
}
