//! Configuration sweep: every (seed, strategy) pair over the recent window.
//!
//! Pre-sweep validation (config values, window size, candidate capacity of
//! every strategy) fails fast before any work is reported. Configurations are
//! then evaluated one after another; inside a configuration the
//! `window × tickets_per_draw` units run as a rayon fold/reduce over integer
//! accumulators, so results do not depend on thread count or scheduling.
//!
//! Cancellation is polled before each configuration. A cancelled sweep returns
//! the configurations that completed; none is ever partially aggregated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use ticketlab_core::domain::{Draw, ScoreSnapshot};
use ticketlab_core::error::EngineError;
use ticketlab_core::evaluator::WinRule;
use ticketlab_core::generator::{Generator, Strategy};

use crate::aggregate::{run_unit, ConfigAccumulator, ConfigurationResult};
use crate::config::{ConfigError, SweepConfig};
use crate::history::recent_window;
use crate::leaderboard::Leaderboard;
use crate::profiling::StageTimer;
use crate::scores::ScoreProvider;

/// Errors that abort a sweep before results are produced.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Progress update sent after each configuration completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepProgress {
    pub completed: usize,
    pub total: usize,
    pub seed: u64,
    pub strategy: Strategy,
    pub excluded_units: u64,
    pub elapsed_secs: f64,
}

/// Everything a sweep produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcome {
    /// Completed configurations in grid order.
    pub results: Vec<ConfigurationResult>,
    pub total_configurations: usize,
    pub cancelled: bool,
    pub snapshot_digest: String,
    /// Chronological indices of the first and last evaluated draw.
    pub first_draw: usize,
    pub last_draw: usize,
    pub units_per_configuration: u64,
    pub elapsed_secs: f64,
}

impl SweepOutcome {
    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn leaderboard(&self, top_n: usize) -> Leaderboard {
        Leaderboard::rank(&self.results, top_n)
    }
}

/// Query `provider` once, then run the sweep over that snapshot.
pub fn run_sweep_with_provider(
    config: &SweepConfig,
    provider: &dyn ScoreProvider,
    history: &[Draw],
    progress_cb: Option<&(dyn Fn(&SweepProgress) + Sync)>,
    cancel: Option<&AtomicBool>,
) -> Result<SweepOutcome, SweepError> {
    config.validate()?;
    let snapshot = {
        let _timer = StageTimer::new("score_snapshot");
        provider.snapshot()?
    };
    info!(
        provider = provider.name(),
        digest = %snapshot.digest(),
        "score snapshot loaded"
    );
    run_sweep(config, &snapshot, history, progress_cb, cancel)
}

/// Run every configuration of `config` over the most recent window of `history`.
///
/// `history` must be oldest first. The snapshot is shared read-only by every
/// unit for the whole sweep.
pub fn run_sweep(
    config: &SweepConfig,
    snapshot: &ScoreSnapshot,
    history: &[Draw],
    progress_cb: Option<&(dyn Fn(&SweepProgress) + Sync)>,
    cancel: Option<&AtomicBool>,
) -> Result<SweepOutcome, SweepError> {
    config.validate()?;
    let window = recent_window(history, config.sweep.window)?;
    let strategies = config.strategies();
    let generators = prepare_generators(snapshot, &strategies)?;
    let pool = build_pool(config.sweep.threads)?;

    let grid: Vec<(u64, usize)> = config
        .seeds()
        .into_iter()
        .flat_map(|seed| (0..generators.len()).map(move |g| (seed, g)))
        .collect();
    let tickets = config.sweep.tickets_per_draw;
    let units = (window.len() * tickets) as u64;

    let malformed = window.iter().filter(|d| !d.is_well_formed()).count();
    if malformed > 0 {
        warn!(
            malformed,
            window = window.len(),
            "window contains malformed draws; their units will be excluded"
        );
    }
    info!(
        configurations = grid.len(),
        window = window.len(),
        tickets_per_draw = tickets,
        total_units = units * grid.len() as u64,
        "sweep started"
    );

    let start = Instant::now();
    let run = || {
        let _timer = StageTimer::new("sweep");
        let mut results = Vec::with_capacity(grid.len());
        let mut cancelled = false;
        for &(seed, g) in &grid {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                cancelled = true;
                break;
            }
            let generator = &generators[g];
            let acc = evaluate_configuration(generator, seed, window, tickets, config.win);
            let result = acc.finish(seed, *generator.strategy(), &config.scoring);
            log_result(&result);
            if let Some(cb) = progress_cb {
                cb(&SweepProgress {
                    completed: results.len() + 1,
                    total: grid.len(),
                    seed,
                    strategy: result.strategy,
                    excluded_units: result.excluded_units,
                    elapsed_secs: start.elapsed().as_secs_f64(),
                });
            }
            results.push(result);
        }
        (results, cancelled)
    };
    let (results, cancelled) = match &pool {
        Some(tp) => tp.install(run),
        None => run(),
    };

    let elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        completed = results.len(),
        total = grid.len(),
        cancelled,
        elapsed_secs,
        "sweep finished"
    );

    Ok(SweepOutcome {
        results,
        total_configurations: grid.len(),
        cancelled,
        snapshot_digest: snapshot.digest(),
        first_draw: window.first().map_or(0, |d| d.index),
        last_draw: window.last().map_or(0, |d| d.index),
        units_per_configuration: units,
        elapsed_secs,
    })
}

fn log_result(result: &ConfigurationResult) {
    match &result.stats {
        Some(stats) => debug!(
            seed = result.seed,
            strategy = %result.strategy,
            mean_composite = stats.mean_composite,
            win_rate = stats.win_rate,
            excluded = result.excluded_units,
            "configuration complete"
        ),
        None => warn!(
            seed = result.seed,
            strategy = %result.strategy,
            excluded = result.excluded_units,
            "every unit of configuration was excluded"
        ),
    }
    if result.stats.is_some() && result.excluded_units > 0 {
        warn!(
            seed = result.seed,
            strategy = %result.strategy,
            excluded = result.excluded_units,
            malformed_draw = result.failures.malformed_draw,
            invalid_candidate = result.failures.invalid_candidate,
            insufficient_candidates = result.failures.insufficient_candidates,
            unexpected = result.failures.unexpected,
            "configuration has excluded units"
        );
    }
}

/// Resolve one generator per strategy, failing on the first strategy that
/// cannot run against this snapshot.
pub(crate) fn prepare_generators<'s>(
    snapshot: &'s ScoreSnapshot,
    strategies: &[Strategy],
) -> Result<Vec<Generator<'s>>, EngineError> {
    strategies
        .iter()
        .map(|s| Generator::new(snapshot, *s))
        .collect()
}

pub(crate) fn build_pool(threads: usize) -> Result<Option<rayon::ThreadPool>, SweepError> {
    if threads == 0 {
        return Ok(None);
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map(Some)
        .map_err(|e| SweepError::ThreadPool(e.to_string()))
}

/// Aggregate `draws.len() × tickets` units of one configuration.
pub fn evaluate_configuration(
    generator: &Generator<'_>,
    seed: u64,
    draws: &[Draw],
    tickets: usize,
    win_rule: WinRule,
) -> ConfigAccumulator {
    (0..draws.len() * tickets)
        .into_par_iter()
        .fold(
            || ConfigAccumulator::new(win_rule),
            |mut acc, unit| {
                acc.record(run_unit(generator, seed, &draws[unit / tickets], unit % tickets));
                acc
            },
        )
        .reduce(|| ConfigAccumulator::new(win_rule), ConfigAccumulator::merge)
}

/// One accumulator per draw, in draw order.
pub fn evaluate_per_draw(
    generator: &Generator<'_>,
    seed: u64,
    draws: &[Draw],
    tickets: usize,
    win_rule: WinRule,
) -> Vec<ConfigAccumulator> {
    draws
        .par_iter()
        .map(|draw| {
            let mut acc = ConfigAccumulator::new(win_rule);
            for t in 0..tickets {
                acc.record(run_unit(generator, seed, draw, t));
            }
            acc
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SweepSection;
    use std::sync::Mutex;
    use ticketlab_core::generator::StrategyKind;

    fn history(n: usize) -> Vec<Draw> {
        (0..n)
            .map(|i| {
                let base = (i % 9) as u8 * 5;
                Draw::new(
                    i,
                    None,
                    vec![base + 1, base + 2, base + 3, base + 4, base + 5],
                    vec![(i % 11) as u8 + 1, 12],
                )
            })
            .collect()
    }

    fn config(seeds: Vec<u64>, window: usize) -> SweepConfig {
        SweepConfig {
            sweep: SweepSection {
                seeds: Some(seeds),
                window,
                tickets_per_draw: 3,
                ..SweepSection::default()
            },
            ..SweepConfig::default()
        }
    }

    #[test]
    fn window_larger_than_history_fails_fast() {
        let err = run_sweep(
            &config(vec![1], 20),
            &ScoreSnapshot::uniform(),
            &history(10),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SweepError::Engine(EngineError::InsufficientHistory {
                requested: 20,
                available: 10
            })
        ));
    }

    #[test]
    fn every_configuration_is_reported() {
        let out = run_sweep(
            &config(vec![1, 2], 8),
            &ScoreSnapshot::uniform(),
            &history(10),
            None,
            None,
        )
        .unwrap();
        assert_eq!(out.completed(), 6);
        assert!(!out.cancelled);
        assert_eq!(out.first_draw, 2);
        assert_eq!(out.last_draw, 9);
        for r in &out.results {
            assert_eq!(r.evaluated_units, 24);
            assert_eq!(r.excluded_units, 0);
        }
    }

    #[test]
    fn thread_count_does_not_change_results() {
        let snap = ScoreSnapshot::from_weights(
            (1..=50).map(|i| (i % 5 + 1) as f64).collect(),
            (1..=12).map(|i| i as f64).collect(),
        )
        .unwrap();
        let mut single = config(vec![3, 4], 10);
        single.sweep.threads = 1;
        let mut multi = single.clone();
        multi.sweep.threads = 4;
        let a = run_sweep(&single, &snap, &history(12), None, None).unwrap();
        let b = run_sweep(&multi, &snap, &history(12), None, None).unwrap();
        assert_eq!(a.results, b.results);
    }

    #[test]
    fn cancellation_before_start_returns_nothing() {
        let cancel = AtomicBool::new(true);
        let out = run_sweep(
            &config(vec![1], 5),
            &ScoreSnapshot::uniform(),
            &history(5),
            None,
            Some(&cancel),
        )
        .unwrap();
        assert!(out.cancelled);
        assert_eq!(out.completed(), 0);
        assert_eq!(out.total_configurations, 3);
    }

    #[test]
    fn cancellation_mid_sweep_keeps_completed_configurations() {
        let cancel = AtomicBool::new(false);
        let cb = |p: &SweepProgress| {
            if p.completed == 2 {
                cancel.store(true, Ordering::Relaxed);
            }
        };
        let out = run_sweep(
            &config(vec![1, 2], 5),
            &ScoreSnapshot::uniform(),
            &history(5),
            Some(&cb),
            Some(&cancel),
        )
        .unwrap();
        assert!(out.cancelled);
        assert_eq!(out.completed(), 2);
    }

    #[test]
    fn progress_reports_each_configuration() {
        let seen = Mutex::new(Vec::new());
        let cb = |p: &SweepProgress| seen.lock().unwrap().push((p.completed, p.total));
        let mut cfg = config(vec![1], 4);
        cfg.sweep.strategies = vec![StrategyKind::TopK, StrategyKind::WeightedRandom];
        run_sweep(&cfg, &ScoreSnapshot::uniform(), &history(4), Some(&cb), None).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn short_positive_pool_fails_before_work() {
        let mut stars = vec![0.0; 12];
        stars[0] = 1.0;
        let snap = ScoreSnapshot::from_weights(vec![1.0; 50], stars).unwrap();
        let called = AtomicBool::new(false);
        let cb = |_: &SweepProgress| called.store(true, Ordering::Relaxed);
        let err = run_sweep(&config(vec![1], 4), &snap, &history(4), Some(&cb), None).unwrap_err();
        assert!(matches!(
            err,
            SweepError::Engine(EngineError::InsufficientCandidates { .. })
        ));
        assert!(!called.load(Ordering::Relaxed));
    }

    #[test]
    fn per_draw_accumulators_merge_to_configuration_total() {
        let snap = ScoreSnapshot::uniform();
        let gen = Generator::new(&snap, Strategy::WeightedRandom).unwrap();
        let draws = history(6);
        let total = evaluate_configuration(&gen, 9, &draws, 4, WinRule::default());
        let merged = evaluate_per_draw(&gen, 9, &draws, 4, WinRule::default())
            .into_iter()
            .fold(ConfigAccumulator::new(WinRule::default()), ConfigAccumulator::merge);
        assert_eq!(total, merged);
    }
}
