//! Per-unit outcomes and their aggregation into configuration results.
//!
//! Every generate+evaluate unit ends as a tagged [`UnitOutcome`]. Failures are
//! counted per kind and excluded from the statistics; they are never folded
//! in as zero matches. Sums are kept as integers, so merge order cannot change
//! the result and means are exact quotients.

use serde::{Deserialize, Serialize};
use std::fmt;

use ticketlab_core::domain::Draw;
use ticketlab_core::error::EngineError;
use ticketlab_core::evaluator::{
    evaluate, MatchCount, PrizeTier, ScoringWeights, WinRule, PRIZE_TIERS,
};
use ticketlab_core::generator::{Generator, Strategy};

/// Why a unit was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitFailure {
    MalformedDraw,
    InvalidCandidate,
    InsufficientCandidates,
    /// An error that belongs to pre-sweep validation reached a unit.
    Unexpected,
}

impl UnitFailure {
    /// Classify an engine error raised inside a unit.
    pub fn classify(err: &EngineError) -> Self {
        match err {
            EngineError::MalformedDraw { .. } => Self::MalformedDraw,
            EngineError::InvalidCandidate(_) => Self::InvalidCandidate,
            EngineError::InsufficientCandidates { .. } => Self::InsufficientCandidates,
            EngineError::DataUnavailable(_)
            | EngineError::InsufficientHistory { .. }
            | EngineError::Configuration(_) => Self::Unexpected,
        }
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MalformedDraw => "malformed draw",
            Self::InvalidCandidate => "invalid candidate",
            Self::InsufficientCandidates => "insufficient candidates",
            Self::Unexpected => "unexpected engine error",
        })
    }
}

/// Result of one generate+evaluate unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Evaluated(MatchCount),
    Excluded(UnitFailure),
}

/// Generate one ticket and evaluate it against `draw`.
///
/// The generator is keyed on the draw's chronological index, so a unit's
/// ticket is the same whichever window or split the draw falls in.
pub fn run_unit(
    generator: &Generator<'_>,
    seed: u64,
    draw: &Draw,
    ticket_index: usize,
) -> UnitOutcome {
    let outcome = generator
        .generate(seed, draw.index, ticket_index)
        .and_then(|ticket| evaluate(&ticket, draw));
    match outcome {
        Ok(m) => UnitOutcome::Evaluated(m),
        Err(e) => UnitOutcome::Excluded(UnitFailure::classify(&e)),
    }
}

/// Excluded-unit counts by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCounts {
    pub malformed_draw: u64,
    pub invalid_candidate: u64,
    pub insufficient_candidates: u64,
    #[serde(default)]
    pub unexpected: u64,
}

impl FailureCounts {
    pub fn total(&self) -> u64 {
        self.malformed_draw
            + self.invalid_candidate
            + self.insufficient_candidates
            + self.unexpected
    }

    fn record(&mut self, failure: UnitFailure) {
        match failure {
            UnitFailure::MalformedDraw => self.malformed_draw += 1,
            UnitFailure::InvalidCandidate => self.invalid_candidate += 1,
            UnitFailure::InsufficientCandidates => self.insufficient_candidates += 1,
            UnitFailure::Unexpected => self.unexpected += 1,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            malformed_draw: self.malformed_draw + other.malformed_draw,
            invalid_candidate: self.invalid_candidate + other.invalid_candidate,
            insufficient_candidates: self.insufficient_candidates + other.insufficient_candidates,
            unexpected: self.unexpected + other.unexpected,
        }
    }
}

/// Partial aggregate. Merge is commutative and associative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigAccumulator {
    win_rule: WinRule,
    evaluated: u64,
    sum_main: u64,
    sum_stars: u64,
    wins: u64,
    best: Option<MatchCount>,
    tier_hits: [u64; PRIZE_TIERS],
    failures: FailureCounts,
}

impl ConfigAccumulator {
    pub fn new(win_rule: WinRule) -> Self {
        Self {
            win_rule,
            evaluated: 0,
            sum_main: 0,
            sum_stars: 0,
            wins: 0,
            best: None,
            tier_hits: [0; PRIZE_TIERS],
            failures: FailureCounts::default(),
        }
    }

    pub fn record(&mut self, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Evaluated(m) => {
                self.evaluated += 1;
                self.sum_main += u64::from(m.main);
                self.sum_stars += u64::from(m.stars);
                if self.win_rule.is_win(m) {
                    self.wins += 1;
                }
                if let Some(tier) = PrizeTier::classify(m) {
                    self.tier_hits[tier.slot()] += 1;
                }
                self.best = self.best.max(Some(m));
            }
            UnitOutcome::Excluded(failure) => self.failures.record(failure),
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.evaluated += other.evaluated;
        self.sum_main += other.sum_main;
        self.sum_stars += other.sum_stars;
        self.wins += other.wins;
        self.best = self.best.max(other.best);
        for (a, b) in self.tier_hits.iter_mut().zip(other.tier_hits) {
            *a += b;
        }
        self.failures = self.failures.merge(other.failures);
        self
    }

    pub fn evaluated(&self) -> u64 {
        self.evaluated
    }

    pub fn excluded(&self) -> u64 {
        self.failures.total()
    }

    /// Mean composite score, or `None` if nothing was evaluated.
    pub fn mean_composite(&self, weights: &ScoringWeights) -> Option<f64> {
        (self.evaluated > 0).then(|| {
            (weights.main_weight * self.sum_main as f64
                + weights.star_weight * self.sum_stars as f64)
                / self.evaluated as f64
        })
    }

    pub fn stats(&self, weights: &ScoringWeights) -> Option<MatchStats> {
        let best = self.best?;
        let n = self.evaluated as f64;
        Some(MatchStats {
            mean_composite: self.mean_composite(weights)?,
            mean_main: self.sum_main as f64 / n,
            mean_stars: self.sum_stars as f64 / n,
            best,
            win_rate: self.wins as f64 / n,
            wins: self.wins,
            sum_main: self.sum_main,
            sum_stars: self.sum_stars,
            tier_hits: self.tier_hits,
        })
    }

    pub fn finish(
        self,
        seed: u64,
        strategy: Strategy,
        weights: &ScoringWeights,
    ) -> ConfigurationResult {
        ConfigurationResult {
            seed,
            strategy,
            evaluated_units: self.evaluated,
            excluded_units: self.failures.total(),
            failures: self.failures,
            stats: self.stats(weights),
        }
    }
}

/// Statistics over the evaluated units of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStats {
    pub mean_composite: f64,
    pub mean_main: f64,
    pub mean_stars: f64,
    /// Best single unit, ordered main first.
    pub best: MatchCount,
    pub win_rate: f64,
    pub wins: u64,
    pub sum_main: u64,
    pub sum_stars: u64,
    /// Hits per prize tier, index 0 = tier 1.
    pub tier_hits: [u64; PRIZE_TIERS],
}

/// Aggregated result for one (seed, strategy) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationResult {
    pub seed: u64,
    pub strategy: Strategy,
    pub evaluated_units: u64,
    pub excluded_units: u64,
    pub failures: FailureCounts,
    /// `None` when every unit was excluded.
    pub stats: Option<MatchStats>,
}

/// Whether a configuration was fully, partly, or not at all evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ok,
    Partial,
    AllFailed,
}

impl ResultStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Partial => "partial",
            Self::AllFailed => "all_failed",
        }
    }
}

impl ConfigurationResult {
    pub fn status(&self) -> ResultStatus {
        match (self.stats.is_some(), self.excluded_units) {
            (false, _) => ResultStatus::AllFailed,
            (true, 0) => ResultStatus::Ok,
            (true, _) => ResultStatus::Partial,
        }
    }

    pub fn is_all_failed(&self) -> bool {
        self.stats.is_none()
    }

    pub fn total_units(&self) -> u64 {
        self.evaluated_units + self.excluded_units
    }

    pub fn mean_composite(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.mean_composite)
    }
}
