//! Match evaluation: intersection counts between a ticket and a draw.
//!
//! Also holds the documented scoring knobs layered on top of the raw counts:
//! the composite score weights, the win rule, and the prize tier table.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Draw, Pool, Ticket, MAIN_PICKS, STAR_PICKS};
use crate::error::EngineError;

/// Matched ids per axis. Ordered lexicographically by (main, stars).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MatchCount {
    pub main: u8,
    pub stars: u8,
}

impl MatchCount {
    pub fn new(main: u8, stars: u8) -> Self {
        Self { main, stars }
    }

    /// Every id matched.
    pub fn is_jackpot(&self) -> bool {
        usize::from(self.main) == MAIN_PICKS && usize::from(self.stars) == STAR_PICKS
    }
}

impl fmt::Display for MatchCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.main, self.stars)
    }
}

/// Count matches between a ticket and a draw.
///
/// Fails only with `MalformedDraw` when the draw is not 5 distinct main ids in
/// 1..=50 plus 2 distinct star ids in 1..=12. Counts are set-intersection
/// sizes and do not depend on the order of ids in either input.
pub fn evaluate(ticket: &Ticket, draw: &Draw) -> Result<MatchCount, EngineError> {
    draw.validate().map_err(|reason| EngineError::MalformedDraw {
        index: draw.index,
        reason,
    })?;
    Ok(MatchCount {
        main: overlap(ticket, draw, Pool::Main),
        stars: overlap(ticket, draw, Pool::Star),
    })
}

fn overlap(ticket: &Ticket, draw: &Draw, pool: Pool) -> u8 {
    let drawn = draw
        .ids(pool)
        .iter()
        .fold(0u64, |acc, &id| acc | (1u64 << id));
    (ticket.mask(pool) & drawn).count_ones() as u8
}

/// Weights combining main and star matches into one composite score.
///
/// `composite = main_weight * main + star_weight * stars`. The defaults
/// (10 per main, 5 per star) are a convention, not a calibrated value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub main_weight: f64,
    pub star_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            main_weight: 10.0,
            star_weight: 5.0,
        }
    }
}

impl ScoringWeights {
    pub fn composite(&self, m: MatchCount) -> f64 {
        self.main_weight * f64::from(m.main) + self.star_weight * f64::from(m.stars)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, w) in [("main_weight", self.main_weight), ("star_weight", self.star_weight)] {
            if !w.is_finite() || w < 0.0 {
                return Err(EngineError::Configuration(format!(
                    "scoring {name} must be finite and non-negative, got {w}"
                )));
            }
        }
        Ok(())
    }
}

/// Threshold a unit must meet on both axes to count as a win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinRule {
    pub min_main: u8,
    pub min_stars: u8,
}

impl Default for WinRule {
    fn default() -> Self {
        Self {
            min_main: 2,
            min_stars: 0,
        }
    }
}

impl WinRule {
    pub fn is_win(&self, m: MatchCount) -> bool {
        m.main >= self.min_main && m.stars >= self.min_stars
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if usize::from(self.min_main) > MAIN_PICKS || usize::from(self.min_stars) > STAR_PICKS {
            return Err(EngineError::Configuration(format!(
                "win threshold {}+{} exceeds ticket size {MAIN_PICKS}+{STAR_PICKS}",
                self.min_main, self.min_stars
            )));
        }
        Ok(())
    }
}

/// Number of ranked prize tiers.
pub const PRIZE_TIERS: usize = 12;

/// Ranked prize tier, 1 (all matched) through 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrizeTier(u8);

impl PrizeTier {
    /// (main, stars) required for each tier, best first.
    const TABLE: [(u8, u8); PRIZE_TIERS] = [
        (5, 2),
        (5, 1),
        (5, 0),
        (4, 2),
        (4, 1),
        (3, 2),
        (4, 0),
        (2, 2),
        (3, 1),
        (3, 0),
        (1, 2),
        (2, 1),
    ];

    /// Tier for a match count, or `None` below the lowest tier.
    pub fn classify(m: MatchCount) -> Option<Self> {
        Self::TABLE
            .iter()
            .position(|&(main, stars)| m.main == main && m.stars == stars)
            .map(|i| Self(i as u8 + 1))
    }

    /// Inverse of [`PrizeTier::slot`].
    pub fn from_slot(slot: usize) -> Option<Self> {
        (slot < PRIZE_TIERS).then(|| Self(slot as u8 + 1))
    }

    pub fn rank(&self) -> u8 {
        self.0
    }

    /// Zero-based slot for histograms.
    pub fn slot(&self) -> usize {
        usize::from(self.0) - 1
    }

    pub fn requirement(&self) -> MatchCount {
        let (main, stars) = Self::TABLE[self.slot()];
        MatchCount { main, stars }
    }
}

impl fmt::Display for PrizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {} ({})", self.0, self.requirement())
    }
}
