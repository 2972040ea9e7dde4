//! Selection strategies and their parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Pool, MAIN_PICKS, STAR_PICKS};
use crate::error::EngineError;

/// Strategy name without parameters, as written in sweep configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    TopK,
    WeightedRandom,
    Hybrid,
    Diversified,
}

impl StrategyKind {
    /// Stable tag mixed into the per-unit seed derivation.
    pub fn tag(self) -> &'static str {
        match self {
            Self::TopK => "deterministic-top-k",
            Self::WeightedRandom => "weighted-random",
            Self::Hybrid => "hybrid-top-n-weighted",
            Self::Diversified => "diversified",
        }
    }

    pub fn all() -> [StrategyKind; 4] {
        [Self::TopK, Self::WeightedRandom, Self::Hybrid, Self::Diversified]
    }

    /// Strategies a sweep runs when its config names none.
    pub fn defaults() -> [StrategyKind; 3] {
        [Self::TopK, Self::WeightedRandom, Self::Hybrid]
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "top_k" | "topk" | "deterministic_top_k" => Some(Self::TopK),
            "weighted_random" | "random" | "weighted" => Some(Self::WeightedRandom),
            "hybrid" | "hybrid_top_n_weighted" => Some(Self::Hybrid),
            "diversified" | "diverse" => Some(Self::Diversified),
            _ => None,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Subset sizes for the hybrid strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridParams {
    /// Main ids kept before sampling (must exceed 5).
    pub main_top_n: usize,
    /// Star ids kept before sampling (must exceed 2).
    pub star_top_n: usize,
    /// Sample from the full pool when the subset has fewer than k positive
    /// weights. When false the strategy is rejected up front instead.
    pub widen_on_shortfall: bool,
}

impl Default for HybridParams {
    fn default() -> Self {
        Self {
            main_top_n: 12,
            star_top_n: 4,
            widen_on_shortfall: true,
        }
    }
}

impl HybridParams {
    pub fn top_n(&self, pool: Pool) -> usize {
        match pool {
            Pool::Main => self.main_top_n,
            Pool::Star => self.star_top_n,
        }
    }

    /// Require `k < N <= pool size` on both axes.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (pool, n, k) in [
            (Pool::Main, self.main_top_n, MAIN_PICKS),
            (Pool::Star, self.star_top_n, STAR_PICKS),
        ] {
            if n <= k || n > pool.size() {
                return Err(EngineError::Configuration(format!(
                    "hybrid {pool} top_n must be in {}..={}, got {n}",
                    k + 1,
                    pool.size()
                )));
            }
        }
        Ok(())
    }
}

/// A slice `start..end` of a pool's weight ranking (zero-based) and the
/// number of ids drawn from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankBand {
    pub start: usize,
    pub end: usize,
    pub picks: usize,
}

const DIVERSIFIED_MAIN: [RankBand; 2] = [
    RankBand {
        start: 0,
        end: 10,
        picks: 3,
    },
    RankBand {
        start: 10,
        end: 30,
        picks: 2,
    },
];

const DIVERSIFIED_STARS: [RankBand; 2] = [
    RankBand {
        start: 0,
        end: 1,
        picks: 1,
    },
    RankBand {
        start: 1,
        end: 6,
        picks: 1,
    },
];

/// Bands of the diversified strategy: 3 main ids from ranks 1-10 and 2 from
/// ranks 11-30; the best star and 1 star from ranks 2-6.
pub fn diversified_bands(pool: Pool) -> &'static [RankBand] {
    match pool {
        Pool::Main => &DIVERSIFIED_MAIN,
        Pool::Star => &DIVERSIFIED_STARS,
    }
}

/// A fully parameterised selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// The k highest-weighted ids; ties by ascending id. Ignores the seed.
    TopK,
    /// k ids drawn without replacement, proportional to weight.
    WeightedRandom,
    /// Weighted draw restricted to the N highest-weighted ids.
    Hybrid(HybridParams),
    /// Weighted draws from fixed rank bands, mixing favourites with
    /// mid-ranked ids.
    Diversified,
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::TopK => StrategyKind::TopK,
            Self::WeightedRandom => StrategyKind::WeightedRandom,
            Self::Hybrid(_) => StrategyKind::Hybrid,
            Self::Diversified => StrategyKind::Diversified,
        }
    }

    /// Build from a kind, taking hybrid parameters from `hybrid`.
    pub fn from_kind(kind: StrategyKind, hybrid: HybridParams) -> Self {
        match kind {
            StrategyKind::TopK => Self::TopK,
            StrategyKind::WeightedRandom => Self::WeightedRandom,
            StrategyKind::Hybrid => Self::Hybrid(hybrid),
            StrategyKind::Diversified => Self::Diversified,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.kind().tag()
    }

    /// Whether the seed influences the output.
    pub fn is_seeded(&self) -> bool {
        !matches!(self, Self::TopK)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        match self {
            Self::Hybrid(p) => p.validate(),
            Self::TopK | Self::WeightedRandom | Self::Diversified => Ok(()),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hybrid(p) => write!(f, "hybrid-top-{}/{}-weighted", p.main_top_n, p.star_top_n),
            other => f.write_str(other.tag()),
        }
    }
}
