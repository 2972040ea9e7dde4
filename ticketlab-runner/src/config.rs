//! Serializable sweep configuration.
//!
//! A sweep is described by one TOML document:
//!
//! ```toml
//! [sweep]
//! seeds = [1, 2, 3]          # or seed_start / seed_count
//! strategies = ["top_k", "weighted_random", "hybrid"]  # "diversified" is opt-in
//! window = 50
//! tickets_per_draw = 5
//! top_n = 10
//! threads = 0                # 0 = rayon default
//!
//! [scoring]
//! main_weight = 10.0
//! star_weight = 5.0
//!
//! [win]
//! min_main = 2
//! min_stars = 0
//!
//! [hybrid]
//! main_top_n = 12
//! star_top_n = 4
//! widen_on_shortfall = true
//!
//! [ab]
//! test_window = 20
//! calibration_window = 30
//! a = { seed = 1, strategy = "hybrid" }
//! b = { seed = 1, strategy = "top_k" }
//! ```
//!
//! Every field has a default, so an empty document is a valid config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ticketlab_core::domain::{MAIN_PICKS, STAR_PICKS};
use ticketlab_core::error::EngineError;
use ticketlab_core::evaluator::{ScoringWeights, WinRule};
use ticketlab_core::generator::{HybridParams, Strategy, StrategyKind};

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] EngineError),
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(EngineError::Configuration(msg.into()))
}

/// Grid and window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSection {
    /// Explicit seed list. Takes precedence over `seed_start`/`seed_count`.
    pub seeds: Option<Vec<u64>>,
    pub seed_start: u64,
    pub seed_count: usize,
    pub strategies: Vec<StrategyKind>,
    /// Most recent draws evaluated per configuration (W).
    pub window: usize,
    /// Candidates generated per draw per configuration (T).
    pub tickets_per_draw: usize,
    /// Rows kept by the ranker.
    pub top_n: usize,
    /// Worker threads; 0 uses the global rayon pool.
    pub threads: usize,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            seeds: None,
            seed_start: 0,
            seed_count: 10,
            strategies: StrategyKind::defaults().to_vec(),
            window: 50,
            tickets_per_draw: 5,
            top_n: 10,
            threads: 0,
        }
    }
}

/// One side of an A/B comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmConfig {
    pub seed: u64,
    pub strategy: StrategyKind,
}

/// Train/test split and the two configurations to compare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbSection {
    /// Most recent draws held out for the comparison.
    pub test_window: usize,
    /// Draws immediately before the test window, reported for context.
    pub calibration_window: usize,
    pub a: ArmConfig,
    pub b: ArmConfig,
}

impl Default for AbSection {
    fn default() -> Self {
        Self {
            test_window: 20,
            calibration_window: 30,
            a: ArmConfig {
                seed: 0,
                strategy: StrategyKind::Hybrid,
            },
            b: ArmConfig {
                seed: 0,
                strategy: StrategyKind::TopK,
            },
        }
    }
}

/// Complete sweep configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub sweep: SweepSection,
    pub scoring: ScoringWeights,
    pub win: WinRule,
    pub hybrid: HybridParams,
    pub ab: AbSection,
}

impl SweepConfig {
    /// Load and validate a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Seeds in grid order.
    pub fn seeds(&self) -> Vec<u64> {
        match &self.sweep.seeds {
            Some(seeds) => seeds.clone(),
            None => (0..self.sweep.seed_count as u64)
                .map(|i| self.sweep.seed_start.wrapping_add(i))
                .collect(),
        }
    }

    /// Strategies in grid order, with hybrid parameters applied.
    pub fn strategies(&self) -> Vec<Strategy> {
        let mut kinds: Vec<StrategyKind> = Vec::with_capacity(self.sweep.strategies.len());
        for kind in &self.sweep.strategies {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
            .into_iter()
            .map(|k| Strategy::from_kind(k, self.hybrid))
            .collect()
    }

    /// The (seed, strategy) grid, seed-major.
    pub fn grid(&self) -> Vec<(u64, Strategy)> {
        let strategies = self.strategies();
        self.seeds()
            .into_iter()
            .flat_map(|seed| strategies.iter().map(move |s| (seed, *s)))
            .collect()
    }

    pub fn arm_a(&self) -> (u64, Strategy) {
        (
            self.ab.a.seed,
            Strategy::from_kind(self.ab.a.strategy, self.hybrid),
        )
    }

    pub fn arm_b(&self) -> (u64, Strategy) {
        (
            self.ab.b.seed,
            Strategy::from_kind(self.ab.b.strategy, self.hybrid),
        )
    }

    /// Check every value before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sweep;
        if self.seeds().is_empty() {
            return Err(invalid("seed set is empty"));
        }
        if let Some(seeds) = &s.seeds {
            let mut sorted = seeds.clone();
            sorted.sort_unstable();
            sorted.dedup();
            if sorted.len() != seeds.len() {
                return Err(invalid("seed list contains duplicates"));
            }
        }
        if s.strategies.is_empty() {
            return Err(invalid("strategy set is empty"));
        }
        if s.window == 0 {
            return Err(invalid("window must be at least 1 draw"));
        }
        if s.tickets_per_draw == 0 {
            return Err(invalid("tickets_per_draw must be at least 1"));
        }
        if s.top_n == 0 {
            return Err(invalid("top_n must be at least 1"));
        }
        if usize::from(self.win.min_main) > MAIN_PICKS
            || usize::from(self.win.min_stars) > STAR_PICKS
        {
            return Err(invalid(format!(
                "win threshold {}+{} exceeds {MAIN_PICKS}+{STAR_PICKS}",
                self.win.min_main, self.win.min_stars
            )));
        }
        self.scoring.validate()?;
        if s.strategies.contains(&StrategyKind::Hybrid)
            || self.ab.a.strategy == StrategyKind::Hybrid
            || self.ab.b.strategy == StrategyKind::Hybrid
        {
            self.hybrid.validate()?;
        }
        if self.ab.test_window == 0 {
            return Err(invalid("ab.test_window must be at least 1 draw"));
        }
        Ok(())
    }

    /// BLAKE3 digest of the canonical JSON form, recorded in every report.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}
