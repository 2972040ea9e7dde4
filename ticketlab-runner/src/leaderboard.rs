//! Ranked table of configuration results.
//!
//! Ordering chain, best first:
//! 1. configurations with at least one evaluated unit before all-failed ones
//! 2. mean composite score, descending
//! 3. win rate, descending
//! 4. best single-draw match, descending
//! 5. strategy, ascending
//! 6. seed, ascending
//!
//! Steps 1-4 decide which configuration scored better; 5-6 only make the
//! order total so that input order never leaks into the output.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::aggregate::ConfigurationResult;

/// Compare two results on score alone. `Less` means `a` ranks ahead of `b`.
pub fn compare_scores(a: &ConfigurationResult, b: &ConfigurationResult) -> Ordering {
    match (&a.stats, &b.stats) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(sa), Some(sb)) => sb
            .mean_composite
            .total_cmp(&sa.mean_composite)
            .then_with(|| sb.win_rate.total_cmp(&sa.win_rate))
            .then_with(|| sb.best.cmp(&sa.best)),
    }
}

/// Full ranking order: score, then strategy, then seed.
pub fn compare_results(a: &ConfigurationResult, b: &ConfigurationResult) -> Ordering {
    compare_scores(a, b)
        .then_with(|| a.strategy.cmp(&b.strategy))
        .then_with(|| a.seed.cmp(&b.seed))
}

/// One ranked row. Ranks start at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub result: ConfigurationResult,
}

/// Top-N view over a set of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
    /// Number of results that were ranked, including those cut by `top_n`.
    considered: usize,
}

impl Leaderboard {
    pub fn rank(results: &[ConfigurationResult], top_n: usize) -> Self {
        let mut sorted: Vec<&ConfigurationResult> = results.iter().collect();
        sorted.sort_by(|a, b| compare_results(a, b));
        let entries = sorted
            .into_iter()
            .take(top_n)
            .enumerate()
            .map(|(i, result)| LeaderboardEntry {
                rank: i + 1,
                result: result.clone(),
            })
            .collect();
        Self {
            entries,
            considered: results.len(),
        }
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn best(&self) -> Option<&LeaderboardEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn considered(&self) -> usize {
        self.considered
    }

    /// Entries whose every unit was excluded. They always sit at the bottom.
    pub fn all_failed(&self) -> impl Iterator<Item = &LeaderboardEntry> {
        self.entries.iter().filter(|e| e.result.is_all_failed())
    }
}
