//! Pools: the two fixed id ranges a ticket draws from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the main pool (ids 1..=50).
pub const MAIN_POOL_SIZE: usize = 50;
/// Number of main ids on a ticket.
pub const MAIN_PICKS: usize = 5;
/// Size of the star pool (ids 1..=12).
pub const STAR_POOL_SIZE: usize = 12;
/// Number of star ids on a ticket.
pub const STAR_PICKS: usize = 2;

/// One axis of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    Main,
    Star,
}

impl Pool {
    /// Number of valid ids in this pool.
    pub fn size(self) -> usize {
        match self {
            Self::Main => MAIN_POOL_SIZE,
            Self::Star => STAR_POOL_SIZE,
        }
    }

    /// Number of ids a ticket picks from this pool.
    pub fn picks(self) -> usize {
        match self {
            Self::Main => MAIN_PICKS,
            Self::Star => STAR_PICKS,
        }
    }

    /// Whether `id` lies in `1..=size`.
    pub fn contains(self, id: u8) -> bool {
        id >= 1 && usize::from(id) <= self.size()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Star => "star",
        }
    }

    /// Parse a pool label as used in score files (`main`/`star`/`stars`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" | "ball" | "balls" => Some(Self::Main),
            "star" | "stars" => Some(Self::Star),
            _ => None,
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
