//! Engine error taxonomy.

use thiserror::Error;

use crate::domain::{Pool, TicketError};

/// Errors raised by the engine.
///
/// The first four are pre-sweep validation failures and abort a sweep before
/// any work is reported. Inside the hot loop, `MalformedDraw`,
/// `InvalidCandidate` and `InsufficientCandidates` abort only the unit that
/// hit them; the runner records and counts them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("score data unavailable: {0}")]
    DataUnavailable(String),

    #[error("malformed draw #{index}: {reason}")]
    MalformedDraw { index: usize, reason: TicketError },

    #[error("insufficient history: window of {requested} draws, {available} available")]
    InsufficientHistory { requested: usize, available: usize },

    #[error("insufficient candidates in {pool} pool: {positive} positive-weight ids, need {required}")]
    InsufficientCandidates {
        pool: Pool,
        positive: usize,
        required: usize,
    },

    #[error("invalid candidate: {0}")]
    InvalidCandidate(#[from] TicketError),

    #[error("configuration error: {0}")]
    Configuration(String),
}
