//! TicketLab Core: pools, tickets, draws, score snapshots, generation, evaluation.
//!
//! This crate holds everything that runs inside one evaluation unit:
//! - Domain types (pools, tickets, draws, score vectors and snapshots)
//! - Deterministic seed hierarchy (BLAKE3 sub-seeds feeding ChaCha8 streams)
//! - Candidate generation strategies (top-k, weighted random, hybrid)
//! - Match evaluation, composite scoring, win rule and prize tiers
//!
//! Sweeps, ranking and A/B comparison live in `ticketlab-runner`.

pub mod domain;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod rng;

pub use error::EngineError;
