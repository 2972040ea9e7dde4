//! TicketLab Runner: sweeps, ranking, A/B comparison, export.
//!
//! This crate builds on `ticketlab-core` to provide:
//! - TOML sweep configuration with validation and fingerprinting
//! - Score providers (static, uniform, historical frequency, CSV/JSON file)
//! - Draw history loading (plain and operator CSV layouts)
//! - Per-unit outcome aggregation with explicit failure counts
//! - The configuration sweep (rayon fold/reduce, cancellation, progress)
//! - The ranked leaderboard and the A/B comparator
//! - JSON, CSV, and Markdown export

pub mod aggregate;
pub mod comparator;
pub mod config;
pub mod export;
pub mod history;
pub mod leaderboard;
pub mod profiling;
pub mod scores;
pub mod sweep;

pub use aggregate::{
    run_unit, ConfigAccumulator, ConfigurationResult, FailureCounts, MatchStats, ResultStatus,
    UnitFailure, UnitOutcome,
};
pub use comparator::{
    run_ab, run_ab_with_provider, split_history, AbError, AbReport, AbSide, ArmReport, DrawRange,
    PairedSummary,
};
pub use config::{AbSection, ArmConfig, ConfigError, SweepConfig, SweepSection};
pub use export::{
    export_candidates_csv, export_ranked_csv, export_results_csv, generate_candidates,
    save_ab_artifacts, save_sweep_artifacts, AbReportFile, CandidateRecord, SweepReport,
    SCHEMA_VERSION,
};
pub use history::{DrawHistory, HistoryError};
pub use leaderboard::{compare_results, compare_scores, Leaderboard, LeaderboardEntry};
pub use scores::{
    FrequencyScores, ScoreError, ScoreFile, ScoreProvider, StaticScores, UniformScores,
};
pub use sweep::{run_sweep, run_sweep_with_provider, SweepError, SweepOutcome, SweepProgress};

#[cfg(test)]
mod send_sync_checks {
    use super::*;
    use ticketlab_core::generator::Generator;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn generator_is_shareable_across_workers() {
        assert_sync::<Generator<'static>>();
        assert_send::<Generator<'static>>();
    }

    #[test]
    fn accumulator_is_send_sync() {
        assert_send::<ConfigAccumulator>();
        assert_sync::<ConfigAccumulator>();
    }

    #[test]
    fn configuration_result_is_send_sync() {
        assert_send::<ConfigurationResult>();
        assert_sync::<ConfigurationResult>();
    }

    #[test]
    fn sweep_config_is_send_sync() {
        assert_send::<SweepConfig>();
        assert_sync::<SweepConfig>();
    }

    #[test]
    fn sweep_progress_is_send_sync() {
        assert_send::<SweepProgress>();
        assert_sync::<SweepProgress>();
    }

    #[test]
    fn leaderboard_is_send_sync() {
        assert_send::<Leaderboard>();
        assert_sync::<Leaderboard>();
    }

    #[test]
    fn ab_report_is_send_sync() {
        assert_send::<AbReport>();
        assert_sync::<AbReport>();
    }

    #[test]
    fn providers_are_send_sync() {
        assert_send::<ScoreFile>();
        assert_sync::<ScoreFile>();
        assert_send::<FrequencyScores<'static>>();
        assert_sync::<FrequencyScores<'static>>();
    }
}
