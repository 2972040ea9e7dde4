//! Reporting and export: JSON, CSV, and Markdown artifacts.
//!
//! - **JSON**: sweep and A/B reports with provenance (config fingerprint,
//!   snapshot digest, history digest) and schema versioning
//! - **CSV**: the ranked table, the full result table, and candidate lists
//! - **Markdown**: human-readable sweep and A/B summaries
//!
//! Persisted JSON carries a `schema_version`. Newer versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ticketlab_core::domain::ScoreSnapshot;
use ticketlab_core::error::EngineError;
use ticketlab_core::evaluator::PrizeTier;
use ticketlab_core::generator::{Generator, Strategy};

use crate::aggregate::ConfigurationResult;
use crate::comparator::{AbReport, ArmReport};
use crate::config::SweepConfig;
use crate::leaderboard::{Leaderboard, LeaderboardEntry};
use crate::sweep::SweepOutcome;

pub const SCHEMA_VERSION: u32 = 1;

// ─── Reports ────────────────────────────────────────────────────────

/// Persisted form of one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub config_fingerprint: String,
    pub snapshot_digest: String,
    pub history_digest: String,
    pub cancelled: bool,
    pub completed: usize,
    pub total_configurations: usize,
    pub first_draw: usize,
    pub last_draw: usize,
    pub units_per_configuration: u64,
    pub leaderboard: Leaderboard,
    /// Every completed configuration, in grid order.
    pub results: Vec<ConfigurationResult>,
}

impl SweepReport {
    pub fn new(outcome: &SweepOutcome, config: &SweepConfig, history_digest: &str) -> Result<Self> {
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            config_fingerprint: config
                .fingerprint()
                .context("failed to fingerprint sweep config")?,
            snapshot_digest: outcome.snapshot_digest.clone(),
            history_digest: history_digest.to_string(),
            cancelled: outcome.cancelled,
            completed: outcome.completed(),
            total_configurations: outcome.total_configurations,
            first_draw: outcome.first_draw,
            last_draw: outcome.last_draw,
            units_per_configuration: outcome.units_per_configuration,
            leaderboard: outcome.leaderboard(config.sweep.top_n),
            results: outcome.results.clone(),
        })
    }
}

/// Persisted form of one A/B comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbReportFile {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub config_fingerprint: String,
    pub history_digest: String,
    pub report: AbReport,
}

impl AbReportFile {
    pub fn new(report: AbReport, config: &SweepConfig, history_digest: &str) -> Result<Self> {
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            config_fingerprint: config
                .fingerprint()
                .context("failed to fingerprint sweep config")?,
            history_digest: history_digest.to_string(),
            report,
        })
    }
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_sweep_json(report: &SweepReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize SweepReport to JSON")
}

/// Deserialize a `SweepReport`, rejecting unknown schema versions.
pub fn import_sweep_json(json: &str) -> Result<SweepReport> {
    let report: SweepReport =
        serde_json::from_str(json).context("failed to deserialize SweepReport from JSON")?;
    check_schema(report.schema_version)?;
    Ok(report)
}

pub fn export_ab_json(file: &AbReportFile) -> Result<String> {
    serde_json::to_string_pretty(file).context("failed to serialize AbReportFile to JSON")
}

pub fn import_ab_json(json: &str) -> Result<AbReportFile> {
    let file: AbReportFile =
        serde_json::from_str(json).context("failed to deserialize AbReportFile from JSON")?;
    check_schema(file.schema_version)?;
    Ok(file)
}

fn check_schema(version: u32) -> Result<()> {
    if version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            version,
            SCHEMA_VERSION
        );
    }
    Ok(())
}

// ─── CSV export ─────────────────────────────────────────────────────

const RANKED_COLUMNS: [&str; 12] = [
    "rank",
    "seed",
    "strategy",
    "mean_composite",
    "mean_main",
    "mean_stars",
    "best_main",
    "best_stars",
    "win_rate",
    "evaluated_units",
    "excluded_units",
    "status",
];

/// Export the ranked table.
///
/// All-failed rows leave the score columns empty rather than writing zeros.
pub fn export_ranked_csv(board: &Leaderboard) -> Result<String> {
    write_ranked(board.entries())
}

/// Export every result, ranked, without the top-N cut.
pub fn export_results_csv(results: &[ConfigurationResult]) -> Result<String> {
    let board = Leaderboard::rank(results, results.len());
    write_ranked(board.entries())
}

fn write_ranked(entries: &[LeaderboardEntry]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(RANKED_COLUMNS)?;

    for e in entries {
        let r = &e.result;
        let score_cols = match &r.stats {
            Some(s) => [
                format!("{:.6}", s.mean_composite),
                format!("{:.6}", s.mean_main),
                format!("{:.6}", s.mean_stars),
                s.best.main.to_string(),
                s.best.stars.to_string(),
                format!("{:.6}", s.win_rate),
            ],
            None => Default::default(),
        };
        wtr.write_record([
            e.rank.to_string(),
            r.seed.to_string(),
            r.strategy.to_string(),
            score_cols[0].clone(),
            score_cols[1].clone(),
            score_cols[2].clone(),
            score_cols[3].clone(),
            score_cols[4].clone(),
            score_cols[5].clone(),
            r.evaluated_units.to_string(),
            r.excluded_units.to_string(),
            r.status().label().to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One generated ticket with the coordinates that reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub seed: u64,
    pub strategy: Strategy,
    pub draw_index: usize,
    pub ticket_index: usize,
    pub main: [u8; 5],
    pub stars: [u8; 2],
    /// Score-relative strength of the ticket, 0..=100.
    pub confidence: f64,
}

/// Generate `count` tickets for one draw index.
pub fn generate_candidates(
    snapshot: &ScoreSnapshot,
    strategy: Strategy,
    seed: u64,
    draw_index: usize,
    count: usize,
) -> Result<Vec<CandidateRecord>, EngineError> {
    let generator = Generator::new(snapshot, strategy)?;
    (0..count)
        .map(|ticket_index| {
            let ticket = generator.generate(seed, draw_index, ticket_index)?;
            Ok(CandidateRecord {
                seed,
                strategy,
                draw_index,
                ticket_index,
                main: *ticket.main(),
                stars: *ticket.stars(),
                confidence: snapshot.confidence(&ticket),
            })
        })
        .collect()
}

/// Columns: seed, strategy, draw_index, ticket_index, m1..m5, s1, s2, confidence
pub fn export_candidates_csv(records: &[CandidateRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "seed",
        "strategy",
        "draw_index",
        "ticket_index",
        "m1",
        "m2",
        "m3",
        "m4",
        "m5",
        "s1",
        "s2",
        "confidence",
    ])?;
    for c in records {
        let mut row = vec![
            c.seed.to_string(),
            c.strategy.to_string(),
            c.draw_index.to_string(),
            c.ticket_index.to_string(),
        ];
        row.extend(c.main.iter().chain(c.stars.iter()).map(u8::to_string));
        row.push(format!("{:.2}", c.confidence));
        wtr.write_record(&row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundles ───────────────────────────────────────────────

/// Save the artifact set for a sweep under `output_dir/sweep_{timestamp}/`:
/// - `report.json`: the full `SweepReport`
/// - `leaderboard.csv`: the top-N ranked table
/// - `results.csv`: every completed configuration, ranked
/// - `report.md`: Markdown summary
///
/// Returns the created directory.
pub fn save_sweep_artifacts(report: &SweepReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(format!(
        "sweep_{}",
        report.generated_at.format("%Y%m%d_%H%M%S")
    ));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write_file(&run_dir.join("report.json"), &export_sweep_json(report)?)?;
    write_file(
        &run_dir.join("leaderboard.csv"),
        &export_ranked_csv(&report.leaderboard)?,
    )?;
    write_file(
        &run_dir.join("results.csv"),
        &export_results_csv(&report.results)?,
    )?;
    write_file(&run_dir.join("report.md"), &generate_sweep_report(report))?;

    Ok(run_dir)
}

/// Load a `SweepReport` from an artifact directory's report.json.
pub fn load_sweep_artifacts(dir: &Path) -> Result<SweepReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_sweep_json(&json)
}

/// Save `ab_report.json` and `ab_report.md` under `output_dir/ab_{timestamp}/`.
pub fn save_ab_artifacts(file: &AbReportFile, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(format!("ab_{}", file.generated_at.format("%Y%m%d_%H%M%S")));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;
    write_file(&run_dir.join("ab_report.json"), &export_ab_json(file)?)?;
    write_file(&run_dir.join("ab_report.md"), &generate_ab_report(&file.report))?;
    Ok(run_dir)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Markdown reports ───────────────────────────────────────────────

pub fn generate_sweep_report(report: &SweepReport) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Sweep Report\n\n");
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Configurations | {} of {} |\n",
        report.completed, report.total_configurations
    ));
    if report.cancelled {
        md.push_str("| Status | **CANCELLED** |\n");
    }
    md.push_str(&format!(
        "| Draws | {} to {} |\n",
        report.first_draw, report.last_draw
    ));
    md.push_str(&format!(
        "| Units per configuration | {} |\n",
        report.units_per_configuration
    ));
    md.push_str(&format!("| Config | {} |\n", short(&report.config_fingerprint)));
    md.push_str(&format!("| Scores | {} |\n", short(&report.snapshot_digest)));
    md.push_str(&format!("| History | {} |\n", short(&report.history_digest)));
    md.push('\n');

    md.push_str("## Leaderboard\n\n");
    md.push_str(
        "| Rank | Seed | Strategy | Composite | Main | Stars | Best | Win Rate | Excluded |\n",
    );
    md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- | --- |\n");
    for e in report.leaderboard.entries() {
        let r = &e.result;
        match &r.stats {
            Some(s) => md.push_str(&format!(
                "| {} | {} | {} | {:.3} | {:.3} | {:.3} | {} | {:.1}% | {} |\n",
                e.rank,
                r.seed,
                r.strategy,
                s.mean_composite,
                s.mean_main,
                s.mean_stars,
                s.best,
                s.win_rate * 100.0,
                r.excluded_units
            )),
            None => md.push_str(&format!(
                "| {} | {} | {} | **ALL FAILED** | | | | | {} |\n",
                e.rank, r.seed, r.strategy, r.excluded_units
            )),
        }
    }
    md.push('\n');

    let excluded: Vec<&ConfigurationResult> =
        report.results.iter().filter(|r| r.excluded_units > 0).collect();
    if !excluded.is_empty() {
        md.push_str("## Excluded Units\n\n");
        for r in excluded {
            md.push_str(&format!(
                "- seed {} {}: {} excluded (malformed draw {}, invalid candidate {}, \
                 insufficient candidates {}, unexpected {})\n",
                r.seed,
                r.strategy,
                r.excluded_units,
                r.failures.malformed_draw,
                r.failures.invalid_candidate,
                r.failures.insufficient_candidates,
                r.failures.unexpected
            ));
        }
        md.push('\n');
    }

    if let Some(best) = report.leaderboard.best() {
        if let Some(s) = &best.result.stats {
            md.push_str("## Prize Tiers (best configuration)\n\n");
            md.push_str("| Tier | Match | Hits |\n");
            md.push_str("| --- | --- | --- |\n");
            for (slot, hits) in s.tier_hits.iter().enumerate() {
                if let Some(tier) = PrizeTier::from_slot(slot) {
                    md.push_str(&format!(
                        "| {} | {} | {} |\n",
                        tier.rank(),
                        tier.requirement(),
                        hits
                    ));
                }
            }
            md.push('\n');
        }
    }

    md
}

pub fn generate_ab_report(report: &AbReport) -> String {
    let mut md = String::with_capacity(1024);

    md.push_str("# A/B Comparison\n\n");
    md.push_str(&format!(
        "Test draws {} to {} ({} draws)",
        report.test_draws.first, report.test_draws.last, report.test_draws.len
    ));
    if let Some(c) = &report.calibration_draws {
        md.push_str(&format!(
            ", calibration draws {} to {} ({} draws)",
            c.first, c.last, c.len
        ));
    }
    md.push_str(".\n\n");

    md.push_str("| Arm | Seed | Strategy | Test Composite | Test Win Rate | Best | Calibration |\n");
    md.push_str("| --- | --- | --- | --- | --- | --- | --- |\n");
    md.push_str(&arm_row("A", &report.a));
    md.push_str(&arm_row("B", &report.b));
    md.push('\n');

    md.push_str(&format!(
        "**Winner: {}** (margin {:+.4}{})\n\n",
        report.winner,
        report.margin,
        if report.decisive { "" } else { ", tie" }
    ));

    let p = &report.paired;
    md.push_str("## Paired Draws\n\n");
    md.push_str("| A wins | B wins | Ties | Skipped | Mean difference |\n");
    md.push_str("| --- | --- | --- | --- | --- |\n");
    md.push_str(&format!(
        "| {} | {} | {} | {} | {} |\n",
        p.a_wins,
        p.b_wins,
        p.ties,
        p.skipped,
        p.mean_difference
            .map_or_else(|| "n/a".to_string(), |d| format!("{d:+.4}"))
    ));

    md
}

fn arm_row(label: &str, arm: &ArmReport) -> String {
    let test = arm.test.stats.as_ref();
    let calib = arm.calibration.as_ref().and_then(|c| c.mean_composite());
    format!(
        "| {} | {} | {} | {} | {} | {} | {} |\n",
        label,
        arm.seed,
        arm.strategy,
        test.map_or_else(|| "n/a".into(), |s| format!("{:.3}", s.mean_composite)),
        test.map_or_else(|| "n/a".into(), |s| format!("{:.1}%", s.win_rate * 100.0)),
        test.map_or_else(|| "n/a".into(), |s| s.best.to_string()),
        calib.map_or_else(|| "n/a".into(), |c| format!("{c:.3}")),
    )
}

fn short(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{ConfigAccumulator, UnitOutcome};
    use ticketlab_core::evaluator::{MatchCount, ScoringWeights, WinRule};
    use ticketlab_core::generator::StrategyKind;

    fn outcome() -> SweepOutcome {
        let mut good = ConfigAccumulator::new(WinRule::default());
        good.record(UnitOutcome::Evaluated(MatchCount::new(2, 1)));
        good.record(UnitOutcome::Evaluated(MatchCount::new(0, 0)));
        let empty = ConfigAccumulator::new(WinRule::default());
        let weights = ScoringWeights::default();
        SweepOutcome {
            results: vec![
                empty.finish(1, Strategy::WeightedRandom, &weights),
                good.finish(1, Strategy::TopK, &weights),
            ],
            total_configurations: 2,
            cancelled: false,
            snapshot_digest: "s".repeat(64),
            first_draw: 10,
            last_draw: 19,
            units_per_configuration: 2,
            elapsed_secs: 0.1,
        }
    }

    #[test]
    fn ranked_csv_has_expected_header_and_blank_failed_scores() {
        let out = outcome();
        let csv = export_ranked_csv(&out.leaderboard(10)).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), RANKED_COLUMNS.join(","));
        let first = lines.next().unwrap();
        assert!(first.starts_with("1,1,deterministic-top-k,12.500000,"));
        assert!(first.ends_with(",ok"));
        let second = lines.next().unwrap();
        assert_eq!(second, "2,1,weighted-random,,,,,,,0,0,all_failed");
    }

    #[test]
    fn sweep_json_rejects_future_schema() {
        let report = SweepReport::new(&outcome(), &SweepConfig::default(), "h").unwrap();
        let json = export_sweep_json(&report).unwrap();
        let back = import_sweep_json(&json).unwrap();
        assert_eq!(back.config_fingerprint, report.config_fingerprint);
        assert_eq!(back.results.len(), 2);
        assert_eq!(back.leaderboard.len(), 2);
        let bumped = json.replace("\"schema_version\": 1", "\"schema_version\": 99");
        assert!(import_sweep_json(&bumped).is_err());
    }

    #[test]
    fn candidates_are_reproducible_and_exported() {
        let snap = ScoreSnapshot::uniform();
        let strategy = Strategy::from_kind(StrategyKind::WeightedRandom, Default::default());
        let a = generate_candidates(&snap, strategy, 5, 100, 3).unwrap();
        let b = generate_candidates(&snap, strategy, 5, 100, 3).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        let csv = export_candidates_csv(&a).unwrap();
        assert_eq!(csv.lines().count(), 4);
        assert!(csv.lines().nth(1).unwrap().starts_with("5,weighted-random,100,0,"));
    }

    #[test]
    fn markdown_marks_all_failed() {
        let report = SweepReport::new(&outcome(), &SweepConfig::default(), "h").unwrap();
        let md = generate_sweep_report(&report);
        assert!(md.contains("**ALL FAILED**"));
        assert!(md.contains("## Prize Tiers"));
    }
}
