//! TicketLab CLI: sweep, compare, and generate commands.
//!
//! Commands:
//! - `sweep`: run every (seed, strategy) configuration and print the ranked table
//! - `compare`: A/B comparison of the two configurations in the `[ab]` section
//! - `generate`: tickets for one draw index (the next draw by default)

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ticketlab_core::domain::Draw;
use ticketlab_core::generator::{Strategy, StrategyKind};
use ticketlab_runner::export::generate_ab_report;
use ticketlab_runner::profiling::time_stage;
use ticketlab_runner::{
    export_candidates_csv, generate_candidates, run_ab_with_provider, run_sweep_with_provider,
    save_ab_artifacts, save_sweep_artifacts, AbReport, AbReportFile, DrawHistory,
    FrequencyScores, Leaderboard, ScoreFile, ScoreProvider, SweepConfig, SweepProgress,
    SweepReport, UniformScores,
};

#[derive(Parser)]
#[command(
    name = "ticketlab",
    about = "TicketLab CLI: reproducible ticket generation and backtesting"
)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where the score snapshot comes from. Uniform weights when neither is given.
#[derive(Args)]
struct ScoreArgs {
    /// Score file (.csv with pool,id,weight or .json with main/stars arrays).
    #[arg(long, conflicts_with = "frequency")]
    scores: Option<PathBuf>,

    /// Derive scores from appearance counts over the last N draws.
    #[arg(long)]
    frequency: Option<usize>,

    /// Additive smoothing for --frequency.
    #[arg(long, default_value_t = 1.0)]
    smoothing: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a configuration sweep and print the ranked table.
    Sweep {
        /// Path to the TOML sweep config.
        #[arg(long)]
        config: PathBuf,

        /// Draw history CSV.
        #[arg(long)]
        history: PathBuf,

        #[command(flatten)]
        scores: ScoreArgs,

        /// Save report.json, leaderboard.csv, results.csv and report.md here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Compare the `[ab]` configurations on a held-out window.
    Compare {
        /// Path to the TOML sweep config.
        #[arg(long)]
        config: PathBuf,

        /// Draw history CSV.
        #[arg(long)]
        history: PathBuf,

        #[command(flatten)]
        scores: ScoreArgs,

        /// Save ab_report.json and ab_report.md here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Generate tickets for one draw.
    Generate {
        /// Base seed.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Strategy: top_k, weighted_random, hybrid or diversified.
        #[arg(long, default_value = "hybrid")]
        strategy: String,

        /// Number of tickets.
        #[arg(long, default_value_t = 5)]
        count: usize,

        /// Draw index to generate for. Defaults to the draw after the history.
        #[arg(long)]
        draw_index: Option<usize>,

        /// Draw history CSV (needed for --frequency and the default draw index).
        #[arg(long)]
        history: Option<PathBuf>,

        /// TOML config supplying [hybrid] parameters.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        scores: ScoreArgs,

        /// Write the tickets as CSV.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Sweep {
            config,
            history,
            scores,
            output_dir,
        } => run_sweep_cmd(&config, &history, &scores, output_dir.as_deref()),
        Commands::Compare {
            config,
            history,
            scores,
            output_dir,
        } => run_compare_cmd(&config, &history, &scores, output_dir.as_deref()),
        Commands::Generate {
            seed,
            strategy,
            count,
            draw_index,
            history,
            config,
            scores,
            output,
        } => run_generate_cmd(
            seed,
            &strategy,
            count,
            draw_index,
            history.as_deref(),
            config.as_deref(),
            &scores,
            output.as_deref(),
        ),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_provider<'a>(
    args: &ScoreArgs,
    history: &'a [Draw],
) -> Result<Box<dyn ScoreProvider + 'a>> {
    match (&args.scores, args.frequency) {
        (Some(_), Some(_)) => bail!("--scores and --frequency are mutually exclusive"),
        (Some(path), None) => Ok(Box::new(ScoreFile::new(path))),
        (None, Some(lookback)) => {
            if history.is_empty() {
                bail!("--frequency needs a draw history");
            }
            Ok(Box::new(FrequencyScores::new(history, lookback, args.smoothing)))
        }
        (None, None) => {
            warn!("no --scores or --frequency given; using uniform weights");
            Ok(Box::new(UniformScores))
        }
    }
}

fn load_history(path: &Path) -> Result<DrawHistory> {
    let (loaded, elapsed) = time_stage("load_history", || DrawHistory::load(path));
    let history =
        loaded.with_context(|| format!("failed to load history {}", path.display()))?;
    info!(
        draws = history.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "history loaded"
    );
    if history.malformed_count() > 0 {
        warn!(
            malformed = history.malformed_count(),
            "history contains malformed draws"
        );
    }
    Ok(history)
}

fn run_sweep_cmd(
    config_path: &Path,
    history_path: &Path,
    score_args: &ScoreArgs,
    output_dir: Option<&Path>,
) -> Result<()> {
    let config = SweepConfig::load(config_path)?;
    let history = load_history(history_path)?;
    let provider = build_provider(score_args, history.draws())?;

    let progress = |p: &SweepProgress| {
        eprint!(
            "\r[{}/{}] seed {} {:<24}",
            p.completed,
            p.total,
            p.seed,
            p.strategy.to_string()
        );
    };
    let outcome = run_sweep_with_provider(
        &config,
        provider.as_ref(),
        history.draws(),
        Some(&progress),
        None,
    )?;
    eprintln!();

    let board = outcome.leaderboard(config.sweep.top_n);
    print_leaderboard(&board);
    println!(
        "{} of {} configurations, draws {} to {}, {:.2}s",
        outcome.completed(),
        outcome.total_configurations,
        outcome.first_draw,
        outcome.last_draw,
        outcome.elapsed_secs
    );

    if let Some(dir) = output_dir {
        let report = SweepReport::new(&outcome, &config, &history.digest())?;
        let run_dir = save_sweep_artifacts(&report, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_compare_cmd(
    config_path: &Path,
    history_path: &Path,
    score_args: &ScoreArgs,
    output_dir: Option<&Path>,
) -> Result<()> {
    let config = SweepConfig::load(config_path)?;
    let history = load_history(history_path)?;
    let provider = build_provider(score_args, history.draws())?;

    let report = run_ab_with_provider(&config, provider.as_ref(), history.draws())?;
    print_ab(&report);

    if let Some(dir) = output_dir {
        let file = AbReportFile::new(report, &config, &history.digest())?;
        let run_dir = save_ab_artifacts(&file, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_generate_cmd(
    seed: u64,
    strategy: &str,
    count: usize,
    draw_index: Option<usize>,
    history_path: Option<&Path>,
    config_path: Option<&Path>,
    score_args: &ScoreArgs,
    output: Option<&Path>,
) -> Result<()> {
    let kind = StrategyKind::parse(strategy).ok_or_else(|| {
        anyhow!("unknown strategy {strategy:?} (top_k, weighted_random, hybrid, diversified)")
    })?;
    let hybrid = match config_path {
        Some(path) => SweepConfig::load(path)?.hybrid,
        None => Default::default(),
    };
    let strategy = Strategy::from_kind(kind, hybrid);
    strategy.validate()?;

    let history = history_path.map(load_history).transpose()?;
    let draws = history.as_ref().map_or(&[][..], |h| h.draws());
    let draw_index = draw_index
        .or_else(|| history.as_ref().map(DrawHistory::next_index))
        .unwrap_or(0);

    let snapshot = build_provider(score_args, draws)?.snapshot()?;
    info!(digest = %snapshot.digest(), draw_index, "generating tickets");

    let records = generate_candidates(&snapshot, strategy, seed, draw_index, count)?;
    println!("{strategy} seed {seed} draw {draw_index}");
    for r in &records {
        let main: Vec<String> = r.main.iter().map(|id| format!("{id:02}")).collect();
        let stars: Vec<String> = r.stars.iter().map(|id| format!("{id:02}")).collect();
        println!(
            "  #{:<3} {} | {}  {:>6.2}%",
            r.ticket_index,
            main.join(" "),
            stars.join(" "),
            r.confidence
        );
    }

    if let Some(path) = output {
        std::fs::write(path, export_candidates_csv(&records)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Tickets saved to: {}", path.display());
    }
    Ok(())
}

fn print_leaderboard(board: &Leaderboard) {
    println!();
    println!(
        "{:<5} {:>6} {:<24} {:>9} {:>6} {:>6} {:>5} {:>7} {:>9} {:<10}",
        "Rank",
        "Seed",
        "Strategy",
        "Composite",
        "Main",
        "Stars",
        "Best",
        "Win%",
        "Excluded",
        "Status"
    );
    println!("{}", "-".repeat(96));
    for e in board.entries() {
        let r = &e.result;
        match &r.stats {
            Some(s) => println!(
                "{:<5} {:>6} {:<24} {:>9.3} {:>6.3} {:>6.3} {:>5} {:>6.1}% {:>9} {:<10}",
                e.rank,
                r.seed,
                r.strategy.to_string(),
                s.mean_composite,
                s.mean_main,
                s.mean_stars,
                s.best.to_string(),
                s.win_rate * 100.0,
                r.excluded_units,
                r.status().label()
            ),
            None => println!(
                "{:<5} {:>6} {:<24} {:>9} {:>6} {:>6} {:>5} {:>7} {:>9} {:<10}",
                e.rank,
                r.seed,
                r.strategy.to_string(),
                "ALL FAILED",
                "-",
                "-",
                "-",
                "-",
                r.excluded_units,
                r.status().label()
            ),
        }
    }
    let failed = board.all_failed().count();
    if failed > 0 {
        println!();
        println!("WARNING: {failed} configuration(s) had every unit excluded");
    }
    println!();
}

fn print_ab(report: &AbReport) {
    println!();
    print!("{}", generate_ab_report(report));
    println!();
}
