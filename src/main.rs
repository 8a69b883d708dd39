use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::{error, info};

use rating_flags::config::Config;
use rating_flags::error::FlagError;

/// rating-flags: behavioral flags for content-moderation ratings.
///
/// Adds session, same-post interest, notification and rater-swarm flags
/// to a Parquet snapshot of ratings.
#[derive(Parser)]
#[command(name = "rating-flags", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Threshold overrides shared by the flagging commands.
#[derive(Args)]
struct Thresholds {
    /// Max minutes between neighboring ratings of a session (default: 5)
    #[arg(long)]
    session_gap_min: Option<i64>,

    /// Min ratings on a note for a swarm (default: 20)
    #[arg(long)]
    swarm_min_ratings: Option<usize>,

    /// Max hours between a swarm's first and last rating (default: 1)
    #[arg(long)]
    swarm_window_hours: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show shape, column types, null counts and value ranges of a snapshot
    Inspect {
        /// Input Parquet file (default: RATING_FLAGS_INPUT or ratings.parquet)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Dry run: judge swarms on all rows, flag a seeded sample
    Sample {
        #[arg(long)]
        input: Option<PathBuf>,

        /// Rows to sample (default: RATING_FLAGS_SAMPLE_N or 300000)
        #[arg(short = 'n', long = "rows")]
        n: Option<usize>,

        /// Sampling seed (default: RATING_FLAGS_SAMPLE_SEED or 42)
        #[arg(long)]
        seed: Option<u64>,

        /// Also write the flagged sample to this Parquet file
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        thresholds: Thresholds,
    },

    /// Flag every row and write the augmented snapshot
    Run {
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output Parquet file (default: RATING_FLAGS_OUTPUT or rating_flags.parquet)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Fail on any rating without a timestamp instead of keeping it unflagged
        #[arg(long)]
        strict: bool,

        /// Print the summary as JSON instead of a table
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        thresholds: Thresholds,
    },
}

fn main() -> ExitCode {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rating_flags=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let class = e
                .downcast_ref::<FlagError>()
                .map(|f| f.class().as_str())
                .unwrap_or("fatal");
            error!(class, error = format!("{e:#}"), "Job failed");
            eprintln!("{} ({class} error): {e:#}", "Error".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Inspect { input } => {
            let input = input.unwrap_or_else(Config::input_path);
            info!(input = %input.display(), "Inspecting snapshot");

            let inspection = rating_flags::ratings::table::inspect(&input)?;
            rating_flags::output::terminal::display_inspection(
                &inspection,
                &input.display().to_string(),
            );
        }

        Commands::Sample {
            input,
            n,
            seed,
            output,
            thresholds,
        } => {
            let config = Config::load()?;
            let input = input.unwrap_or_else(|| config.input_path.clone());
            let flag_config = config.flag_config(
                thresholds.session_gap_min,
                thresholds.swarm_min_ratings,
                thresholds.swarm_window_hours,
            )?;
            let n = n.unwrap_or(config.sample_n);
            let seed = seed.unwrap_or(config.sample_seed);

            println!("Prototype run on {} (sample of {n}, seed {seed})...", input.display());

            let outcome = rating_flags::pipeline::prototype::run(
                &input,
                output.as_deref(),
                &flag_config,
                n,
                seed,
            )?;

            println!(
                "  Loaded {} rows, sampled {}",
                outcome.full_rows, outcome.summary.rows
            );
            rating_flags::output::terminal::display_summary(&outcome.summary);

            if let (Some(path), Some(rows)) = (output, outcome.rows_written) {
                println!("{}", format!("Saved {rows} sampled rows to {}", path.display()).bold());
            }
        }

        Commands::Run {
            input,
            output,
            strict,
            json,
            thresholds,
        } => {
            let config = Config::load()?;
            let input = input.unwrap_or_else(|| config.input_path.clone());
            let output = output.unwrap_or_else(|| config.output_path.clone());
            let flag_config = config.flag_config(
                thresholds.session_gap_min,
                thresholds.swarm_min_ratings,
                thresholds.swarm_window_hours,
            )?;

            let outcome =
                rating_flags::pipeline::full::run(&input, &output, &flag_config, strict)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
            } else {
                rating_flags::output::terminal::display_summary(&outcome.summary);
                println!(
                    "{}",
                    format!("Saved: {} ({} rows)", output.display(), outcome.rows_written).bold()
                );
            }
        }
    }

    Ok(())
}
