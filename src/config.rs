use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::TimeDelta;

/// Default session gap: consecutive ratings within this many minutes form a session.
pub const DEFAULT_SESSION_GAP_MIN: i64 = 5;
/// Default minimum number of ratings on one note for a swarm.
pub const DEFAULT_SWARM_MIN_RATINGS: usize = 20;
/// Default maximum first-to-last span (hours) of a swarm.
pub const DEFAULT_SWARM_WINDOW_HOURS: i64 = 1;
/// Default sample size for the prototype run.
pub const DEFAULT_SAMPLE_N: usize = 300_000;
/// Default RNG seed for the prototype sample.
pub const DEFAULT_SAMPLE_SEED: u64 = 42;

/// Thresholds handed to the flag deriver at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagConfig {
    /// Maximum gap (inclusive) to a neighboring rating by the same rater.
    pub session_gap: TimeDelta,
    /// Minimum rating count (inclusive) for a note to be a swarm.
    pub swarm_min_ratings: usize,
    /// Maximum span (inclusive) between a swarm note's first and last rating.
    pub swarm_window: TimeDelta,
}

impl Default for FlagConfig {
    fn default() -> Self {
        Self {
            session_gap: TimeDelta::minutes(DEFAULT_SESSION_GAP_MIN),
            swarm_min_ratings: DEFAULT_SWARM_MIN_RATINGS,
            swarm_window: TimeDelta::hours(DEFAULT_SWARM_WINDOW_HOURS),
        }
    }
}

impl FlagConfig {
    /// Build from the unit-bearing integers used on the command line and in env vars.
    pub fn from_units(
        session_gap_min: i64,
        swarm_min_ratings: usize,
        swarm_window_hours: i64,
    ) -> Result<Self> {
        if session_gap_min < 0 {
            anyhow::bail!("session gap must be non-negative, got {session_gap_min} minutes");
        }
        if swarm_min_ratings == 0 {
            anyhow::bail!("swarm minimum ratings must be at least 1");
        }
        if swarm_window_hours < 0 {
            anyhow::bail!("swarm window must be non-negative, got {swarm_window_hours} hours");
        }
        Ok(Self {
            session_gap: TimeDelta::try_minutes(session_gap_min)
                .with_context(|| format!("session gap of {session_gap_min} minutes is too large"))?,
            swarm_min_ratings,
            swarm_window: TimeDelta::try_hours(swarm_window_hours).with_context(|| {
                format!("swarm window of {swarm_window_hours} hours is too large")
            })?,
        })
    }
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy. Command-line flags
/// override anything read here.
pub struct Config {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub session_gap_min: i64,
    pub swarm_min_ratings: usize,
    pub swarm_window_hours: i64,
    pub sample_n: usize,
    pub sample_seed: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every value has a default; a set-but-unparseable number is an error.
    pub fn load() -> Result<Self> {
        Ok(Self {
            input_path: Self::input_path(),
            output_path: env::var("RATING_FLAGS_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("rating_flags.parquet")),
            session_gap_min: env_number("RATING_FLAGS_SESSION_GAP_MIN", DEFAULT_SESSION_GAP_MIN)?,
            swarm_min_ratings: env_number(
                "RATING_FLAGS_SWARM_MIN_RATINGS",
                DEFAULT_SWARM_MIN_RATINGS,
            )?,
            swarm_window_hours: env_number(
                "RATING_FLAGS_SWARM_WINDOW_HOURS",
                DEFAULT_SWARM_WINDOW_HOURS,
            )?,
            sample_n: env_number("RATING_FLAGS_SAMPLE_N", DEFAULT_SAMPLE_N)?,
            sample_seed: env_number("RATING_FLAGS_SAMPLE_SEED", DEFAULT_SAMPLE_SEED)?,
        })
    }

    /// Input snapshot path alone. `inspect` needs nothing else, so a bad
    /// threshold variable does not stop it.
    pub fn input_path() -> PathBuf {
        env::var("RATING_FLAGS_INPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("ratings.parquet"))
    }

    /// Thresholds after applying any command-line overrides.
    pub fn flag_config(
        &self,
        session_gap_min: Option<i64>,
        swarm_min_ratings: Option<usize>,
        swarm_window_hours: Option<i64>,
    ) -> Result<FlagConfig> {
        FlagConfig::from_units(
            session_gap_min.unwrap_or(self.session_gap_min),
            swarm_min_ratings.unwrap_or(self.swarm_min_ratings),
            swarm_window_hours.unwrap_or(self.swarm_window_hours),
        )
    }
}

fn env_number<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
