// Prototype run: judge swarms over the full snapshot, then flag a seeded
// sample of rows. A cheap dry run for tuning thresholds on large data.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::FlagConfig;
use crate::flags::{self, FlagSummary, SwarmIndex};
use crate::ratings::table;
use crate::sample;

/// Outcome of a prototype run.
#[derive(Debug, Clone)]
pub struct PrototypeRun {
    pub full_rows: usize,
    pub summary: FlagSummary,
    /// Rows written, if an output path was given.
    pub rows_written: Option<usize>,
}

/// Read `input`, build the swarm index over every row, then flag `sample_n`
/// rows chosen with `seed`. Session and same-post flags see only the sample.
pub fn run(
    input: &Path,
    output: Option<&Path>,
    config: &FlagConfig,
    sample_n: usize,
    seed: u64,
) -> Result<PrototypeRun> {
    let pb = super::spinner(format!("Reading {}", input.display()));
    let full = table::read_ratings(input)
        .with_context(|| format!("Failed to load ratings from {}", input.display()));
    pb.finish_and_clear();
    let full = full?;

    // Swarm judgments need every rating of a note, so build them before sampling.
    let swarm = SwarmIndex::build(full.ratings(), config);
    info!(
        notes = swarm.note_count(),
        swarm_notes = swarm.swarm_note_count(),
        "Built swarm index over full snapshot"
    );

    let picked = sample::sample_indices(full.len(), sample_n, seed);
    let sampled = full
        .select_rows(&picked)
        .context("Failed to extract sampled rows")?;
    info!(full_rows = full.len(), sampled = sampled.len(), seed, "Sampled ratings");

    let report = flags::derive_flags_with_swarm(sampled.ratings(), &swarm, config);

    let rows_written = match output {
        Some(path) => Some(
            table::write_flagged(path, &sampled, &report.flags)
                .with_context(|| format!("Failed to write sample to {}", path.display()))?,
        ),
        None => None,
    };

    Ok(PrototypeRun {
        full_rows: full.len(),
        summary: report.summary,
        rows_written,
    })
}
