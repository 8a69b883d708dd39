// Full run: flag every row of the snapshot and write the augmented table.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::FlagConfig;
use crate::flags::{self, FlagSummary};
use crate::ratings::table;

/// Outcome of a full run.
#[derive(Debug, Clone)]
pub struct FullRun {
    pub summary: FlagSummary,
    pub rows_written: usize,
}

/// Read `input`, derive all flags over every row, and write `output`.
///
/// With `strict`, a null timestamp anywhere fails the run before any flag
/// is computed. Output rows keep the input order.
pub fn run(input: &Path, output: &Path, config: &FlagConfig, strict: bool) -> Result<FullRun> {
    let pb = super::spinner(format!("Reading {}", input.display()));
    let table = table::read_ratings(input)
        .with_context(|| format!("Failed to load ratings from {}", input.display()));
    pb.finish_and_clear();
    let table = table?;

    if strict {
        flags::require_timestamps(table.ratings()).context("Strict run rejected the input")?;
    }

    let report = flags::derive_flags(table.ratings(), config);

    let pb = super::spinner(format!("Writing {}", output.display()));
    let rows_written = table::write_flagged(output, &table, &report.flags)
        .with_context(|| format!("Failed to write flagged ratings to {}", output.display()));
    pb.finish_and_clear();
    let rows_written = rows_written?;

    info!(
        input_rows = table.len(),
        rows_written,
        output = %output.display(),
        "Full run complete"
    );

    Ok(FullRun {
        summary: report.summary,
        rows_written,
    })
}
