// Colored terminal output for snapshot inspections and flag summaries.

use colored::Colorize;

use crate::flags::{FlagCount, FlagSummary};
use crate::ratings::table::Inspection;

/// Widest cell shown in the head preview.
const HEAD_CELL_CHARS: usize = 24;

/// Display the schema and content overview of a snapshot.
pub fn display_inspection(inspection: &Inspection, path: &str) {
    println!("\n{}", format!("=== Snapshot: {path} ===").bold());
    println!(
        "  Shape: {} rows x {} columns",
        inspection.rows,
        inspection.columns.len()
    );

    println!("\n  {:<28} {:<36} {:>10}", "Column".dimmed(), "Type".dimmed(), "Nulls".dimmed());
    println!("  {}", "-".repeat(76).dimmed());
    for column in &inspection.columns {
        let nulls = if column.null_count > 0 {
            column.null_count.to_string().yellow()
        } else {
            column.null_count.to_string().normal()
        };
        println!("  {:<28} {:<36} {:>10}", column.name, column.data_type, nulls);
    }

    if inspection.missing_columns.is_empty() {
        println!("\n  {} all required columns present", "ok".green());
    } else {
        println!(
            "\n  {} missing required columns: {}",
            "!!".red().bold(),
            inspection.missing_columns.join(", ")
        );
    }

    if !inspection.head.is_empty() {
        println!("\n  Head:");
        let names: Vec<&str> = inspection.columns.iter().map(|c| c.name.as_str()).collect();
        for (i, row) in inspection.head.iter().enumerate() {
            let cells: Vec<String> = names
                .iter()
                .zip(row)
                .map(|(name, value)| {
                    format!("{}={}", name.dimmed(), clip_cell(value))
                })
                .collect();
            println!("    {}. {}", i, cells.join("  "));
        }
    }

    if let Some(counts) = inspection.notification_counts {
        println!("\n  fromNotification value counts:");
        println!("    true   {:>12}", counts.true_count);
        println!("    false  {:>12}", counts.false_count);
        println!("    null   {:>12}", counts.null_count);
    }

    match (inspection.first_rating, inspection.last_rating) {
        (Some(first), Some(last)) => println!("\n  Rating time range: {first} to {last}"),
        _ => println!("\n  Rating time range: {}", "unavailable".dimmed()),
    }
}

/// Cut a head cell to `HEAD_CELL_CHARS` characters, marking the cut with "...".
fn clip_cell(value: &str) -> String {
    match value.char_indices().nth(HEAD_CELL_CHARS) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}

/// Display the per-flag value counts and the "% True" summary of a run.
pub fn display_summary(summary: &FlagSummary) {
    println!(
        "\n{}",
        format!("=== Flags ({} rows, {} raters) ===", summary.rows, summary.raters).bold()
    );
    println!(
        "  Swarm notes: {} / {}",
        summary.swarm_notes, summary.notes
    );
    if summary.rows_missing_timestamp > 0 {
        println!(
            "  {} {} rows without a timestamp (time-based flags set to false)",
            "~".yellow(),
            summary.rows_missing_timestamp
        );
    }

    println!();
    println!(
        "  {:<24} {:>12} {:>12} {:>9}",
        "Flag".dimmed(),
        "True".dimmed(),
        "False".dimmed(),
        "% True".dimmed()
    );
    println!("  {}", "-".repeat(60).dimmed());
    for (name, count) in summary.by_column() {
        println!(
            "  {:<24} {:>12} {:>12} {:>8.2}%",
            name,
            count.true_count,
            count.false_count,
            count.true_pct
        );
    }
    println!();
    highlight_rare_flags(&summary.by_column());
}

/// Call out flags that never fire; usually a threshold or input problem.
fn highlight_rare_flags(counts: &[(&'static str, FlagCount)]) {
    for (name, count) in counts {
        if count.true_count == 0 && count.false_count > 0 {
            println!("  {} {} is never true", "~".yellow(), name);
        }
    }
}
