// Batch pipelines: the full run and the sampled prototype run.
//
// Both read a snapshot, derive flags and optionally write the augmented
// table. They differ only in which rows get flagged.

pub mod full;
pub mod prototype;

use indicatif::{ProgressBar, ProgressStyle};

/// A spinner for steps with no meaningful progress count (whole-file reads and writes).
fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg} ({elapsed})")
            .expect("valid template"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}
