// Flag deriver: runs the four passes over one slice of ratings and
// zips their outputs into per-row flags.

use tracing::{info, warn};

use super::summary::FlagSummary;
use super::swarm::SwarmIndex;
use super::{notification, same_post, session};
use crate::config::FlagConfig;
use crate::error::{FlagError, Result};
use crate::ratings::schema::RATED_AT;
use crate::ratings::{RatingEvent, RatingFlags};

/// Per-row flags (indexed like the input) and the run's summary.
#[derive(Debug, Clone)]
pub struct FlagReport {
    pub flags: Vec<RatingFlags>,
    pub summary: FlagSummary,
}

/// Derive all four flags, judging swarms over the same ratings.
pub fn derive_flags(ratings: &[RatingEvent], config: &FlagConfig) -> FlagReport {
    let swarm = SwarmIndex::build(ratings, config);
    info!(
        notes = swarm.note_count(),
        swarm_notes = swarm.swarm_note_count(),
        "Built swarm index"
    );
    derive_flags_with_swarm(ratings, &swarm, config)
}

/// Derive all four flags using a swarm index built elsewhere.
///
/// Used when `ratings` is a sample: the index must come from the full
/// snapshot, since a note's swarm status depends on all of its ratings.
pub fn derive_flags_with_swarm(
    ratings: &[RatingEvent],
    swarm: &SwarmIndex,
    config: &FlagConfig,
) -> FlagReport {
    let sessions = session::session_flags(ratings, config.session_gap);
    let same_post = same_post::same_post_flags(ratings);
    let notified = notification::notification_flags(ratings);
    let swarmed = swarm.flags(ratings);

    let flags: Vec<RatingFlags> = (0..ratings.len())
        .map(|i| RatingFlags {
            is_rating_session: sessions[i],
            is_same_post_interest: same_post[i],
            is_notification: notified[i],
            is_rater_swarm: swarmed[i],
        })
        .collect();

    let summary = FlagSummary::compute(ratings, &flags, swarm);

    if summary.rows_missing_timestamp > 0 {
        warn!(
            rows = summary.rows_missing_timestamp,
            "Ratings without a timestamp were kept with time-based flags set to false"
        );
    }

    info!(
        rows = summary.rows,
        session_pct = format!("{:.2}", summary.is_rating_session.true_pct),
        same_post_pct = format!("{:.2}", summary.is_same_post_interest.true_pct),
        notification_pct = format!("{:.2}", summary.is_notification.true_pct),
        swarm_pct = format!("{:.2}", summary.is_rater_swarm.true_pct),
        "Derived flags"
    );

    FlagReport { flags, summary }
}

/// Fail if any rating lacks a timestamp. Used by strict runs before any flag is computed.
pub fn require_timestamps(ratings: &[RatingEvent]) -> Result<()> {
    let mut missing = ratings
        .iter()
        .enumerate()
        .filter(|(_, r)| r.rated_at.is_none())
        .map(|(i, _)| i);

    match missing.next() {
        None => Ok(()),
        Some(first_row) => Err(FlagError::NullValues {
            column: RATED_AT.to_string(),
            count: 1 + missing.count(),
            first_row,
        }),
    }
}
