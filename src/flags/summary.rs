// Flag summary: the aggregate facts a run reports: sizes, group counts,
// and how often each flag fires.

use std::collections::HashSet;

use serde::Serialize;

use super::swarm::SwarmIndex;
use crate::ratings::schema::{
    IS_NOTIFICATION, IS_RATER_SWARM, IS_RATING_SESSION, IS_SAME_POST_INTEREST,
};
use crate::ratings::{RatingEvent, RatingFlags};

/// True/false tally for one flag column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FlagCount {
    pub true_count: usize,
    pub false_count: usize,
    /// Share of rows flagged true, 0.0-100.0. Zero for an empty table.
    pub true_pct: f64,
}

impl FlagCount {
    fn tally(values: impl Iterator<Item = bool>) -> Self {
        let (mut true_count, mut false_count) = (0, 0);
        for v in values {
            if v {
                true_count += 1;
            } else {
                false_count += 1;
            }
        }
        let total = true_count + false_count;
        let true_pct = if total == 0 {
            0.0
        } else {
            true_count as f64 * 100.0 / total as f64
        };
        Self {
            true_count,
            false_count,
            true_pct,
        }
    }
}

/// What one derivation run found.
#[derive(Debug, Clone, Serialize)]
pub struct FlagSummary {
    pub rows: usize,
    pub raters: usize,
    /// Notes in the swarm index (the full population when sampling).
    pub notes: usize,
    pub swarm_notes: usize,
    /// Rows kept with a null timestamp; never in a session, not counted in swarms.
    pub rows_missing_timestamp: usize,
    pub is_rating_session: FlagCount,
    pub is_same_post_interest: FlagCount,
    pub is_notification: FlagCount,
    pub is_rater_swarm: FlagCount,
}

impl FlagSummary {
    pub fn compute(ratings: &[RatingEvent], flags: &[RatingFlags], swarm: &SwarmIndex) -> Self {
        let raters: HashSet<&str> = ratings.iter().map(|r| r.rater_id.as_str()).collect();

        Self {
            rows: ratings.len(),
            raters: raters.len(),
            notes: swarm.note_count(),
            swarm_notes: swarm.swarm_note_count(),
            rows_missing_timestamp: ratings.iter().filter(|r| r.rated_at.is_none()).count(),
            is_rating_session: FlagCount::tally(flags.iter().map(|f| f.is_rating_session)),
            is_same_post_interest: FlagCount::tally(
                flags.iter().map(|f| f.is_same_post_interest),
            ),
            is_notification: FlagCount::tally(flags.iter().map(|f| f.is_notification)),
            is_rater_swarm: FlagCount::tally(flags.iter().map(|f| f.is_rater_swarm)),
        }
    }

    /// Flag counts paired with their output column names, in column order.
    pub fn by_column(&self) -> [(&'static str, FlagCount); 4] {
        [
            (IS_RATING_SESSION, self.is_rating_session),
            (IS_SAME_POST_INTEREST, self.is_same_post_interest),
            (IS_NOTIFICATION, self.is_notification),
            (IS_RATER_SWARM, self.is_rater_swarm),
        ]
    }
}
