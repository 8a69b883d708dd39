// Rating sessions: a rater's ratings that sit close together in time.
//
// Groups rows by rater, orders each rater's rows by timestamp, and marks
// both ends of every consecutive pair whose gap is within the threshold.
// That is the same as checking each row's gap to its previous and next
// neighbor: an edge row only has one side to check, a lone row has none.

use std::collections::HashMap;

use chrono::TimeDelta;

use crate::ratings::RatingEvent;

/// One flag per input row: true if a neighboring rating by the same rater
/// is at most `gap` away.
///
/// Ties on timestamp are ordered by input row index, so the result does
/// not depend on hash or sort internals. Rows without a timestamp have no
/// position in the sequence and are never in a session.
pub fn session_flags(ratings: &[RatingEvent], gap: TimeDelta) -> Vec<bool> {
    let mut by_rater: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, r) in ratings.iter().enumerate() {
        if r.rated_at.is_some() {
            by_rater.entry(r.rater_id.as_str()).or_default().push(i);
        }
    }

    let mut flags = vec![false; ratings.len()];

    for rows in by_rater.values_mut() {
        rows.sort_unstable_by_key(|&i| (ratings[i].rated_at, i));

        for pair in rows.windows(2) {
            let (earlier, later) = (pair[0], pair[1]);
            if let (Some(a), Some(b)) = (ratings[earlier].rated_at, ratings[later].rated_at) {
                if b - a <= gap {
                    flags[earlier] = true;
                    flags[later] = true;
                }
            }
        }
    }

    flags
}
