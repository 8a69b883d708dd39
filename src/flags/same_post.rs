// Same-post interest: a rater returning to the same post through more
// than one rating anywhere in the snapshot.

use std::collections::HashMap;

use crate::ratings::RatingEvent;

/// True for every row whose (rater, post) pair occurs more than once.
pub fn same_post_flags(ratings: &[RatingEvent]) -> Vec<bool> {
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for r in ratings {
        *counts
            .entry((r.rater_id.as_str(), r.rated_on_target_id.as_str()))
            .or_default() += 1;
    }

    ratings
        .iter()
        .map(|r| counts[&(r.rater_id.as_str(), r.rated_on_target_id.as_str())] > 1)
        .collect()
}
