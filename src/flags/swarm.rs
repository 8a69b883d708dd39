// Rater swarms: notes that receive a burst of ratings in a short window.
//
// A swarm is a property of the note, judged over every rating of that note
// in the full snapshot. The index is therefore built once, before any
// sampling, and then looked up per row.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::config::FlagConfig;
use crate::ratings::RatingEvent;

/// Per-note aggregate over all of the note's dated ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteStats {
    /// Ratings with a timestamp. Undated ratings are not counted.
    pub rating_count: usize,
    pub first_rating: Option<DateTime<Utc>>,
    pub last_rating: Option<DateTime<Utc>>,
    pub is_rater_swarm: bool,
}

impl NoteStats {
    fn empty() -> Self {
        Self {
            rating_count: 0,
            first_rating: None,
            last_rating: None,
            is_rater_swarm: false,
        }
    }

    fn observe(&mut self, at: DateTime<Utc>) {
        self.rating_count += 1;
        self.first_rating = Some(self.first_rating.map_or(at, |t| t.min(at)));
        self.last_rating = Some(self.last_rating.map_or(at, |t| t.max(at)));
    }

    /// Time between the note's first and last rating.
    pub fn span(&self) -> Option<TimeDelta> {
        match (self.first_rating, self.last_rating) {
            (Some(first), Some(last)) => Some(last - first),
            _ => None,
        }
    }
}

/// Whether a note's aggregate meets the swarm thresholds (both inclusive).
pub fn is_swarm(stats: &NoteStats, config: &FlagConfig) -> bool {
    stats.rating_count >= config.swarm_min_ratings
        && stats.span().is_some_and(|span| span <= config.swarm_window)
}

/// Note-level swarm judgments, keyed by note id.
#[derive(Debug, Clone, Default)]
pub struct SwarmIndex {
    notes: HashMap<String, NoteStats>,
}

impl SwarmIndex {
    /// Aggregate every rating by note and judge each note once.
    pub fn build(ratings: &[RatingEvent], config: &FlagConfig) -> Self {
        let mut notes: HashMap<String, NoteStats> = HashMap::new();
        for r in ratings {
            let stats = notes
                .entry(r.note_id.clone())
                .or_insert_with(NoteStats::empty);
            if let Some(at) = r.rated_at {
                stats.observe(at);
            }
        }

        for stats in notes.values_mut() {
            stats.is_rater_swarm = is_swarm(stats, config);
        }

        Self { notes }
    }

    pub fn get(&self, note_id: &str) -> Option<&NoteStats> {
        self.notes.get(note_id)
    }

    /// Swarm judgment for a note; unknown notes are not swarms.
    pub fn is_swarm(&self, note_id: &str) -> bool {
        self.notes.get(note_id).is_some_and(|s| s.is_rater_swarm)
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn swarm_note_count(&self) -> usize {
        self.notes.values().filter(|s| s.is_rater_swarm).count()
    }

    /// Broadcast the note-level judgment onto each row.
    pub fn flags(&self, ratings: &[RatingEvent]) -> Vec<bool> {
        ratings.iter().map(|r| self.is_swarm(&r.note_id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn burst(note: &str, count: usize, step: TimeDelta) -> Vec<RatingEvent> {
        let start = Utc.with_ymd_and_hms(2026, 1, 25, 18, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                RatingEvent::new(
                    note,
                    "post",
                    format!("rater-{i}"),
                    start + step * i as i32,
                )
            })
            .collect()
    }

    #[test]
    fn test_dense_burst_is_a_swarm() {
        // 25 ratings, one every 100 seconds: span 40 minutes.
        let ratings = burst("N1", 25, TimeDelta::seconds(100));
        let index = SwarmIndex::build(&ratings, &FlagConfig::default());
        let stats = index.get("N1").unwrap();
        assert_eq!(stats.rating_count, 25);
        assert_eq!(stats.span(), Some(TimeDelta::minutes(40)));
        assert!(index.is_swarm("N1"));
    }

    #[test]
    fn test_slow_burst_is_not_a_swarm() {
        // 25 ratings over 3 hours.
        let ratings = burst("N2", 25, TimeDelta::seconds(450));
        let index = SwarmIndex::build(&ratings, &FlagConfig::default());
        assert_eq!(index.get("N2").unwrap().span(), Some(TimeDelta::hours(3)));
        assert!(!index.is_swarm("N2"));
    }

    #[test]
    fn test_too_few_ratings_is_not_a_swarm() {
        let ratings = burst("N3", 5, TimeDelta::minutes(2));
        let index = SwarmIndex::build(&ratings, &FlagConfig::default());
        assert!(!index.is_swarm("N3"));
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        // Exactly 20 ratings spanning exactly one hour.
        let step = TimeDelta::seconds(3600 / 19);
        let mut ratings = burst("N4", 19, step);
        let start = ratings[0].rated_at.unwrap();
        ratings.push(RatingEvent::new("N4", "post", "late", start + TimeDelta::hours(1)));
        let index = SwarmIndex::build(&ratings, &FlagConfig::default());
        assert_eq!(index.get("N4").unwrap().rating_count, 20);
        assert!(index.is_swarm("N4"));
    }

    #[test]
    fn test_unknown_note_is_not_a_swarm() {
        let index = SwarmIndex::default();
        assert!(!index.is_swarm("missing"));
    }

    #[test]
    fn test_undated_ratings_do_not_count() {
        let mut ratings = burst("N5", 20, TimeDelta::minutes(1));
        ratings[0].rated_at = None;
        let index = SwarmIndex::build(&ratings, &FlagConfig::default());
        assert_eq!(index.get("N5").unwrap().rating_count, 19);
        assert!(!index.is_swarm("N5"));
    }
}
