// Data models: the decoded form of one rating row and its derived flags.
//
// Identifiers are kept opaque: integer and string id columns are both
// normalised to strings so grouping never depends on the file's encoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One participant's rating of one note at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingEvent {
    /// The note (content item) being rated.
    pub note_id: String,
    /// The post the note is attached to.
    pub rated_on_target_id: String,
    /// The participant issuing the rating.
    pub rater_id: String,
    /// `None` only when the source row carries a null timestamp.
    pub rated_at: Option<DateTime<Utc>>,
    /// Whether a notification prompted the rating, if recorded.
    pub from_notification: Option<bool>,
}

impl RatingEvent {
    pub fn new(
        note_id: impl Into<String>,
        rated_on_target_id: impl Into<String>,
        rater_id: impl Into<String>,
        rated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            note_id: note_id.into(),
            rated_on_target_id: rated_on_target_id.into(),
            rater_id: rater_id.into(),
            rated_at: Some(rated_at),
            from_notification: None,
        }
    }

    pub fn with_notification(mut self, from_notification: Option<bool>) -> Self {
        self.from_notification = from_notification;
        self
    }
}

/// The four behavioral flags attached to a single row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingFlags {
    pub is_rating_session: bool,
    pub is_same_post_interest: bool,
    pub is_notification: bool,
    pub is_rater_swarm: bool,
}
