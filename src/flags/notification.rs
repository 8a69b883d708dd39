// Notification flag: a direct per-row mapping with no grouping.

use crate::ratings::RatingEvent;

/// `fromNotification` where recorded; a missing value counts as false.
pub fn notification_flags(ratings: &[RatingEvent]) -> Vec<bool> {
    ratings
        .iter()
        .map(|r| r.from_notification.unwrap_or(false))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_null_is_false() {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let ratings = vec![
            RatingEvent::new("n1", "t1", "r1", at).with_notification(Some(true)),
            RatingEvent::new("n2", "t1", "r1", at).with_notification(Some(false)),
            RatingEvent::new("n3", "t1", "r1", at).with_notification(None),
        ];
        assert_eq!(notification_flags(&ratings), vec![true, false, false]);
    }
}
