use chrono::{DateTime, Duration, Months, Utc};

use crate::models::{RecurrencePattern, Reminder};

/// Selects reminders due in the interval `(now, now + horizon]`. A reminder
/// due exactly at `now` is not selected; one due exactly at the end of the
/// horizon is.
pub fn select_due(reminders: &[Reminder], now: DateTime<Utc>, horizon: Duration) -> Vec<Reminder> {
    let deadline = now + horizon;
    let mut due = Vec::new();
    for reminder in reminders {
        match reminder.due_instant() {
            Some(at) if at > now && at <= deadline => due.push(reminder.clone()),
            Some(_) => {}
            None => {
                tracing::warn!(reminder = %reminder.id, "reminder has no parseable due instant, skipping");
            }
        }
    }
    due
}

/// Next firing of a recurring reminder. Monthly and yearly advancement clamp
/// to the last valid day of the resulting month.
pub fn next_occurrence(current: DateTime<Utc>, pattern: RecurrencePattern) -> DateTime<Utc> {
    match pattern {
        RecurrencePattern::Daily => current + Duration::days(1),
        RecurrencePattern::Weekly => current + Duration::days(7),
        RecurrencePattern::Monthly => current + Months::new(1),
        RecurrencePattern::Yearly => current + Months::new(12),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn reminder_at(due_date: Option<&str>, due_time: Option<&str>) -> Reminder {
        Reminder {
            id: Uuid::new_v4(),
            title: "Weekly pipeline review".to_string(),
            description: None,
            due_date: due_date.map(str::to_string),
            due_time: due_time.map(str::to_string),
            is_active: true,
            is_recurring: false,
            recurrence_pattern: None,
            user_id: Uuid::new_v4(),
            user_email: "jules.moreno@example.com".to_string(),
            user_first_name: "Jules".to_string(),
            user_last_name: "Moreno".to_string(),
        }
    }

    #[test]
    fn due_interval_is_open_below_and_closed_above() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let horizon = Duration::minutes(5);

        let at_now = reminder_at(None, Some("2024-06-10T09:00:00Z"));
        assert!(select_due(&[at_now], now, horizon).is_empty());

        let at_deadline = reminder_at(None, Some("2024-06-10T09:05:00Z"));
        assert_eq!(select_due(&[at_deadline], now, horizon).len(), 1);

        let past_deadline = reminder_at(None, Some("2024-06-10T09:05:00.001Z"));
        assert!(select_due(&[past_deadline], now, horizon).is_empty());
    }

    #[test]
    fn split_and_combined_encodings_agree() {
        let split = reminder_at(Some("2024-01-01"), Some("14:00:00"));
        let combined = reminder_at(None, Some("2024-01-01T14:00:00Z"));
        let naive_combined = reminder_at(None, Some("2024-01-01T14:00:00"));

        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap();
        assert_eq!(split.due_instant(), Some(expected));
        assert_eq!(combined.due_instant(), Some(expected));
        assert_eq!(naive_combined.due_instant(), Some(expected));

        let now = expected - Duration::minutes(3);
        let horizon = Duration::minutes(5);
        let due = select_due(&[split, combined, naive_combined], now, horizon);
        assert_eq!(due.len(), 3);
    }

    #[test]
    fn unparseable_due_fields_are_never_selected() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let horizon = Duration::minutes(5);

        let garbage = reminder_at(None, Some("soon"));
        assert_eq!(garbage.due_instant(), None);

        let date_only = reminder_at(Some("2024-06-10"), None);
        assert_eq!(date_only.due_instant(), None);

        assert!(select_due(&[garbage, date_only], now, horizon).is_empty());
    }

    #[test]
    fn daily_advancement_composes() {
        let start = Utc.with_ymd_and_hms(2024, 6, 10, 9, 3, 0).unwrap();
        let once = next_occurrence(start, RecurrencePattern::Daily);
        assert_eq!(
            next_occurrence(once, RecurrencePattern::Daily),
            once + Duration::days(1)
        );
    }

    #[test]
    fn monthly_clamps_to_the_last_valid_day() {
        let jan31 = Utc.with_ymd_and_hms(2024, 1, 31, 8, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(jan31, RecurrencePattern::Monthly),
            Utc.with_ymd_and_hms(2024, 2, 29, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn yearly_clamps_leap_day() {
        let feb29 = Utc.with_ymd_and_hms(2024, 2, 29, 8, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(feb29, RecurrencePattern::Yearly),
            Utc.with_ymd_and_hms(2025, 2, 28, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn unknown_patterns_fall_back_to_daily() {
        assert_eq!(
            RecurrencePattern::parse(Some("fortnightly")),
            RecurrencePattern::Daily
        );
        assert_eq!(RecurrencePattern::parse(None), RecurrencePattern::Daily);
        assert_eq!(
            RecurrencePattern::parse(Some("Weekly")),
            RecurrencePattern::Weekly
        );
    }

    #[test]
    fn weekly_reminder_advances_one_week_after_firing() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let mut reminder = reminder_at(None, Some("2024-06-10T09:03:00Z"));
        reminder.is_recurring = true;
        reminder.recurrence_pattern = Some("weekly".to_string());

        let due = select_due(&[reminder], now, Duration::minutes(5));
        assert_eq!(due.len(), 1);

        let pattern = RecurrencePattern::parse(due[0].recurrence_pattern.as_deref());
        let next = next_occurrence(due[0].due_instant().unwrap(), pattern);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 6, 17, 9, 3, 0).unwrap());
    }
}
