use chrono::{DateTime, Duration, Utc};

use crate::models::{ActivitySignals, NotificationItem, NotificationKind, Priority, Student};

pub const REPORT_WINDOW_DAYS: i64 = 7;
pub const LEAD_WINDOW_DAYS: i64 = 7;
pub const COACH_CALL_WINDOW_DAYS: i64 = 14;
pub const LOW_ACTIVITY_WINDOW_DAYS: i64 = 3;

pub struct Criterion {
    pub kind: NotificationKind,
    pub window_days: i64,
    pub priority: Priority,
    pub title: &'static str,
    pub message: &'static str,
    pub action_link: &'static str,
    pub is_quiet: fn(&ActivitySignals) -> bool,
}

pub static CRITERIA: [Criterion; 4] = [
    Criterion {
        kind: NotificationKind::NoReport7Days,
        window_days: REPORT_WINDOW_DAYS,
        priority: Priority::High,
        title: "Time to log an activity report",
        message: "Hi {first_name}, you haven't submitted an activity report in the last {window_days} days. Keep your coach in the loop!",
        action_link: "/dashboard/reports",
        is_quiet: |signals| signals.reports_7d == 0,
    },
    Criterion {
        kind: NotificationKind::NoLeads7Days,
        window_days: LEAD_WINDOW_DAYS,
        priority: Priority::High,
        title: "No new leads this week",
        message: "Hi {first_name}, no new leads were recorded in the last {window_days} days. Let's get back out there!",
        action_link: "/dashboard/leads",
        is_quiet: |signals| signals.leads_7d == 0,
    },
    Criterion {
        kind: NotificationKind::NoCoachCall14Days,
        window_days: COACH_CALL_WINDOW_DAYS,
        priority: Priority::Medium,
        title: "Book your next coach call",
        message: "Hi {first_name}, it has been {window_days} days or more since your last coach call. Schedule one to stay on track.",
        action_link: "/dashboard/calls",
        is_quiet: |signals| signals.coach_calls_14d == 0,
    },
    Criterion {
        kind: NotificationKind::StayFocused,
        window_days: LOW_ACTIVITY_WINDOW_DAYS,
        priority: Priority::Medium,
        title: "Stay focused",
        message: "Hi {first_name}, things have been quiet for the last {window_days} days. Small daily steps keep the momentum going.",
        action_link: "/dashboard",
        is_quiet: |signals| signals.reports_3d == 0 && signals.leads_3d == 0,
    },
];

/// Start of an activity lookback window. Exact 24h days, no calendar or DST
/// adjustment.
pub fn lookback_start(now: DateTime<Utc>, window_days: i64) -> DateTime<Utc> {
    now - Duration::hours(window_days * 24)
}

/// Evaluates every criterion for one student. A student already notified
/// today gets nothing, regardless of how quiet their windows are.
pub fn evaluate(student: &Student, signals: &ActivitySignals) -> Vec<NotificationItem> {
    if signals.notifications_today > 0 {
        return Vec::new();
    }

    let mut items = Vec::new();
    for criterion in &CRITERIA {
        if (criterion.is_quiet)(signals) {
            items.push(NotificationItem {
                kind: criterion.kind,
                title: criterion.title.to_string(),
                message: criterion
                    .message
                    .replace("{first_name}", &student.first_name)
                    .replace("{window_days}", &criterion.window_days.to_string()),
                action_link: criterion.action_link.to_string(),
                priority: criterion.priority,
            });
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn sample_student() -> Student {
        Student {
            id: Uuid::new_v4(),
            first_name: "Avery".to_string(),
            last_name: "Lee".to_string(),
            email: "avery.lee@example.com".to_string(),
        }
    }

    fn signals_from_events(
        now: DateTime<Utc>,
        reports: &[DateTime<Utc>],
        leads: &[DateTime<Utc>],
        coach_calls: &[DateTime<Utc>],
    ) -> ActivitySignals {
        let count = |events: &[DateTime<Utc>], days: i64| {
            let start = lookback_start(now, days);
            events.iter().filter(|at| **at >= start).count() as i64
        };
        ActivitySignals {
            notifications_today: 0,
            reports_7d: count(reports, 7),
            leads_7d: count(leads, 7),
            coach_calls_14d: count(coach_calls, 14),
            reports_3d: count(reports, 3),
            leads_3d: count(leads, 3),
        }
    }

    #[test]
    fn lookback_uses_exact_day_arithmetic() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        for days in [3, 7, 14] {
            assert_eq!(now - lookback_start(now, days), Duration::days(days));
        }
    }

    #[test]
    fn event_on_the_window_edge_counts_as_activity() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let yesterday = now - Duration::days(1);

        let edge = now - Duration::days(7);
        let signals = signals_from_events(now, &[edge], &[yesterday], &[yesterday]);
        let kinds: Vec<NotificationKind> = evaluate(&sample_student(), &signals)
            .iter()
            .map(|item| item.kind)
            .collect();
        assert!(!kinds.contains(&NotificationKind::NoReport7Days));

        let just_outside = edge - Duration::seconds(1);
        let signals = signals_from_events(now, &[just_outside], &[yesterday], &[yesterday]);
        let kinds: Vec<NotificationKind> = evaluate(&sample_student(), &signals)
            .iter()
            .map(|item| item.kind)
            .collect();
        assert_eq!(kinds, vec![NotificationKind::NoReport7Days]);
    }

    #[test]
    fn fully_inactive_student_gets_all_four_notifications() {
        let items = evaluate(&sample_student(), &ActivitySignals::default());
        let kinds: Vec<&str> = items.iter().map(|item| item.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                "NO_REPORT_7_DAYS",
                "NO_LEADS_7_DAYS",
                "NO_COACH_CALL_14_DAYS",
                "STAY_FOCUSED",
            ]
        );
    }

    #[test]
    fn notification_sent_today_suppresses_every_criterion() {
        let signals = ActivitySignals {
            notifications_today: 1,
            ..ActivitySignals::default()
        };
        assert!(evaluate(&sample_student(), &signals).is_empty());
    }

    #[test]
    fn stay_focused_needs_both_recent_counts_at_zero() {
        // A lead two days ago clears the combined criterion even though the
        // report windows are empty.
        let signals = ActivitySignals {
            leads_7d: 1,
            leads_3d: 1,
            ..ActivitySignals::default()
        };
        let kinds: Vec<NotificationKind> = evaluate(&sample_student(), &signals)
            .iter()
            .map(|item| item.kind)
            .collect();
        assert!(kinds.contains(&NotificationKind::NoReport7Days));
        assert!(!kinds.contains(&NotificationKind::StayFocused));

        // An older lead leaves the 3-day window empty and the criterion fires
        // on its own counts, not the 7-day results.
        let signals = ActivitySignals {
            leads_7d: 1,
            reports_7d: 1,
            coach_calls_14d: 1,
            ..ActivitySignals::default()
        };
        let kinds: Vec<NotificationKind> = evaluate(&sample_student(), &signals)
            .iter()
            .map(|item| item.kind)
            .collect();
        assert_eq!(kinds, vec![NotificationKind::StayFocused]);
    }

    #[test]
    fn messages_are_fully_rendered() {
        let items = evaluate(&sample_student(), &ActivitySignals::default());
        for item in &items {
            assert!(item.message.starts_with("Hi Avery,"), "{}", item.message);
            assert!(!item.message.contains('{'), "{}", item.message);
        }
        assert!(items[0].message.contains("7 days"));
        assert!(items[2].message.contains("14 days"));
    }

    #[test]
    fn window_days_match_the_criterion_kinds() {
        let windows: Vec<(NotificationKind, i64)> = CRITERIA
            .iter()
            .map(|criterion| (criterion.kind, criterion.window_days))
            .collect();
        assert_eq!(
            windows,
            vec![
                (NotificationKind::NoReport7Days, 7),
                (NotificationKind::NoLeads7Days, 7),
                (NotificationKind::NoCoachCall14Days, 14),
                (NotificationKind::StayFocused, 3),
            ]
        );
    }
}
