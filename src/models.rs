use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Student {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Report,
    Lead,
    CoachCall,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Report => "report",
            ActivityKind::Lead => "lead",
            ActivityKind::CoachCall => "coach_call",
        }
    }
}

/// Per-student counts gathered for one dispatch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivitySignals {
    pub notifications_today: i64,
    pub reports_7d: i64,
    pub leads_7d: i64,
    pub coach_calls_14d: i64,
    pub reports_3d: i64,
    pub leads_3d: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    NoReport7Days,
    NoLeads7Days,
    NoCoachCall14Days,
    StayFocused,
    ReminderDue,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::NoReport7Days => "NO_REPORT_7_DAYS",
            NotificationKind::NoLeads7Days => "NO_LEADS_7_DAYS",
            NotificationKind::NoCoachCall14Days => "NO_COACH_CALL_14_DAYS",
            NotificationKind::StayFocused => "STAY_FOCUSED",
            NotificationKind::ReminderDue => "REMINDER_DUE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationItem {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub action_link: String,
    pub priority: Priority,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub action_link: Option<String>,
    pub priority: Priority,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrencePattern {
    /// Unknown or missing patterns advance daily so a recurring reminder
    /// never stalls.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("weekly") => RecurrencePattern::Weekly,
            Some("monthly") => RecurrencePattern::Monthly,
            Some("yearly") => RecurrencePattern::Yearly,
            _ => RecurrencePattern::Daily,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reminder {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub due_time: Option<String>,
    pub is_active: bool,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<String>,
    pub user_id: Uuid,
    pub user_email: String,
    pub user_first_name: String,
    pub user_last_name: String,
}

impl Reminder {
    /// Two historical encodings survive in the data: a combined timestamp in
    /// `due_time`, or a split date plus time-of-day pair. Both are UTC wall
    /// clock. Returns `None` when neither form parses.
    pub fn due_instant(&self) -> Option<DateTime<Utc>> {
        let time = self
            .due_time
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty());
        let date = self
            .due_date
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty());

        if let Some(raw) = time {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return Some(parsed.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        let day = NaiveDate::parse_from_str(date?, "%Y-%m-%d").ok()?;
        let time_of_day = time.and_then(|raw| {
            NaiveTime::parse_from_str(raw, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
                .ok()
        })?;
        Some(Utc.from_utc_datetime(&day.and_time(time_of_day)))
    }
}
