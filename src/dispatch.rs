use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::criteria;
use crate::db;
use crate::mailer::{self, Mailer};
use crate::models::{
    ActivityKind, ActivitySignals, NewNotification, NotificationKind, Priority, RecurrencePattern,
    Reminder,
};
use crate::reminders;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub success: bool,
    pub processed_count: u32,
    pub sent_count: u32,
    pub message: String,
}

impl RunSummary {
    fn completed(processed_count: u32, sent_count: u32, message: String) -> Self {
        Self {
            success: true,
            processed_count,
            sent_count,
            message,
        }
    }

    fn aborted(message: String) -> Self {
        Self {
            success: false,
            processed_count: 0,
            sent_count: 0,
            message,
        }
    }
}

/// Daily entry point: evaluates the inactivity criteria for every active
/// student and emits a notification per firing criterion. One student's
/// failure never aborts the batch.
pub async fn check_activity(pool: &PgPool, mailer: &Mailer, now: DateTime<Utc>) -> RunSummary {
    let students = match db::fetch_active_students(pool).await {
        Ok(students) => students,
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "activity check aborted");
            return RunSummary::aborted(format!("failed to fetch active students: {error:#}"));
        }
    };

    let mut processed = 0u32;
    let mut sent = 0u32;

    for student in &students {
        let signals = gather_signals(pool, student.id, now).await;
        let items = criteria::evaluate(student, &signals);
        processed += 1;

        for item in items {
            let record = NewNotification {
                user_id: student.id,
                kind: item.kind,
                title: item.title.clone(),
                message: item.message.clone(),
                action_link: Some(item.action_link.clone()),
                priority: item.priority,
                sent_at: now,
            };
            if let Err(error) = db::insert_notification(pool, &record).await {
                tracing::error!(
                    student = %student.email,
                    kind = item.kind.as_str(),
                    error = %format!("{error:#}"),
                    "failed to store notification"
                );
                continue;
            }

            let recipient = format!(
                "{} {} <{}>",
                student.first_name, student.last_name, student.email
            );
            mailer
                .send(
                    &recipient,
                    &item.title,
                    &mailer::notification_body(&item.message, &item.action_link),
                )
                .await;
            sent += 1;
        }
    }

    RunSummary::completed(
        processed,
        sent,
        format!("checked {processed} students, sent {sent} notifications"),
    )
}

/// Short-interval entry point: notifies reminders due within the horizon and
/// advances recurring ones to their next occurrence.
pub async fn process_reminders(
    pool: &PgPool,
    mailer: &Mailer,
    now: DateTime<Utc>,
    horizon: Duration,
) -> RunSummary {
    let mut candidates = match db::fetch_active_reminders(pool).await {
        Ok(reminders) => reminders,
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "reminder run aborted");
            return RunSummary::aborted(format!("failed to fetch active reminders: {error:#}"));
        }
    };

    if candidates.is_empty() {
        // Rows written by older clients may miss the active flag; fall back
        // to the full table when the filtered fetch comes up empty.
        candidates = match db::fetch_all_reminders(pool).await {
            Ok(reminders) => reminders,
            Err(error) => {
                tracing::error!(error = %format!("{error:#}"), "reminder run aborted");
                return RunSummary::aborted(format!("failed to fetch reminders: {error:#}"));
            }
        };
    }

    let due = reminders::select_due(&candidates, now, horizon);
    let mut processed = 0u32;
    let mut sent = 0u32;

    for reminder in &due {
        if !reminder.is_active {
            tracing::debug!(reminder = %reminder.id, "firing reminder picked up by the unfiltered fallback");
        }
        let record = NewNotification {
            user_id: reminder.user_id,
            kind: NotificationKind::ReminderDue,
            title: reminder.title.clone(),
            message: reminder_message(reminder),
            action_link: Some("/dashboard/reminders".to_string()),
            priority: Priority::High,
            sent_at: now,
        };
        if let Err(error) = db::insert_notification(pool, &record).await {
            tracing::error!(
                reminder = %reminder.id,
                error = %format!("{error:#}"),
                "failed to store reminder notification"
            );
            continue;
        }
        processed += 1;

        let recipient = format!(
            "{} {} <{}>",
            reminder.user_first_name, reminder.user_last_name, reminder.user_email
        );
        mailer
            .send(
                &recipient,
                &format!("Reminder: {}", reminder.title),
                &mailer::notification_body(&record.message, "/dashboard/reminders"),
            )
            .await;
        sent += 1;

        if reminder.is_recurring {
            let pattern = RecurrencePattern::parse(reminder.recurrence_pattern.as_deref());
            // selected reminders always carry a parseable due instant
            let Some(due_at) = reminder.due_instant() else {
                continue;
            };
            let next = reminders::next_occurrence(due_at, pattern);
            if let Err(error) = db::update_reminder_due_at(pool, reminder.id, next).await {
                tracing::error!(
                    reminder = %reminder.id,
                    error = %format!("{error:#}"),
                    "failed to advance recurring reminder"
                );
            }
        }
    }

    RunSummary::completed(
        processed,
        sent,
        format!("{} reminders due, sent {sent} notifications", due.len()),
    )
}

fn reminder_message(reminder: &Reminder) -> String {
    match reminder.description.as_deref() {
        Some(description) => format!(
            "Hi {}, your reminder \"{}\" is due: {}",
            reminder.user_first_name, reminder.title, description
        ),
        None => format!(
            "Hi {}, your reminder \"{}\" is due.",
            reminder.user_first_name, reminder.title
        ),
    }
}

async fn gather_signals(pool: &PgPool, student_id: Uuid, now: DateTime<Utc>) -> ActivitySignals {
    ActivitySignals {
        notifications_today: count_or_zero(
            db::count_notifications_since(pool, student_id, today_start(now)).await,
            "notifications",
        ),
        reports_7d: count_or_zero(
            db::count_events_since(
                pool,
                student_id,
                ActivityKind::Report,
                criteria::lookback_start(now, criteria::REPORT_WINDOW_DAYS),
            )
            .await,
            "reports",
        ),
        leads_7d: count_or_zero(
            db::count_events_since(
                pool,
                student_id,
                ActivityKind::Lead,
                criteria::lookback_start(now, criteria::LEAD_WINDOW_DAYS),
            )
            .await,
            "leads",
        ),
        coach_calls_14d: count_or_zero(
            db::count_events_since(
                pool,
                student_id,
                ActivityKind::CoachCall,
                criteria::lookback_start(now, criteria::COACH_CALL_WINDOW_DAYS),
            )
            .await,
            "coach calls",
        ),
        reports_3d: count_or_zero(
            db::count_events_since(
                pool,
                student_id,
                ActivityKind::Report,
                criteria::lookback_start(now, criteria::LOW_ACTIVITY_WINDOW_DAYS),
            )
            .await,
            "reports",
        ),
        leads_3d: count_or_zero(
            db::count_events_since(
                pool,
                student_id,
                ActivityKind::Lead,
                criteria::lookback_start(now, criteria::LOW_ACTIVITY_WINDOW_DAYS),
            )
            .await,
            "leads",
        ),
    }
}

// A read failure is treated as a zero count: an outage flags absence rather
// than silencing the run.
fn count_or_zero(result: anyhow::Result<i64>, what: &'static str) -> i64 {
    match result {
        Ok(count) => count,
        Err(error) => {
            tracing::warn!(what, error = %format!("{error:#}"), "count unavailable, treating as zero");
            0
        }
    }
}

fn today_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}
