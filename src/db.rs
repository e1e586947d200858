use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{ActivityKind, NewNotification, Reminder, Student};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery",
            "Lee",
            "avery.lee@coachloop.app",
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules",
            "Moreno",
            "jules.moreno@coachloop.app",
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara",
            "Patel",
            "kiara.patel@coachloop.app",
        ),
    ];

    for (id, first_name, last_name, email) in students {
        sqlx::query(
            r#"
            INSERT INTO coach_notify.students (id, first_name, last_name, email, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (email) DO UPDATE
            SET first_name = EXCLUDED.first_name, last_name = EXCLUDED.last_name
            "#,
        )
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .execute(pool)
        .await?;
    }

    let now = Utc::now();
    let events = vec![
        (
            "seed-001",
            "avery.lee@coachloop.app",
            ActivityKind::Report,
            now - Duration::days(1),
        ),
        (
            "seed-002",
            "avery.lee@coachloop.app",
            ActivityKind::Lead,
            now - Duration::days(2),
        ),
        (
            "seed-003",
            "jules.moreno@coachloop.app",
            ActivityKind::CoachCall,
            now - Duration::days(10),
        ),
        (
            "seed-004",
            "kiara.patel@coachloop.app",
            ActivityKind::Report,
            now - Duration::days(20),
        ),
    ];

    for (source_key, email, kind, occurred_at) in events {
        let student_id: Uuid =
            sqlx::query("SELECT id FROM coach_notify.students WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?
                .get("id");

        sqlx::query(
            r#"
            INSERT INTO coach_notify.activity_events
            (id, student_id, event_type, occurred_at, source_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(kind.as_str())
        .bind(occurred_at)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    // One reminder per historical due-at encoding: combined timestamp and
    // split date + time-of-day.
    let in_an_hour = (now + Duration::hours(1)).to_rfc3339_opts(SecondsFormat::Secs, true);
    let tomorrow = (now + Duration::days(1)).date_naive().to_string();
    let reminders = vec![
        (
            Uuid::parse_str("7b1d2c3e-4f5a-4b6c-8d7e-9f0a1b2c3d4e")?,
            "Weekly pipeline review",
            Some("Walk through open leads with your coach"),
            None,
            Some(in_an_hour.as_str()),
            true,
            Some("weekly"),
            "avery.lee@coachloop.app",
        ),
        (
            Uuid::parse_str("8c2e3d4f-5a6b-4c7d-9e8f-0a1b2c3d4e5f")?,
            "Submit monthly numbers",
            None,
            Some(tomorrow.as_str()),
            Some("09:00:00"),
            false,
            None,
            "jules.moreno@coachloop.app",
        ),
    ];

    for (id, title, description, due_date, due_time, is_recurring, pattern, email) in reminders {
        let row = sqlx::query(
            "SELECT id, first_name, last_name FROM coach_notify.students WHERE email = $1",
        )
        .bind(email)
        .fetch_one(pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO coach_notify.reminders
            (id, title, description, due_date, due_time, is_active, is_recurring,
             recurrence_pattern, user_id, user_email, user_first_name, user_last_name)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(due_date)
        .bind(due_time)
        .bind(is_recurring)
        .bind(pattern)
        .bind(row.get::<Uuid, _>("id"))
        .bind(email)
        .bind(row.get::<String, _>("first_name"))
        .bind(row.get::<String, _>("last_name"))
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_active_students(pool: &PgPool) -> anyhow::Result<Vec<Student>> {
    let rows = sqlx::query(
        "SELECT id, first_name, last_name, email \
         FROM coach_notify.students WHERE is_active ORDER BY email",
    )
    .fetch_all(pool)
    .await?;

    let mut students = Vec::new();
    for row in rows {
        students.push(Student {
            id: row.get("id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email: row.get("email"),
        });
    }

    Ok(students)
}

pub async fn count_events_since(
    pool: &PgPool,
    student_id: Uuid,
    kind: ActivityKind,
    since: DateTime<Utc>,
) -> anyhow::Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS total FROM coach_notify.activity_events \
         WHERE student_id = $1 AND event_type = $2 AND occurred_at >= $3",
    )
    .bind(student_id)
    .bind(kind.as_str())
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(row.get("total"))
}

pub async fn count_notifications_since(
    pool: &PgPool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> anyhow::Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS total FROM coach_notify.notifications \
         WHERE user_id = $1 AND sent_at >= $2",
    )
    .bind(user_id)
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(row.get("total"))
}

pub async fn insert_notification(
    pool: &PgPool,
    notification: &NewNotification,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO coach_notify.notifications
        (id, user_id, kind, title, message, action_link, is_read, priority, sent_at)
        VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(notification.user_id)
    .bind(notification.kind.as_str())
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(&notification.action_link)
    .bind(notification.priority.as_str())
    .bind(notification.sent_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_active_reminders(pool: &PgPool) -> anyhow::Result<Vec<Reminder>> {
    fetch_reminders(pool, true).await
}

pub async fn fetch_all_reminders(pool: &PgPool) -> anyhow::Result<Vec<Reminder>> {
    fetch_reminders(pool, false).await
}

async fn fetch_reminders(pool: &PgPool, active_only: bool) -> anyhow::Result<Vec<Reminder>> {
    let mut query = String::from(
        "SELECT id, title, description, due_date, due_time, is_active, is_recurring, \
         recurrence_pattern, user_id, user_email, user_first_name, user_last_name \
         FROM coach_notify.reminders",
    );
    if active_only {
        query.push_str(" WHERE is_active");
    }

    let rows = sqlx::query(&query).fetch_all(pool).await?;
    let mut reminders = Vec::new();

    for row in rows {
        reminders.push(Reminder {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            due_date: row.get("due_date"),
            due_time: row.get("due_time"),
            is_active: row.get("is_active"),
            is_recurring: row.get("is_recurring"),
            recurrence_pattern: row.get("recurrence_pattern"),
            user_id: row.get("user_id"),
            user_email: row.get("user_email"),
            user_first_name: row.get("user_first_name"),
            user_last_name: row.get("user_last_name"),
        });
    }

    Ok(reminders)
}

/// Writes the advanced due instant back in the canonical combined form and
/// clears the legacy split field.
pub async fn update_reminder_due_at(
    pool: &PgPool,
    id: Uuid,
    due_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE coach_notify.reminders SET due_time = $2, due_date = NULL WHERE id = $1")
        .bind(id)
        .bind(due_at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn import_events_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        first_name: String,
        last_name: String,
        email: String,
        event_type: String,
        occurred_at: DateTime<Utc>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let student_id: Uuid = sqlx::query(
            r#"
            INSERT INTO coach_notify.students
            (id, first_name, last_name, email, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (email) DO UPDATE
            SET first_name = EXCLUDED.first_name, last_name = EXCLUDED.last_name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(&row.email)
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO coach_notify.activity_events
            (id, student_id, event_type, occurred_at, source_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(&row.event_type)
        .bind(row.occurred_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
