use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod criteria;
mod db;
mod dispatch;
mod mailer;
mod models;
mod reminders;

#[derive(Parser)]
#[command(name = "notification-dispatch")]
#[command(about = "Notification dispatch engine for the CoachLoop coaching platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import activity events from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Evaluate per-student inactivity criteria and send notifications
    CheckActivity {
        /// Reference time (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Notify due reminders and advance recurring ones
    ProcessReminders {
        /// Reference time (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
        /// Lookahead window in minutes
        #[arg(long, default_value_t = 5)]
        horizon_minutes: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "coachloop_notification_dispatch=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_events_csv(&pool, &csv).await?;
            println!("Inserted {inserted} activity events from {}.", csv.display());
        }
        Commands::CheckActivity { now } => {
            let mailer = mailer::Mailer::from_env()?;
            let summary =
                dispatch::check_activity(&pool, &mailer, now.unwrap_or_else(Utc::now)).await;
            println!("{}", serde_json::to_string(&summary)?);
        }
        Commands::ProcessReminders {
            now,
            horizon_minutes,
        } => {
            let mailer = mailer::Mailer::from_env()?;
            let summary = dispatch::process_reminders(
                &pool,
                &mailer,
                now.unwrap_or_else(Utc::now),
                Duration::minutes(horizon_minutes),
            )
            .await;
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    Ok(())
}
