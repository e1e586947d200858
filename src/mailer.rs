use anyhow::Context;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl Mailer {
    /// Reads SMTP_URL and SMTP_FROM from the environment. Without SMTP_URL
    /// the mailer is disabled and every send is logged as skipped.
    pub fn from_env() -> anyhow::Result<Self> {
        let from: Mailbox = std::env::var("SMTP_FROM")
            .unwrap_or_else(|_| "CoachLoop <noreply@coachloop.app>".to_string())
            .parse()
            .context("SMTP_FROM is not a valid mailbox")?;

        let transport = match std::env::var("SMTP_URL") {
            Ok(url) => Some(
                AsyncSmtpTransport::<Tokio1Executor>::from_url(&url)
                    .context("SMTP_URL is not a valid SMTP connection string")?
                    .build(),
            ),
            Err(_) => {
                tracing::warn!("SMTP_URL not set, email delivery disabled");
                None
            }
        };

        Ok(Self { transport, from })
    }

    /// Delivery is best-effort: every failure is logged and swallowed here,
    /// never surfaced to the dispatch loop.
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> bool {
        let Some(transport) = &self.transport else {
            tracing::info!(to, subject, "mailer disabled, skipping email");
            return false;
        };

        let recipient: Mailbox = match to.parse() {
            Ok(mailbox) => mailbox,
            Err(error) => {
                tracing::warn!(to, %error, "invalid recipient address");
                return false;
            }
        };

        let message = match Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
        {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(to, %error, "failed to build email");
                return false;
            }
        };

        match transport.send(message).await {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(to, %error, "email send failed");
                false
            }
        }
    }
}

pub fn notification_body(message: &str, action_link: &str) -> String {
    format!(
        "<html><body>\
         <p>{message}</p>\
         <p><a href=\"https://app.coachloop.app{action_link}\">Open CoachLoop</a></p>\
         <p>The CoachLoop team</p>\
         </body></html>"
    )
}
