//! SMTP notifier.
//!
//! Every [`SmtpNotifier::send`] call reloads the mail settings, builds the
//! message, opens one SMTP session, sends, and drops the session. No
//! connection is pooled between alerts.
//!
//! ## Example
//!
//! ```rust,no_run
//! use smokewatch_notify::{Notifier, SmtpNotifier};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let notifier = SmtpNotifier::builder()
//!         .settings_path("/etc/smokewatch/mail.toml")
//!         .env_prefix("PIT")
//!         .build();
//!
//!     notifier.send("FOOD A STALL", "check the smoker").await?;
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::settings::{DEFAULT_ENV_PREFIX, DEFAULT_SETTINGS_PATH};
use crate::{AlertError, MailSettings, Notifier, TransportSecurity};

/// Sends alerts as plain-text email.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    settings_path: PathBuf,
    env_prefix: String,
}

impl SmtpNotifier {
    /// Create a new builder for configuring the notifier.
    pub fn builder() -> SmtpNotifierBuilder {
        SmtpNotifierBuilder::default()
    }

    /// Path the mail settings are read from.
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    fn load_settings(&self) -> Result<MailSettings, AlertError> {
        MailSettings::load_with_prefix(&self.settings_path, &self.env_prefix)
    }
}

/// Build the alert email. Sender, recipient and reply-to are all the
/// configured mailbox.
pub fn build_message(
    settings: &MailSettings,
    subject: &str,
    body: &str,
) -> Result<Message, AlertError> {
    let mailbox: Mailbox = settings.outgoing_email_address.parse()?;

    let message = Message::builder()
        .from(mailbox.clone())
        .to(mailbox.clone())
        .reply_to(mailbox)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())?;

    Ok(message)
}

fn transport(settings: &MailSettings) -> Result<AsyncSmtpTransport<Tokio1Executor>, AlertError> {
    let builder = match settings.security() {
        TransportSecurity::Implicit => {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.outgoing_email_host)?
        }
        TransportSecurity::StartTls => {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.outgoing_email_host)?
        }
    };

    let credentials = Credentials::new(
        settings.outgoing_email_address.clone(),
        settings.outgoing_email_password.clone(),
    );

    Ok(builder
        .port(settings.outgoing_email_port)
        .credentials(credentials)
        .build())
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), AlertError> {
        let settings = self.load_settings()?;
        let message = build_message(&settings, subject, body)?;

        debug!(
            "Prepared email message:\n{}",
            String::from_utf8_lossy(&message.formatted())
        );

        let transport = transport(&settings)?;
        debug!(
            host = %settings.outgoing_email_host,
            port = settings.outgoing_email_port,
            security = ?settings.security(),
            "SMTP transport created"
        );

        // The session lives only for this call; it is dropped on every path.
        transport.send(message).await?;
        info!(
            "Alert email sent to {} ({})",
            settings.outgoing_email_address, subject
        );
        Ok(())
    }
}

/// Builder for SmtpNotifier.
#[derive(Debug, Default)]
pub struct SmtpNotifierBuilder {
    settings_path: Option<PathBuf>,
    env_prefix: Option<String>,
}

impl SmtpNotifierBuilder {
    /// Set the settings file (default: ".env.toml").
    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Set the environment override prefix (default: "SMOKEWATCH").
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Build the notifier.
    pub fn build(self) -> SmtpNotifier {
        SmtpNotifier {
            settings_path: self
                .settings_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH)),
            env_prefix: self
                .env_prefix
                .unwrap_or_else(|| DEFAULT_ENV_PREFIX.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(address: &str, port: u16) -> MailSettings {
        MailSettings {
            outgoing_email_host: "smtp.example.com".to_string(),
            outgoing_email_port: port,
            outgoing_email_address: address.to_string(),
            outgoing_email_password: "hunter2".to_string(),
        }
    }

    #[test]
    fn test_builder_defaults() {
        let notifier = SmtpNotifier::builder().build();
        assert_eq!(notifier.settings_path(), Path::new(".env.toml"));
        assert_eq!(notifier.env_prefix, "SMOKEWATCH");
    }

    #[test]
    fn test_builder_custom() {
        let notifier = SmtpNotifier::builder()
            .settings_path("/etc/smokewatch/mail.toml")
            .env_prefix("PIT")
            .build();
        assert_eq!(
            notifier.settings_path(),
            Path::new("/etc/smokewatch/mail.toml")
        );
        assert_eq!(notifier.env_prefix, "PIT");
    }

    #[test]
    fn test_build_message_headers() {
        let message =
            build_message(&settings("pitmaster@example.com", 587), "FOOD A STALL", "no change")
                .unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(formatted.contains("From: pitmaster@example.com"));
        assert!(formatted.contains("To: pitmaster@example.com"));
        assert!(formatted.contains("Reply-To: pitmaster@example.com"));
        assert!(formatted.contains("Subject: FOOD A STALL"));
        assert!(formatted.contains("no change"));
    }

    #[test]
    fn test_build_message_bad_address() {
        let err = build_message(&settings("not an address", 587), "s", "b").unwrap_err();
        assert!(matches!(err, AlertError::Address(_)));
    }

    #[test]
    fn test_transport_builds_for_both_ports() {
        assert!(transport(&settings("pitmaster@example.com", 465)).is_ok());
        assert!(transport(&settings("pitmaster@example.com", 587)).is_ok());
    }

    #[tokio::test]
    async fn test_send_without_settings_file_fails() {
        let notifier = SmtpNotifier::builder()
            .settings_path("/nonexistent/smokewatch/.env.toml")
            .env_prefix("SMOKEWATCH_TEST_SEND")
            .build();

        let err = notifier.send("subject", "body").await.unwrap_err();
        assert!(matches!(err, AlertError::Settings(_)));
    }
}
