//! # smokewatch-notify
//!
//! Alert delivery for smokewatch.
//!
//! The consumer only knows the [`Notifier`] trait. This crate provides the
//! SMTP implementation and the mail settings it reads.
//!
//! ## Backends
//!
//! - **SMTP** (`smtp` feature, default) - Sends the alert as a plain-text email
//!   from and to the configured mailbox. Port 465 uses implicit TLS, any other
//!   port upgrades with STARTTLS.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smokewatch_notify::{Notifier, SmtpNotifier};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let notifier = SmtpNotifier::builder()
//!         .settings_path(".env.toml")
//!         .build();
//!
//!     notifier.send("FOOD A STALL", "Food A temp has not moved.").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Settings file
//!
//! ```toml
//! outgoing_email_host = "smtp.example.com"
//! outgoing_email_port = 587
//! outgoing_email_address = "pitmaster@example.com"
//! outgoing_email_password = "app-password"
//! ```

pub mod error;
pub mod settings;

#[cfg(feature = "smtp")]
pub mod smtp;

pub use error::AlertError;
pub use settings::{MailSettings, TransportSecurity};

#[cfg(feature = "smtp")]
pub use smtp::SmtpNotifier;

use async_trait::async_trait;

/// Delivers alerts to an operator.
///
/// Implementations own whatever session they need for a single call and
/// release it before returning, whether or not delivery succeeded.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one alert.
    async fn send(&self, subject: &str, body: &str) -> Result<(), AlertError>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    async fn send(&self, subject: &str, body: &str) -> Result<(), AlertError> {
        (**self).send(subject, body).await
    }
}
