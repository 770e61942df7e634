//! Outgoing mail settings.
//!
//! Settings are read from a TOML file (`.env.toml` by default) and can be
//! overridden per key from the environment, e.g.
//! `SMOKEWATCH_OUTGOING_EMAIL_PASSWORD`.

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::AlertError;

/// Default settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_PATH: &str = ".env.toml";

/// Default prefix for environment overrides.
pub const DEFAULT_ENV_PREFIX: &str = "SMOKEWATCH";

/// Port that speaks TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Credentials and server for outgoing alert mail.
#[derive(Clone, Deserialize)]
pub struct MailSettings {
    pub outgoing_email_host: String,
    pub outgoing_email_port: u16,
    /// Sender, recipient and reply-to address; also the SMTP login.
    pub outgoing_email_address: String,
    pub outgoing_email_password: String,
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSecurity {
    /// TLS from connect (SMTPS, port 465).
    Implicit,
    /// Plain connect upgraded with STARTTLS (submission, port 587).
    StartTls,
}

impl MailSettings {
    /// Load settings from `path`, applying `SMOKEWATCH_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, AlertError> {
        Self::load_with_prefix(path, DEFAULT_ENV_PREFIX)
    }

    /// Load settings from `path`, applying overrides under `env_prefix`.
    pub fn load_with_prefix(path: &Path, env_prefix: &str) -> Result<Self, AlertError> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix(env_prefix).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Transport security implied by the configured port.
    pub fn security(&self) -> TransportSecurity {
        if self.outgoing_email_port == IMPLICIT_TLS_PORT {
            TransportSecurity::Implicit
        } else {
            TransportSecurity::StartTls
        }
    }
}

impl std::fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSettings")
            .field("outgoing_email_host", &self.outgoing_email_host)
            .field("outgoing_email_port", &self.outgoing_email_port)
            .field("outgoing_email_address", &self.outgoing_email_address)
            .field("outgoing_email_password", &"<redacted>")
            .finish()
    }
}
