//! Error types for alert delivery.

use thiserror::Error;

/// Errors that can occur when delivering an alert.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Mail settings could not be loaded.
    #[error("Failed to load mail settings: {0}")]
    Settings(String),

    /// Configured mailbox is not a valid address.
    #[error("Invalid mail address: {0}")]
    Address(String),

    /// Message could not be built.
    #[error("Failed to build message: {0}")]
    Message(String),

    /// Connecting, authenticating or sending failed.
    #[error("Mail transport failed: {0}")]
    Transport(String),
}

impl From<config::ConfigError> for AlertError {
    fn from(err: config::ConfigError) -> Self {
        AlertError::Settings(err.to_string())
    }
}

#[cfg(feature = "smtp")]
impl From<lettre::address::AddressError> for AlertError {
    fn from(err: lettre::address::AddressError) -> Self {
        AlertError::Address(err.to_string())
    }
}

#[cfg(feature = "smtp")]
impl From<lettre::error::Error> for AlertError {
    fn from(err: lettre::error::Error) -> Self {
        AlertError::Message(err.to_string())
    }
}

#[cfg(feature = "smtp")]
impl From<lettre::transport::smtp::Error> for AlertError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        AlertError::Transport(err.to_string())
    }
}
