//! Stall detection for one monitored item.
//!
//! [`StallMonitor`] owns everything the per-message handler needs: the
//! sliding window, the alert content and the notifier. The consumer owns the
//! monitor, so there is no shared state between messages besides this struct.

use smokewatch_notify::Notifier;
use smokewatch_types::{AlertMessage, DecodeError, Reading, Window};
use tracing::{info, warn};

/// Result of processing one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Window not full yet; no stall evaluation.
    WarmingUp { reading: Reading },
    /// Window full and the temperature is moving.
    Steady { reading: Reading, delta: f64 },
    /// Window full and the temperature stalled; an alert was attempted.
    Stalled {
        reading: Reading,
        delta: f64,
        alert_delivered: bool,
    },
}

impl Outcome {
    /// The reading carried by the message.
    pub fn reading(&self) -> &Reading {
        match self {
            Outcome::WarmingUp { reading }
            | Outcome::Steady { reading, .. }
            | Outcome::Stalled { reading, .. } => reading,
        }
    }

    /// Check if this message triggered a stall alert.
    pub fn is_stall(&self) -> bool {
        matches!(self, Outcome::Stalled { .. })
    }
}

/// Watches the temperature of a single item and alerts on a stall.
pub struct StallMonitor<N> {
    item: String,
    window: Window,
    alert: AlertMessage,
    notifier: N,
}

impl<N: Notifier> StallMonitor<N> {
    /// Create a monitor for `item` with the standard stall alert.
    pub fn new(item: impl Into<String>, notifier: N) -> Self {
        let item = item.into();
        let alert = AlertMessage::stall(&item);
        Self {
            item,
            window: Window::new(),
            alert,
            notifier,
        }
    }

    /// Decode a message body, record the reading and alert on a stall.
    ///
    /// Alert failures are logged and reported through the `alert_delivered`
    /// flag of [`Outcome::Stalled`]; only a malformed body is an error.
    pub async fn process(&mut self, body: &[u8]) -> Result<Outcome, DecodeError> {
        let reading = Reading::decode(body)?;
        let state = self.window.observe(reading.temperature);

        let Some(delta) = state.delta() else {
            info!(
                "Current {} temp is: {} ({}/{} readings)",
                self.item, reading.temperature, state.len, state.capacity
            );
            return Ok(Outcome::WarmingUp { reading });
        };

        if !state.is_stalled() {
            info!("Current {} temp is: {}", self.item, reading.temperature);
            return Ok(Outcome::Steady { reading, delta });
        }

        warn!(
            "FOOD STALL: Current {} temp is: {}; change over window is {} degrees",
            self.item, reading.temperature, delta
        );

        let alert_delivered = match self
            .notifier
            .send(&self.alert.subject, &self.alert.body)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send stall alert for {}: {}", self.item, e);
                false
            }
        };

        Ok(Outcome::Stalled {
            reading,
            delta,
            alert_delivered,
        })
    }

    /// Monitored item label.
    pub fn item(&self) -> &str {
        &self.item
    }

    /// The sliding window.
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Alert content sent on a stall.
    pub fn alert(&self) -> &AlertMessage {
        &self.alert
    }

    /// The notifier alerts are sent through.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}

impl<N> std::fmt::Debug for StallMonitor<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StallMonitor")
            .field("item", &self.item)
            .field("window", &self.window)
            .finish()
    }
}
