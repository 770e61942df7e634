//! Alert content sent when a stall is detected.

use crate::MONITORED_ITEM;

/// Subject and body of a stall alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    /// Stall alert for the given monitored item.
    ///
    /// ```rust
    /// use smokewatch_types::AlertMessage;
    ///
    /// let alert = AlertMessage::stall("Food B");
    /// assert_eq!(alert.subject, "FOOD B STALL");
    /// ```
    pub fn stall(item: &str) -> Self {
        let shouted = item.to_uppercase();
        Self {
            subject: format!("{shouted} STALL"),
            body: format!(
                "{shouted} STALL: {item} temp has changed by 1 degree or less in the last 10 minutes."
            ),
        }
    }
}

impl Default for AlertMessage {
    fn default() -> Self {
        Self::stall(MONITORED_ITEM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_alert_content() {
        let alert = AlertMessage::default();
        assert_eq!(alert.subject, "FOOD A STALL");
        assert_eq!(
            alert.body,
            "FOOD A STALL: Food A temp has changed by 1 degree or less in the last 10 minutes."
        );
    }
}
