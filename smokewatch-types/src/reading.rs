//! Decoding temperature readings from queue payloads.

use thiserror::Error;

/// A single temperature reading.
///
/// Payloads are comma-separated text whose last field is the temperature,
/// e.g. `"05/29/24 14:00:00, 150.2"`. The leading field is kept as the
/// timestamp but plays no part in stall detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Timestamp as sent by the producer, if the payload had more than one field.
    pub timestamp: Option<String>,
    /// Temperature in degrees.
    pub temperature: f64,
}

/// Errors that can occur when decoding a payload into a [`Reading`].
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    /// Payload is not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    NotUtf8,

    /// Payload has no content.
    #[error("payload is empty")]
    Empty,

    /// Last field is not a number.
    #[error("invalid temperature field: {field:?}")]
    InvalidTemperature {
        /// The offending field, trimmed.
        field: String,
    },

    /// Last field parsed to NaN or infinity.
    #[error("temperature is not finite: {value}")]
    NonFinite {
        /// The parsed value.
        value: f64,
    },
}

impl Reading {
    /// Decode a raw message body.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(body).map_err(|_| DecodeError::NotUtf8)?;
        Self::parse(text)
    }

    /// Parse a comma-separated record.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        if text.trim().is_empty() {
            return Err(DecodeError::Empty);
        }

        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        // split always yields at least one field
        let last = fields[fields.len() - 1];

        let temperature: f64 = last.parse().map_err(|_| DecodeError::InvalidTemperature {
            field: last.to_string(),
        })?;
        if !temperature.is_finite() {
            return Err(DecodeError::NonFinite { value: temperature });
        }

        let timestamp = if fields.len() > 1 {
            Some(fields[0].to_string())
        } else {
            None
        };

        Ok(Self {
            timestamp,
            temperature,
        })
    }
}

impl std::str::FromStr for Reading {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_timestamped_payload() {
        let reading = Reading::decode(b"05/29/24 14:00:00, 150.2").unwrap();
        assert_eq!(reading.temperature, 150.2);
        assert_eq!(reading.timestamp.as_deref(), Some("05/29/24 14:00:00"));
    }

    #[test]
    fn test_decode_bare_temperature() {
        let reading = Reading::decode(b"98.6").unwrap();
        assert_eq!(reading.temperature, 98.6);
        assert_eq!(reading.timestamp, None);
    }

    #[test]
    fn test_last_field_wins() {
        let reading: Reading = "a,b,c, 71.5\n".parse().unwrap();
        assert_eq!(reading.temperature, 71.5);
        assert_eq!(reading.timestamp.as_deref(), Some("a"));
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(Reading::decode(b""), Err(DecodeError::Empty));
        assert_eq!(Reading::decode(b"  \n"), Err(DecodeError::Empty));
    }

    #[test]
    fn test_missing_temperature() {
        let err = Reading::decode(b"05/29/24 14:00:00,").unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidTemperature {
                field: String::new()
            }
        );
    }

    #[test]
    fn test_non_numeric_temperature() {
        let err = Reading::decode(b"05/29/24 14:00:00, hot").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTemperature { ref field } if field == "hot"));
        assert_eq!(err.to_string(), "invalid temperature field: \"hot\"");
    }

    #[test]
    fn test_non_finite_temperature() {
        assert!(matches!(
            Reading::decode(b"t, NaN"),
            Err(DecodeError::NonFinite { .. })
        ));
        assert!(matches!(
            Reading::decode(b"t, inf"),
            Err(DecodeError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        assert_eq!(Reading::decode(&[0xff, 0xfe, b'1']), Err(DecodeError::NotUtf8));
    }
}
