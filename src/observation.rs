//! Observation admission - JSONL parsing and boundary validation

use serde::{Deserialize, Serialize};
use std::error::Error;

/// A single timestamped observation
///
/// `timestamp` is Unix milliseconds; `amount` is non-negative once the
/// observation has been admitted. Immutable after admission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub amount: f64,
    pub timestamp: i64,
}

impl Observation {
    /// Parse an Observation from a JSONL line
    pub fn from_jsonl(line: &str) -> Result<Self, Box<dyn Error>> {
        let observation: Observation = serde_json::from_str(line)?;
        Ok(observation)
    }
}

/// Why an observation was refused at the boundary
///
/// Both rejections leave all state untouched; the caller simply drops
/// the observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NegativeAmount,
    TimestampOutsideWindow,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NegativeAmount => write!(f, "amount is negative"),
            RejectReason::TimestampOutsideWindow => {
                write!(f, "timestamp falls outside the trailing window")
            }
        }
    }
}

impl std::error::Error for RejectReason {}

/// Admit or reject a raw (amount, timestamp) pair against the window of
/// `window_ms` milliseconds ending at `now`.
///
/// Admitted iff `amount >= 0` and `now - window_ms < timestamp <= now`.
/// Future-dated observations are rejected rather than clamped.
pub fn validate(
    amount: f64,
    timestamp: i64,
    now: i64,
    window_ms: i64,
) -> Result<Observation, RejectReason> {
    // NaN and infinities fail this comparison and are refused along with
    // negatives; admitting them would poison the running sum.
    if !(amount >= 0.0 && amount.is_finite()) {
        return Err(RejectReason::NegativeAmount);
    }
    if timestamp <= now - window_ms || timestamp > now {
        return Err(RejectReason::TimestampOutsideWindow);
    }
    Ok(Observation { amount, timestamp })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW_MS: i64 = 60_000;

    #[test]
    fn test_parse_observation_jsonl() {
        let line = r#"{"amount":12.34,"timestamp":1763026318000}"#;
        let observation = Observation::from_jsonl(line).unwrap();
        assert_eq!(observation.amount, 12.34);
        assert_eq!(observation.timestamp, 1_763_026_318_000);
    }

    #[test]
    fn test_parse_ignores_surrounding_whitespace_fields() {
        let line = r#"{ "timestamp": 1000, "amount": 0.5 }"#;
        let observation = Observation::from_jsonl(line).unwrap();
        assert_eq!(observation.amount, 0.5);
        assert_eq!(observation.timestamp, 1_000);
    }

    #[test]
    fn test_malformed_jsonl() {
        let line = r#"{"amount": 1.0"#;
        assert!(Observation::from_jsonl(line).is_err());
    }

    #[test]
    fn test_accepts_observation_inside_window() {
        let now = 1_000_000;
        assert!(validate(10.0, now, now, WINDOW_MS).is_ok());
        assert!(validate(0.0, now - WINDOW_MS + 1, now, WINDOW_MS).is_ok());
    }

    #[test]
    fn test_rejects_negative_amount() {
        let now = 1_000_000;
        assert_eq!(
            validate(-1.0, now, now, WINDOW_MS),
            Err(RejectReason::NegativeAmount)
        );
    }

    #[test]
    fn test_rejects_non_finite_amount() {
        let now = 1_000_000;
        assert_eq!(
            validate(f64::NAN, now, now, WINDOW_MS),
            Err(RejectReason::NegativeAmount)
        );
        assert_eq!(
            validate(f64::INFINITY, now, now, WINDOW_MS),
            Err(RejectReason::NegativeAmount)
        );
    }

    #[test]
    fn test_rejects_expired_timestamp() {
        let now = 1_000_000;
        // Exactly on the boundary is already expired
        assert_eq!(
            validate(1.0, now - WINDOW_MS, now, WINDOW_MS),
            Err(RejectReason::TimestampOutsideWindow)
        );
        assert_eq!(
            validate(1.0, now - WINDOW_MS - 1, now, WINDOW_MS),
            Err(RejectReason::TimestampOutsideWindow)
        );
    }

    #[test]
    fn test_rejects_future_timestamp() {
        let now = 1_000_000;
        assert_eq!(
            validate(1.0, now + 1, now, WINDOW_MS),
            Err(RejectReason::TimestampOutsideWindow)
        );
    }
}
