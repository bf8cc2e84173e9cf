//! Structured error types for the detector.

use std::fmt;

// Implemented by hand rather than via `thiserror` because several variants
// carry a `String` field named `source` (the attack source host), which
// thiserror unconditionally treats as the error-chain source.
#[derive(Debug)]
pub enum DetectorError {
  InvalidConfig { field: String, reason: String },

  OutOfOrderEvent {
    source: String,
    last: String,
    got: String,
  },

  MissingTimestamp { source: String, sequence_no: u64 },

  Validation { field: String, reason: String },

  Pattern(regex::Error),

  Io(std::io::Error),
}

impl fmt::Display for DetectorError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::InvalidConfig { field, reason } => write!(f, "config: {field}: {reason}"),
      Self::OutOfOrderEvent { source, last, got } => {
        write!(f, "out-of-order event for {source}: {got} precedes last seen {last}")
      }
      Self::MissingTimestamp { source, sequence_no } => write!(
        f,
        "event #{sequence_no} for {source} has no timestamp but timestamps are required"
      ),
      Self::Validation { field, reason } => write!(f, "validation: {field}: {reason}"),
      Self::Pattern(e) => write!(f, "pattern: {e}"),
      Self::Io(e) => write!(f, "io: {e}"),
    }
  }
}

impl std::error::Error for DetectorError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Pattern(e) => Some(e),
      Self::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<regex::Error> for DetectorError {
  fn from(e: regex::Error) -> Self {
    Self::Pattern(e)
  }
}

impl From<std::io::Error> for DetectorError {
  fn from(e: std::io::Error) -> Self {
    Self::Io(e)
  }
}

impl DetectorError {
  pub fn invalid_config(field: &str, reason: &str) -> Self {
    Self::InvalidConfig {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }
}
