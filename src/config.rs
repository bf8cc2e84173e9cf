//! Detector configuration with sane defaults.

use crate::error::DetectorError;

/// Tunable thresholds for brute-force detection.
///
/// Supplied once per run; nothing mutates it after the aggregator is built.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
  /// Sliding window size in seconds. `0` disables windowing and the run
  /// uses total-count fallback from the start.
  pub window_seconds: u64,
  /// Minimum in-window (or total) attempt count that flags a source.
  pub threshold: u32,
  /// When true, an event without a timestamp is a caller contract violation
  /// instead of a trigger for count-only fallback.
  pub require_timestamps: bool,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      window_seconds: 300,
      threshold: 20,
      require_timestamps: true,
    }
  }
}

impl DetectorConfig {
  /// Reject configurations the aggregator cannot honor, before any ingestion.
  pub fn validate(&self) -> Result<(), DetectorError> {
    if self.threshold < 1 {
      return Err(DetectorError::invalid_config(
        "threshold",
        "must be at least 1",
      ));
    }
    // chrono durations are i64 seconds internally.
    if self.window_seconds > i64::MAX as u64 {
      return Err(DetectorError::invalid_config(
        "window_seconds",
        "exceeds the representable duration range",
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_is_valid() {
    assert!(DetectorConfig::default().validate().is_ok());
  }

  #[test]
  fn zero_threshold_is_rejected() {
    let config = DetectorConfig {
      threshold: 0,
      ..DetectorConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("threshold"));
  }

  #[test]
  fn zero_window_is_allowed() {
    let config = DetectorConfig {
      window_seconds: 0,
      ..DetectorConfig::default()
    };
    assert!(config.validate().is_ok());
  }
}
