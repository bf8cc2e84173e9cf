//! Core aggregator: per-source sliding-window state, ingestion, final report.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::config::DetectorConfig;
use crate::error::DetectorError;
use crate::types::*;
use crate::window;

/// Maintains, for every distinct source seen, a sliding count of attempts
/// within the configured window and a running total.
///
/// Single-owner and synchronous: one caller ingests events in order and asks
/// for the report at the end. An incremental feeder can interleave `ingest`
/// and `finalize` freely; `finalize` never mutates state.
pub struct WindowAggregator {
  config: DetectorConfig,
  window: Duration,
  states: HashMap<String, SourceWindowState>,
  /// Sources in first-seen order, so report output is reproducible.
  order: Vec<String>,
  /// Set once any event arrives without a timestamp; the whole run then
  /// degrades to count-only fallback. Mixing modes within one run would
  /// under-count sources with partial timestamp coverage.
  degraded: bool,
}

impl WindowAggregator {
  pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
    config.validate()?;
    let window = Duration::seconds(config.window_seconds as i64);
    Ok(Self {
      config,
      window,
      states: HashMap::new(),
      order: Vec::new(),
      degraded: false,
    })
  }

  fn mode(&self) -> DetectionMode {
    if self.degraded || self.config.window_seconds == 0 {
      DetectionMode::CountOnly
    } else {
      DetectionMode::Timestamped
    }
  }

  /// Ingest a single parsed failure event.
  ///
  /// Events for the same source must arrive in non-decreasing timestamp order
  /// (non-decreasing `sequence_no` when timestamps are absent); violations
  /// are rejected with `OutOfOrderEvent` rather than silently re-sorted, so
  /// the pruning invariant stays checkable. Batch callers sort before feeding.
  pub fn ingest(&mut self, event: &FailureEvent) -> Result<(), DetectorError> {
    if event.source.is_empty() {
      return Err(DetectorError::validation("source", "must not be empty"));
    }

    if !self.states.contains_key(&event.source) {
      self.order.push(event.source.clone());
      self
        .states
        .insert(event.source.clone(), SourceWindowState::new(&event.source));
    }
    // Present by construction just above.
    let state = self
      .states
      .get_mut(&event.source)
      .ok_or_else(|| DetectorError::validation("source", "state lookup failed"))?;

    match event.occurred_at {
      Some(ts) if self.config.window_seconds > 0 => {
        if let Some(last) = state.last_timestamp {
          if ts < last {
            return Err(DetectorError::OutOfOrderEvent {
              source: event.source.clone(),
              last: last.to_rfc3339(),
              got: ts.to_rfc3339(),
            });
          }
        }
        let in_window = window::record(state, ts, self.window);
        debug!(
          source = %event.source,
          in_window,
          total = state.total_count,
          "recorded timestamped event"
        );
      }
      Some(_) => {
        // Window disabled: the timestamp carries no information we can use.
        state.total_count += 1;
      }
      None => {
        if self.config.require_timestamps {
          return Err(DetectorError::MissingTimestamp {
            source: event.source.clone(),
            sequence_no: event.sequence_no,
          });
        }
        if let Some(last) = state.last_sequence {
          if event.sequence_no < last {
            return Err(DetectorError::OutOfOrderEvent {
              source: event.source.clone(),
              last: last.to_string(),
              got: event.sequence_no.to_string(),
            });
          }
        }
        state.total_count += 1;
        if !self.degraded {
          debug!(
            source = %event.source,
            "event without timestamp; run degrades to count-only fallback"
          );
          self.degraded = true;
        }
      }
    }
    state.last_sequence = Some(event.sequence_no);
    Ok(())
  }

  /// Produce the detection report.
  ///
  /// Sources are listed in first-seen order. Idempotent: repeated calls
  /// without intervening `ingest` return equal reports.
  pub fn finalize(&self) -> Report {
    let mode = self.mode();
    let threshold = u64::from(self.config.threshold);
    let mut flagged = Vec::new();

    for source in &self.order {
      let Some(state) = self.states.get(source) else {
        continue;
      };
      match mode {
        DetectionMode::Timestamped => {
          let peak = state.peak_in_window as u64;
          if peak >= threshold {
            flagged.push(FlaggedSource {
              source: source.clone(),
              in_window_count: peak,
              total_count: state.total_count,
            });
          }
        }
        DetectionMode::CountOnly => {
          if state.total_count >= threshold {
            flagged.push(FlaggedSource {
              source: source.clone(),
              in_window_count: state.total_count,
              total_count: state.total_count,
            });
          }
        }
      }
    }

    Report {
      flagged,
      window_seconds: self.config.window_seconds,
      threshold: self.config.threshold,
      mode,
    }
  }

  /// Streaming hook: drop expired window entries for every source.
  ///
  /// Retention policy: totals and observed peaks survive eviction — losing
  /// security-relevant counts is worse than keeping one counter per source.
  pub fn prune_idle(&mut self, now: DateTime<Utc>) {
    for state in self.states.values_mut() {
      window::expire(state, now, self.window);
    }
  }

  /// Window population after the most recent event for `source`.
  pub fn current_in_window(&self, source: &str) -> Option<usize> {
    self.states.get(source).map(|s| s.in_window)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn ts(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
  }

  fn event(source: &str, secs: i64, seq: u64) -> FailureEvent {
    FailureEvent {
      source: source.into(),
      occurred_at: Some(ts(secs)),
      sequence_no: seq,
    }
  }

  fn bare_event(source: &str, seq: u64) -> FailureEvent {
    FailureEvent {
      source: source.into(),
      occurred_at: None,
      sequence_no: seq,
    }
  }

  fn aggregator(window_seconds: u64, threshold: u32, require_timestamps: bool) -> WindowAggregator {
    WindowAggregator::new(DetectorConfig {
      window_seconds,
      threshold,
      require_timestamps,
    })
    .unwrap()
  }

  #[test]
  fn steady_attempts_within_window_are_flagged() {
    let mut agg = aggregator(300, 3, true);
    for (i, t) in [0, 60, 120].into_iter().enumerate() {
      agg.ingest(&event("1.2.3.4", t, i as u64)).unwrap();
    }
    let report = agg.finalize();
    assert_eq!(report.mode, DetectionMode::Timestamped);
    assert_eq!(
      report.flagged,
      vec![FlaggedSource {
        source: "1.2.3.4".into(),
        in_window_count: 3,
        total_count: 3,
      }]
    );
  }

  #[test]
  fn burst_after_quiet_period_is_flagged_with_full_total() {
    let mut agg = aggregator(300, 3, true);
    for (i, t) in [0, 30, 60, 400, 430, 460].into_iter().enumerate() {
      agg.ingest(&event("9.10.11.12", t, i as u64)).unwrap();
    }
    let report = agg.finalize();
    assert_eq!(report.flagged.len(), 1);
    assert_eq!(report.flagged[0].in_window_count, 3);
    assert_eq!(report.flagged[0].total_count, 6);
  }

  #[test]
  fn below_threshold_source_is_excluded() {
    let mut agg = aggregator(300, 3, true);
    agg.ingest(&event("5.6.7.8", 0, 0)).unwrap();
    agg.ingest(&event("5.6.7.8", 10, 1)).unwrap();
    assert!(agg.finalize().flagged.is_empty());
  }

  #[test]
  fn count_only_fallback_flags_on_totals() {
    let mut agg = aggregator(300, 3, false);
    for i in 0..4 {
      agg.ingest(&bare_event("5.6.7.8", i)).unwrap();
    }
    let report = agg.finalize();
    assert_eq!(report.mode, DetectionMode::CountOnly);
    assert_eq!(report.flagged[0].in_window_count, 4);
    assert_eq!(report.flagged[0].total_count, 4);
  }

  #[test]
  fn one_missing_timestamp_degrades_whole_run() {
    let mut agg = aggregator(300, 4, false);
    // Timestamped events spread too far apart to ever flag in window mode.
    for (i, t) in [0, 1000, 2000, 3000].into_iter().enumerate() {
      agg.ingest(&event("1.2.3.4", t, i as u64)).unwrap();
    }
    agg.ingest(&bare_event("1.2.3.4", 4)).unwrap();
    let report = agg.finalize();
    assert_eq!(report.mode, DetectionMode::CountOnly);
    assert_eq!(report.flagged[0].total_count, 5);
  }

  #[test]
  fn missing_timestamp_is_rejected_when_required() {
    let mut agg = aggregator(300, 3, true);
    let err = agg.ingest(&bare_event("1.2.3.4", 0)).unwrap_err();
    assert!(matches!(err, DetectorError::MissingTimestamp { .. }));
  }

  #[test]
  fn zero_window_uses_count_only_mode() {
    let mut agg = aggregator(0, 2, true);
    agg.ingest(&event("1.2.3.4", 0, 0)).unwrap();
    agg.ingest(&event("1.2.3.4", 99999, 1)).unwrap();
    let report = agg.finalize();
    assert_eq!(report.mode, DetectionMode::CountOnly);
    assert_eq!(report.flagged[0].in_window_count, 2);
  }

  #[test]
  fn out_of_order_timestamp_is_rejected() {
    let mut agg = aggregator(300, 3, true);
    agg.ingest(&event("1.2.3.4", 100, 0)).unwrap();
    let err = agg.ingest(&event("1.2.3.4", 50, 1)).unwrap_err();
    assert!(matches!(err, DetectorError::OutOfOrderEvent { .. }));
  }

  #[test]
  fn equal_timestamps_are_accepted() {
    let mut agg = aggregator(300, 2, true);
    agg.ingest(&event("1.2.3.4", 100, 0)).unwrap();
    agg.ingest(&event("1.2.3.4", 100, 1)).unwrap();
    assert_eq!(agg.finalize().flagged[0].in_window_count, 2);
  }

  #[test]
  fn empty_source_is_rejected() {
    let mut agg = aggregator(300, 3, true);
    let err = agg.ingest(&event("", 0, 0)).unwrap_err();
    assert!(err.to_string().contains("source"));
  }

  #[test]
  fn finalize_is_idempotent() {
    let mut agg = aggregator(300, 2, true);
    for (i, t) in [0, 10, 20].into_iter().enumerate() {
      agg.ingest(&event("1.2.3.4", t, i as u64)).unwrap();
    }
    let first = agg.finalize();
    let second = agg.finalize();
    assert_eq!(first.flagged, second.flagged);
    assert_eq!(first.mode, second.mode);
  }

  #[test]
  fn flagged_sources_keep_first_seen_order() {
    let mut agg = aggregator(300, 1, true);
    agg.ingest(&event("8.8.8.8", 0, 0)).unwrap();
    agg.ingest(&event("1.1.1.1", 1, 1)).unwrap();
    agg.ingest(&event("8.8.8.8", 2, 2)).unwrap();
    let flagged: Vec<_> = agg.finalize().flagged.into_iter().map(|f| f.source).collect();
    assert_eq!(flagged, vec!["8.8.8.8", "1.1.1.1"]);
  }

  #[test]
  fn peak_is_retained_after_burst_subsides() {
    // Three attempts in one window, then a lone attempt much later: the
    // source stays flagged on the observed peak.
    let mut agg = aggregator(300, 3, true);
    for (i, t) in [0, 10, 20, 5000].into_iter().enumerate() {
      agg.ingest(&event("1.2.3.4", t, i as u64)).unwrap();
    }
    let report = agg.finalize();
    assert_eq!(report.flagged[0].in_window_count, 3);
    assert_eq!(report.flagged[0].total_count, 4);
    assert_eq!(agg.current_in_window("1.2.3.4"), Some(1));
  }

  #[test]
  fn prune_idle_does_not_change_the_report() {
    let mut agg = aggregator(300, 3, true);
    for (i, t) in [0, 10, 20].into_iter().enumerate() {
      agg.ingest(&event("1.2.3.4", t, i as u64)).unwrap();
    }
    let before = agg.finalize();
    agg.prune_idle(ts(10_000));
    let after = agg.finalize();
    assert_eq!(before.flagged, after.flagged);
    assert_eq!(agg.current_in_window("1.2.3.4"), Some(0));
  }

  #[test]
  fn invalid_config_is_rejected_at_construction() {
    let err = WindowAggregator::new(DetectorConfig {
      threshold: 0,
      ..DetectorConfig::default()
    })
    .map(|_| ())
    .unwrap_err();
    assert!(matches!(err, DetectorError::InvalidConfig { .. }));
  }
}
