//! Core types for the detector (parsed events, per-source state, report contract).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Parsed events (what the line parser hands the aggregator)
// ---------------------------------------------------------------------------

/// One parsed authentication-failure event. Immutable once created.
#[derive(Debug, Clone)]
pub struct FailureEvent {
  /// The identifier the failure is attributed to (typically an IPv4 address).
  pub source: String,
  /// Event time, when the matched line carried a parseable timestamp.
  pub occurred_at: Option<DateTime<Utc>>,
  /// Injection-order counter; gives fallback mode a stable ordering.
  pub sequence_no: u64,
}

// ---------------------------------------------------------------------------
// Detection mode
// ---------------------------------------------------------------------------

/// How counts are interpreted for a run, decided once from the input rather
/// than re-decided per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
  /// Sliding-window counting over event timestamps.
  Timestamped,
  /// Total-count fallback: the whole scanned input is one unbounded window.
  CountOnly,
}

// ---------------------------------------------------------------------------
// Per-source window state (in-memory, owned by the aggregator)
// ---------------------------------------------------------------------------

/// Sliding-window state for one source.
///
/// `window_events` holds only timestamps inside the active window, oldest
/// first: always sorted ascending, every element within `(latest - W, latest]`.
/// In count-only mode it stays empty and no pruning occurs.
#[derive(Debug, Clone)]
pub struct SourceWindowState {
  pub source: String,
  pub window_events: VecDeque<DateTime<Utc>>,
  pub total_count: u64,
  /// Window population after the most recent event for this source.
  pub in_window: usize,
  /// Highest window population observed at any point during the run.
  pub peak_in_window: usize,
  pub last_timestamp: Option<DateTime<Utc>>,
  pub last_sequence: Option<u64>,
}

impl SourceWindowState {
  pub fn new(source: impl Into<String>) -> Self {
    Self {
      source: source.into(),
      window_events: VecDeque::new(),
      total_count: 0,
      in_window: 0,
      peak_in_window: 0,
      last_timestamp: None,
      last_sequence: None,
    }
  }
}

// ---------------------------------------------------------------------------
// Report contract (what we emit)
// ---------------------------------------------------------------------------

/// A source whose count met or exceeded the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedSource {
  pub source: String,
  /// Peak in-window count in timestamped mode; equals `total_count` in
  /// count-only fallback.
  pub in_window_count: u64,
  pub total_count: u64,
}

/// Final detection report. Immutable after creation; `flagged` preserves the
/// first-seen order of sources so output is reproducible for auditing.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
  pub flagged: Vec<FlaggedSource>,
  pub window_seconds: u64,
  pub threshold: u32,
  pub mode: DetectionMode,
}
