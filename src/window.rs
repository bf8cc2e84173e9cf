//! Sliding-window recording: deque append at the back, evict from the front.
//!
//! Keeps `ingest` amortized O(1) per event instead of re-scanning the full
//! event history on every arrival.

use chrono::{DateTime, Duration, Utc};

use crate::types::SourceWindowState;

/// Record a timestamped event and return the resulting in-window count.
///
/// - Appends `ts` to the window and bumps `total_count`.
/// - Prunes from the front every timestamp at or before `ts - window`.
///   The window is half-open, `(ts - W, ts]`: an event exactly `W` seconds
///   old is evicted, so boundary timestamps never count.
/// - Folds the new window population into `peak_in_window`.
///
/// Caller contract: `ts` must be >= the last recorded timestamp for this
/// state; the aggregator enforces that before calling.
pub fn record(state: &mut SourceWindowState, ts: DateTime<Utc>, window: Duration) -> usize {
  state.window_events.push_back(ts);
  state.total_count += 1;

  let cutoff = ts - window;
  while let Some(oldest) = state.window_events.front() {
    if *oldest <= cutoff {
      state.window_events.pop_front();
    } else {
      break;
    }
  }

  state.in_window = state.window_events.len();
  if state.in_window > state.peak_in_window {
    state.peak_in_window = state.in_window;
  }
  state.last_timestamp = Some(ts);
  state.in_window
}

/// Drop window entries that have expired relative to `now`, keeping totals.
///
/// Streaming hook: lets a long-lived caller bound memory between events
/// without losing the running total or the observed peak.
pub fn expire(state: &mut SourceWindowState, now: DateTime<Utc>, window: Duration) {
  let cutoff = now - window;
  while let Some(oldest) = state.window_events.front() {
    if *oldest <= cutoff {
      state.window_events.pop_front();
    } else {
      break;
    }
  }
  state.in_window = state.window_events.len();
}
