//! Event parser: regex line-matching and multi-format timestamp parsing.
//!
//! Turns raw log lines into [`FailureEvent`]s. Non-matching and malformed
//! lines yield nothing — they never surface as errors to the aggregator.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::error::DetectorError;
use crate::types::FailureEvent;

/// Default pattern: optional timestamp in one of several named groups, a
/// failed-auth keyword, then an IPv4 `ip` group. Covers common syslog /
/// apache styles; pass a custom pattern when your logs differ.
const DEFAULT_PATTERN: &str = concat!(
  r"(?:(?P<time>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})|",
  r"(?P<time2>\w{3} +\d{1,2} \d{2}:\d{2}:\d{2})|",
  r"(?P<time3>\d{1,2}/\w{3}/\d{4}:\d{2}:\d{2}:\d{2}))?",
  r"[\s\S]*?(?:Failed password|Failed login|authentication failure|Invalid user|401).*?",
  r"(?P<ip>\d+\.\d+\.\d+\.\d+)"
);

/// Timestamp formats tried in order; kept short to cover common styles.
/// `%b %d %H:%M:%S` carries no year, so the current year is injected.
const TIMESTAMP_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%d %H:%M:%S",
  "%b %d %H:%M:%S",
  "%d/%b/%Y:%H:%M:%S",
];

/// Compiled matching configuration, built once per run. Replaces any notion
/// of process-wide parser state.
#[derive(Debug, Clone)]
pub struct ParserConfig {
  pattern: Regex,
}

impl ParserConfig {
  /// The built-in failed-auth pattern.
  pub fn default_pattern() -> Result<Self, DetectorError> {
    Self::from_pattern(DEFAULT_PATTERN)
  }

  /// Compile a user-supplied pattern. It must capture a named `ip` group;
  /// `time`, `time2` and `time3` groups are honored when present.
  pub fn from_pattern(pattern: &str) -> Result<Self, DetectorError> {
    let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
    if !pattern.capture_names().any(|n| n == Some("ip")) {
      return Err(DetectorError::validation(
        "pattern",
        "must contain a named 'ip' capture group",
      ));
    }
    Ok(Self { pattern })
  }
}

/// Stateful line parser: assigns each produced event an injection-order
/// `sequence_no` so fallback mode keeps a stable ordering.
#[derive(Debug)]
pub struct LineParser {
  config: ParserConfig,
  next_sequence: u64,
}

impl LineParser {
  pub fn new(config: ParserConfig) -> Self {
    Self {
      config,
      next_sequence: 0,
    }
  }

  /// Parse one raw log line. Returns `None` when the line does not match or
  /// matches without a source.
  pub fn parse_line(&mut self, line: &str) -> Option<FailureEvent> {
    let caps = self.config.pattern.captures(line)?;
    let source = caps.name("ip")?.as_str();
    if source.is_empty() {
      return None;
    }

    let time_str = caps
      .name("time")
      .or_else(|| caps.name("time2"))
      .or_else(|| caps.name("time3"))
      .map(|m| m.as_str());

    let occurred_at = match time_str {
      Some(raw) => {
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
          debug!(time = raw, "could not parse matched timestamp");
        }
        parsed
      }
      None => None,
    };

    let sequence_no = self.next_sequence;
    self.next_sequence += 1;

    Some(FailureEvent {
      source: source.to_string(),
      occurred_at,
      sequence_no,
    })
  }
}

/// Try each known format; naive timestamps are taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  for format in TIMESTAMP_FORMATS {
    let attempt = if format.contains("%Y") {
      NaiveDateTime::parse_from_str(raw, format)
    } else {
      let with_year = format!("{} {}", Utc::now().year(), raw);
      NaiveDateTime::parse_from_str(&with_year, &format!("%Y {}", format))
    };
    if let Ok(naive) = attempt {
      return Some(naive.and_utc());
    }
  }
  None
}
