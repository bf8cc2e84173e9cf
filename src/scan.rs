//! Batch driver: read a log file, parse events, feed the aggregator.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::aggregator::WindowAggregator;
use crate::config::DetectorConfig;
use crate::error::DetectorError;
use crate::parse::{LineParser, ParserConfig};
use crate::types::{FailureEvent, Report};

/// Scan a whole log file and return the detection report.
pub fn scan_file(
  path: &Path,
  parser_config: ParserConfig,
  detector_config: DetectorConfig,
) -> Result<Report, DetectorError> {
  let file = File::open(path)?;
  scan_reader(BufReader::new(file), parser_config, detector_config)
}

/// Scan raw log lines from any reader. Invalid UTF-8 is replaced rather than
/// rejected, matching how real-world log files degrade.
pub fn scan_reader<R: Read>(
  mut reader: BufReader<R>,
  parser_config: ParserConfig,
  detector_config: DetectorConfig,
) -> Result<Report, DetectorError> {
  let mut aggregator = WindowAggregator::new(detector_config)?;
  let mut parser = LineParser::new(parser_config);

  let mut events: Vec<FailureEvent> = Vec::new();
  let mut buf = Vec::new();
  let mut line_count = 0u64;
  loop {
    buf.clear();
    if reader.read_until(b'\n', &mut buf)? == 0 {
      break;
    }
    line_count += 1;
    let line = String::from_utf8_lossy(&buf);
    if let Some(event) = parser.parse_line(line.trim_end()) {
      events.push(event);
    }
  }
  debug!(lines = line_count, events = events.len(), "scan complete");

  // Log files are not guaranteed chronological (rotation, clock steps), and
  // the aggregator rejects out-of-order input. Stable sort keeps injection
  // order among equal and untimestamped events.
  events.sort_by(|a, b| {
    a.occurred_at
      .cmp(&b.occurred_at)
      .then(a.sequence_no.cmp(&b.sequence_no))
  });

  for event in &events {
    aggregator.ingest(event)?;
  }
  Ok(aggregator.finalize())
}
