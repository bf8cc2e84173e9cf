//! Render a detection report as human-readable text.
//!
//! Machine output goes through serde instead; see the `--json` flag.

use std::fmt::Write;

use crate::types::{DetectionMode, Report};

/// One line per flagged source, in first-seen order.
pub fn render_text(report: &Report) -> String {
  if report.flagged.is_empty() {
    return "No suspicious sources found with the given settings.".to_string();
  }

  let mut out = String::from("Potential brute-force sources:\n");
  for flagged in &report.flagged {
    match report.mode {
      DetectionMode::Timestamped => {
        let _ = writeln!(
          out,
          " - {}: {} hits within {}s (total: {})",
          flagged.source, flagged.in_window_count, report.window_seconds, flagged.total_count
        );
      }
      DetectionMode::CountOnly => {
        let _ = writeln!(
          out,
          " - {}: {} total hits (no time data)",
          flagged.source, flagged.total_count
        );
      }
    }
  }
  out
}
