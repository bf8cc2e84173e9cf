//! Binary entrypoint: scan a log file and print flagged brute-force sources.
//!
//! Exit codes: 0 on a completed scan (flagged or not), 2 for an invalid
//! pattern, 1 for any other failure.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bruteforce_detector::{report, scan, DetectorConfig, ParserConfig};

#[derive(Debug, Parser)]
#[command(name = "bruteforce-detector", about = "Detect brute-force attempts in log files")]
struct Cli {
  /// Log file path.
  #[arg(short = 'l', long)]
  logfile: PathBuf,

  /// Custom regex (must capture a named 'ip' group).
  #[arg(short = 'p', long)]
  pattern: Option<String>,

  /// Sliding window in seconds.
  #[arg(short = 'w', long = "time-window", default_value_t = 300)]
  time_window: u64,

  /// Attempts threshold within the window.
  #[arg(short = 't', long, default_value_t = 20)]
  threshold: u32,

  /// Fall back to total counts when timestamps are missing.
  #[arg(long)]
  allow_count_only: bool,

  /// Emit the report as JSON instead of text.
  #[arg(long)]
  json: bool,

  /// Log extra detail during parsing to stderr.
  #[arg(short, long)]
  verbose: bool,
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
    )
    .with_writer(std::io::stderr)
    .init();

  let parser_config = match &cli.pattern {
    Some(raw) => ParserConfig::from_pattern(raw),
    None => ParserConfig::default_pattern(),
  };
  let parser_config = match parser_config {
    Ok(c) => c,
    Err(e) => {
      eprintln!("Invalid regex pattern: {}", e);
      process::exit(2);
    }
  };

  let detector_config = DetectorConfig {
    window_seconds: cli.time_window,
    threshold: cli.threshold,
    require_timestamps: !cli.allow_count_only,
  };

  let report = match scan::scan_file(&cli.logfile, parser_config, detector_config) {
    Ok(r) => r,
    Err(e) => {
      eprintln!("Error while scanning logs: {}", e);
      process::exit(1);
    }
  };

  if cli.json {
    match serde_json::to_string_pretty(&report) {
      Ok(json) => println!("{}", json),
      Err(e) => {
        eprintln!("Error while encoding report: {}", e);
        process::exit(1);
      }
    }
  } else {
    print!("{}", ensure_trailing_newline(report::render_text(&report)));
  }
}

fn ensure_trailing_newline(mut s: String) -> String {
  if !s.ends_with('\n') {
    s.push('\n');
  }
  s
}
