//! Brute-force log detector — deterministic, sliding-window based.
//!
//! Scans authentication logs for failed-login events, maintains per-source
//! sliding-window counts, and flags sources whose attempt count within a
//! bounded time window reaches a threshold. When timestamps are unavailable
//! the detector falls back to total-count mode over the whole scanned input.
//!
//! No DB, no network; pure computation + in-memory state.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod parse;
pub mod report;
pub mod scan;
pub mod types;
pub mod window;

pub use aggregator::WindowAggregator;
pub use config::DetectorConfig;
pub use error::DetectorError;
pub use parse::{LineParser, ParserConfig};
pub use types::{FailureEvent, FlaggedSource, Report};
