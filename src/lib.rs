//! # u-spc-trace
//!
//! Statistical process control over tabular time series, with every flagged
//! point traceable back to the source rows that produced it.
//!
//! A request filters a loaded table, unifies its time columns into one
//! orderable key, segments rows by categorical cut columns, and for each
//! group aggregates, estimates moving-range control limits, and classifies
//! each period into severity tiers. Flagged periods can then be mapped back
//! to row identifiers for annotation.
//!
//! ## Modules
//!
//! - [`table`] — Loaded tables, cell values, filters, column classifier
//! - [`timeaxis`] — Calendar / ordinal time keys and the time-axis unifier
//! - [`segment`] — Grouping by cut columns
//! - [`aggregate`] — Daily, weekly, monthly, yearly or per-row periods
//! - [`spc`] — Control limits (moving range, d2 = 1.128) and tier classification
//! - [`engine`] — [`analyze`] and per-group results
//! - [`trace`] — [`map_outliers_to_rows`]
//! - [`session`] — Per-session table and result storage with eviction
//! - [`report`] — Priority-ordered export summary
//! - [`config`] — Tunable parameters (TOML, environment)
//! - [`error`] — Error types
//!
//! ## Design Philosophy
//!
//! - **Decide once**: the time key kind is fixed by the unifier and carried
//!   through every later stage
//! - **Local failure**: a group that cannot be charted is skipped with a
//!   reason; only request-level problems stop a request
//! - **Research-backed**: control limits follow Montgomery (2019), Ch. 6

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod segment;
pub mod session;
pub mod spc;
pub mod table;
pub mod timeaxis;
pub mod trace;

pub use aggregate::AggregationMode;
pub use config::AnalysisConfig;
pub use engine::{analyze, analyze_detailed, AnalysisRequest, GroupResult, StatusReport};
pub use error::{AnalysisError, SkipReason};
pub use table::{Filters, RowId, Table};
pub use timeaxis::TimeKey;
pub use trace::map_outliers_to_rows;
