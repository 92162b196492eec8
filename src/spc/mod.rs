//! Statistical Process Control (SPC) for individual values.
//!
//! Builds a dynamic control envelope for one ordered series and tags each
//! point with severity tiers.
//!
//! # Control Limits
//!
//! - [`estimate_limits`]: moving-range sigma estimate (d2 = 1.128), rolling
//!   center line, `CL ± k·sigma` with the lower limit clipped at zero
//!
//! # Classification
//!
//! - [`Classifier`]: zero, high/low, severe high/low and recent tiers
//! - [`TierCounts`]: per-tier tallies
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - ASTM E2587 — Standard Practice for Use of Control Charts

mod chart;
mod classify;
mod limits;

pub use chart::{ControlLimits, Period, Tier, TierFlags};
pub use classify::{Classifier, TierCounts, DEFAULT_RECENT_FRACTION, DEFAULT_SEVERE_FACTOR};
pub use limits::{
    estimate_limits, estimate_sigma, moving_ranges, rolling_center, LimitEstimate, SigmaMethod,
    D2,
};
