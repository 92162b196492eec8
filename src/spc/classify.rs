//! Tiered outlier classification.
//!
//! Each period is compared against its own limits:
//!
//! - **zero**: `v == 0`; excluded from every other tier.
//! - **high / low**: `v != 0` and `v > UCL` / `v < LCL`.
//! - **severe high / low**: beyond `CL ± f·(limit − CL)`, with `f = 5` by
//!   default. A severe outlier is also counted as a regular one.
//! - **recent**: an outlier at position `>= max(1, floor(n · fraction))`.

use serde::{Deserialize, Serialize};

use super::chart::{ControlLimits, TierFlags};

/// Default multiple of the limit distance marking a severe outlier.
pub const DEFAULT_SEVERE_FACTOR: f64 = 5.0;

/// Default start of the "recent" part of a sequence, as a fraction of its length.
pub const DEFAULT_RECENT_FRACTION: f64 = 0.5;

/// Assigns [`TierFlags`] to an ordered series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classifier {
    severe_factor: f64,
    recent_fraction: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            severe_factor: DEFAULT_SEVERE_FACTOR,
            recent_fraction: DEFAULT_RECENT_FRACTION,
        }
    }
}

impl Classifier {
    /// Creates a classifier.
    ///
    /// Returns `None` if `severe_factor < 1` or `recent_fraction` is not in `(0, 1)`.
    pub fn new(severe_factor: f64, recent_fraction: f64) -> Option<Self> {
        if !(severe_factor.is_finite() && severe_factor >= 1.0) {
            return None;
        }
        if !(recent_fraction > 0.0 && recent_fraction < 1.0) {
            return None;
        }
        Some(Self {
            severe_factor,
            recent_fraction,
        })
    }

    /// First index counted as recent for a sequence of `len` periods.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_spc_trace::spc::Classifier;
    ///
    /// let c = Classifier::default();
    /// assert_eq!(c.recent_start(10), 5);
    /// assert_eq!(c.recent_start(3), 1);
    /// assert_eq!(c.recent_start(1), 1);
    /// ```
    pub fn recent_start(&self, len: usize) -> usize {
        ((len as f64 * self.recent_fraction).floor() as usize).max(1)
    }

    /// Flags for one value against its limits, ignoring recency.
    pub fn flags(&self, value: f64, limits: &ControlLimits) -> TierFlags {
        if value == 0.0 {
            return TierFlags {
                zero: true,
                ..TierFlags::default()
            };
        }
        let f = self.severe_factor;
        TierFlags {
            zero: false,
            high: value > limits.ucl,
            low: value < limits.lcl,
            severe_high: value > limits.cl + f * (limits.ucl - limits.cl),
            severe_low: value < limits.cl - f * (limits.cl - limits.lcl),
            recent: false,
        }
    }

    /// Flags for every position of an ordered series.
    ///
    /// `values` and `limits` are paired by position; extra entries in the
    /// longer slice are ignored.
    pub fn classify(&self, values: &[f64], limits: &[ControlLimits]) -> Vec<TierFlags> {
        let n = values.len().min(limits.len());
        let recent_start = self.recent_start(n);
        values
            .iter()
            .zip(limits)
            .enumerate()
            .map(|(i, (&v, l))| {
                let mut flags = self.flags(v, l);
                flags.recent = i >= recent_start && (flags.is_outlier() || flags.is_severe());
                flags
            })
            .collect()
    }
}

/// Per-tier counts over one group's periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierCounts {
    /// Periods in the group.
    pub total: usize,
    pub high: usize,
    pub low: usize,
    pub severe_high: usize,
    pub severe_low: usize,
    /// Outliers (either side) in the recent part of the sequence.
    pub recent: usize,
    /// Severe outliers in the recent part of the sequence.
    pub recent_severe: usize,
    pub zero: usize,
}

impl TierCounts {
    /// Tallies a slice of flags.
    pub fn from_flags<'a, I>(flags: I) -> Self
    where
        I: IntoIterator<Item = &'a TierFlags>,
    {
        flags.into_iter().fold(Self::default(), |mut c, f| {
            c.total += 1;
            c.high += usize::from(f.high);
            c.low += usize::from(f.low);
            c.severe_high += usize::from(f.severe_high);
            c.severe_low += usize::from(f.severe_low);
            c.recent += usize::from(f.recent);
            c.recent_severe += usize::from(f.recent && f.is_severe());
            c.zero += usize::from(f.zero);
            c
        })
    }

    /// Regular outliers on both sides.
    pub fn outliers(&self) -> usize {
        self.high + self.low
    }
}
