//! Core chart types: control limits, tier flags, and periods.
//!
//! A [`Period`] is one point on a group's chart together with the limits it
//! is judged against, the tiers it falls into, and the source rows it was
//! built from.

use serde::{Deserialize, Serialize};

use crate::table::RowId;
use crate::timeaxis::TimeKey;

/// Control limits at one point of the chart.
///
/// # Invariants
///
/// - `lcl >= 0`
/// - `lcl <= ucl`
/// - All values are finite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlLimits {
    /// Upper control limit (CL + k sigma).
    pub ucl: f64,
    /// Center line (rolling mean of non-zero values).
    pub cl: f64,
    /// Lower control limit (max(0, CL - k sigma)).
    pub lcl: f64,
}

/// Severity tiers a period falls into.
///
/// Flags are independent so that every tier can be counted on its own; a
/// severe outlier is also a regular outlier on the same side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierFlags {
    /// Value is exactly zero; excluded from every other tier.
    pub zero: bool,
    /// Non-zero value above the upper limit.
    pub high: bool,
    /// Non-zero value below the lower limit.
    pub low: bool,
    /// Value beyond the severe threshold above the center line.
    pub severe_high: bool,
    /// Non-zero value beyond the severe threshold below the center line.
    pub severe_low: bool,
    /// Outlier in the later part of the sequence.
    pub recent: bool,
}

impl TierFlags {
    /// Returns true for a regular high or low outlier.
    pub fn is_outlier(&self) -> bool {
        self.high || self.low
    }

    /// Returns true for a severe high or low outlier.
    pub fn is_severe(&self) -> bool {
        self.severe_high || self.severe_low
    }

    /// The single tier shown for this period; severe takes precedence.
    pub fn display_tier(&self) -> Tier {
        if self.zero {
            Tier::Zero
        } else if self.severe_high {
            Tier::SevereHigh
        } else if self.severe_low {
            Tier::SevereLow
        } else if self.high {
            Tier::High
        } else if self.low {
            Tier::Low
        } else {
            Tier::Normal
        }
    }
}

/// Display tier of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Normal,
    Zero,
    High,
    Low,
    SevereHigh,
    SevereLow,
}

/// One aggregated point of a group's chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// Zero-based position in the group's ordered sequence.
    pub index: usize,
    /// Bucket label or the row's own key.
    pub time: TimeKey,
    /// Mean of the member rows' values.
    pub value: f64,
    pub limits: ControlLimits,
    pub flags: TierFlags,
    /// Source rows the period was built from, in time order.
    pub rows: Vec<RowId>,
}

impl Period {
    /// Center line at this period.
    pub fn center(&self) -> f64 {
        self.limits.cl
    }

    /// Upper control limit at this period.
    pub fn upper(&self) -> f64 {
        self.limits.ucl
    }

    /// Lower control limit at this period.
    pub fn lower(&self) -> f64 {
        self.limits.lcl
    }

    /// Returns true if the period is a regular (or severe) outlier.
    pub fn is_outlier(&self) -> bool {
        self.flags.is_outlier()
    }
}
