//! Dynamic control limits from the moving-range method.
//!
//! A zero value usually marks a missing or placeholder measurement, so zeros
//! are excluded from both the variation estimate and the center line.
//!
//! # Algorithm
//!
//! 1. Moving ranges: MR_i = |x_i - x_{i-1}| over consecutive non-zero values.
//! 2. sigma-hat = MR-bar / d2 with d2 = 1.128 when at least two moving ranges
//!    exist; otherwise the sample standard deviation of the non-zero values.
//! 3. Undefined or zero sigma-hat rejects the series.
//! 4. Center line: rolling mean of the non-zero values (minimum one value per
//!    window), gaps filled by linear interpolation and held flat at the ends.
//! 5. UCL = CL + k sigma-hat, LCL = max(0, CL - k sigma-hat).
//!
//! # Reference
//!
//! Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.,
//! Chapter 6: Control Charts for Variables.

use statrs::statistics::Statistics;

use super::chart::ControlLimits;
use crate::error::SkipReason;

/// d2 factor for subgroups of size 2 (consecutive pairs).
///
/// sigma-hat = MR-bar / d2.
pub const D2: f64 = 1.128;

/// How sigma-hat was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SigmaMethod {
    /// Mean moving range divided by d2.
    MovingRange,
    /// Sample standard deviation (too few moving ranges).
    SampleStdDev,
}

/// Variation estimate and per-point control limits for one series.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitEstimate {
    pub sigma: f64,
    pub method: SigmaMethod,
    /// One entry per input value.
    pub limits: Vec<ControlLimits>,
}

/// Moving ranges of the non-zero values, in order.
///
/// # Examples
///
/// ```
/// use u_spc_trace::spc::moving_ranges;
///
/// let mr = moving_ranges(&[10.0, 0.0, 12.0, 9.0]);
/// assert_eq!(mr, vec![2.0, 3.0]);
/// ```
pub fn moving_ranges(values: &[f64]) -> Vec<f64> {
    let non_zero: Vec<f64> = values.iter().copied().filter(|v| *v != 0.0).collect();
    non_zero.windows(2).map(|w| (w[1] - w[0]).abs()).collect()
}

/// Estimates sigma-hat from the non-zero values.
///
/// Returns `None` when fewer than two non-zero values exist. The estimate
/// may be zero; callers decide how to treat that.
pub fn estimate_sigma(values: &[f64]) -> Option<(f64, SigmaMethod)> {
    let non_zero: Vec<f64> = values.iter().copied().filter(|v| *v != 0.0).collect();
    if non_zero.len() < 2 {
        return None;
    }
    let mr = moving_ranges(&non_zero);
    if mr.len() >= 2 {
        Some((mr.iter().mean() / D2, SigmaMethod::MovingRange))
    } else {
        Some((non_zero.iter().std_dev(), SigmaMethod::SampleStdDev))
    }
}

/// Rolling mean of the non-zero values with gaps interpolated.
///
/// Each window covers `window` positions ending at the current one and
/// averages whatever non-zero values it contains. Positions whose window
/// holds none are filled linearly between neighbours, or with the nearest
/// value at either end. Returns `None` if `window == 0` or no value is
/// non-zero.
///
/// # Examples
///
/// ```
/// use u_spc_trace::spc::rolling_center;
///
/// let cl = rolling_center(&[10.0, 12.0, 11.0, 100.0], 3).unwrap();
/// assert!((cl[2] - 11.0).abs() < 1e-12);
/// assert!((cl[3] - 41.0).abs() < 1e-12);
/// ```
pub fn rolling_center(values: &[f64], window: usize) -> Option<Vec<f64>> {
    if window == 0 {
        return None;
    }
    let rolled: Vec<Option<f64>> = (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let present: Vec<f64> = values[start..=i]
                .iter()
                .copied()
                .filter(|v| *v != 0.0)
                .collect();
            (!present.is_empty()).then(|| present.iter().mean())
        })
        .collect();
    interpolate(&rolled)
}

/// Fills `None` entries linearly by position; ends take the nearest value.
fn interpolate(series: &[Option<f64>]) -> Option<Vec<f64>> {
    let known: Vec<(usize, f64)> = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    let (&(first_i, first_v), &(last_i, last_v)) = (known.first()?, known.last()?);

    let mut out = Vec::with_capacity(series.len());
    let mut next = 0usize;
    for (i, v) in series.iter().enumerate() {
        if let Some(v) = v {
            out.push(*v);
            next += 1;
            continue;
        }
        if i < first_i {
            out.push(first_v);
        } else if i > last_i {
            out.push(last_v);
        } else {
            let (li, lv) = known[next - 1];
            let (ri, rv) = known[next];
            let t = (i - li) as f64 / (ri - li) as f64;
            out.push(lv + (rv - lv) * t);
        }
    }
    Some(out)
}

/// Computes sigma-hat and per-point limits for an ordered series.
///
/// # Errors
///
/// - [`SkipReason::DegenerateVariation`] if sigma-hat is undefined or zero.
/// - [`SkipReason::Computation`] for an invalid window or multiplier, or
///   non-finite limits.
///
/// # Examples
///
/// ```
/// use u_spc_trace::spc::estimate_limits;
///
/// let est = estimate_limits(&[10.0, 12.0, 11.0, 100.0], 3, 2.0).unwrap();
/// assert_eq!(est.limits.len(), 4);
/// assert!(100.0 > est.limits[3].ucl);
/// ```
pub fn estimate_limits(
    values: &[f64],
    window: usize,
    multiplier: f64,
) -> Result<LimitEstimate, SkipReason> {
    if window == 0 {
        return Err(SkipReason::Computation("rolling window must be >= 1".into()));
    }
    if !(multiplier.is_finite() && multiplier > 0.0) {
        return Err(SkipReason::Computation(format!(
            "limit multiplier must be positive, got {multiplier}"
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(SkipReason::Computation("non-finite period value".into()));
    }

    let (sigma, method) =
        estimate_sigma(values).ok_or(SkipReason::DegenerateVariation { sigma: f64::NAN })?;
    if !sigma.is_finite() || sigma == 0.0 {
        return Err(SkipReason::DegenerateVariation { sigma });
    }

    let center = rolling_center(values, window)
        .ok_or(SkipReason::DegenerateVariation { sigma })?;
    let half_width = multiplier * sigma;
    let limits: Vec<ControlLimits> = center
        .into_iter()
        .map(|cl| ControlLimits {
            ucl: cl + half_width,
            cl,
            lcl: (cl - half_width).max(0.0),
        })
        .collect();

    if limits
        .iter()
        .any(|l| !(l.ucl.is_finite() && l.cl.is_finite() && l.lcl.is_finite()))
    {
        return Err(SkipReason::Computation("non-finite control limit".into()));
    }

    Ok(LimitEstimate {
        sigma,
        method,
        limits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_ranges_skip_zeros() {
        assert_eq!(moving_ranges(&[10.0, 12.0, 9.0]), vec![2.0, 3.0]);
        assert_eq!(moving_ranges(&[0.0, 5.0, 0.0, 8.0]), vec![3.0]);
        assert!(moving_ranges(&[4.0]).is_empty());
    }

    #[test]
    fn test_sigma_moving_range() {
        // MR = [2, 1] → MR-bar = 1.5 → sigma = 1.5 / 1.128
        let (sigma, method) = estimate_sigma(&[10.0, 12.0, 11.0]).unwrap();
        assert_eq!(method, SigmaMethod::MovingRange);
        assert!((sigma - 1.5 / D2).abs() < 1e-12);
    }

    #[test]
    fn test_sigma_falls_back_to_std_dev() {
        // Two non-zero values → one moving range → sample std dev
        let (sigma, method) = estimate_sigma(&[0.0, 4.0, 0.0, 6.0]).unwrap();
        assert_eq!(method, SigmaMethod::SampleStdDev);
        assert!((sigma - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_sigma_undefined() {
        assert!(estimate_sigma(&[0.0, 0.0, 5.0]).is_none());
        assert!(estimate_sigma(&[]).is_none());
    }

    #[test]
    fn test_rolling_center_min_periods() {
        let cl = rolling_center(&[2.0, 4.0, 6.0, 8.0], 2).unwrap();
        assert_eq!(cl, vec![2.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_rolling_center_interpolates_gap() {
        // window 1: zeros leave holes; ends held flat, middle linear
        let cl = rolling_center(&[0.0, 4.0, 0.0, 0.0, 10.0, 0.0], 1).unwrap();
        let expected = [4.0, 4.0, 6.0, 8.0, 10.0, 10.0];
        assert_eq!(cl.len(), expected.len());
        for (got, want) in cl.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
    }

    #[test]
    fn test_rolling_center_zero_window() {
        assert!(rolling_center(&[1.0, 2.0], 0).is_none());
    }

    #[test]
    fn test_rolling_center_all_zero() {
        assert!(rolling_center(&[0.0, 0.0], 3).is_none());
    }

    #[test]
    fn test_limits_formula() {
        let values = [10.0, 12.0, 11.0, 100.0];
        let est = estimate_limits(&values, 3, 2.0).unwrap();
        // MR = [2, 1, 89] → MR-bar = 92 / 3
        let sigma = (92.0 / 3.0) / D2;
        assert!((est.sigma - sigma).abs() < 1e-9);
        assert!((est.limits[2].cl - 11.0).abs() < 1e-12);
        assert!((est.limits[2].ucl - (11.0 + 2.0 * sigma)).abs() < 1e-9);
        assert!(est.limits[2].lcl.abs() < f64::EPSILON); // clipped at zero
    }

    #[test]
    fn test_lower_limit_clipped() {
        let est = estimate_limits(&[1.0, 50.0, 2.0, 60.0], 2, 3.0).unwrap();
        for l in &est.limits {
            assert!(l.lcl >= 0.0);
            assert!(l.ucl >= l.lcl);
        }
    }

    #[test]
    fn test_constant_series_is_degenerate() {
        let err = estimate_limits(&[5.0, 5.0, 5.0, 5.0], 3, 2.0).unwrap_err();
        assert_eq!(err, SkipReason::DegenerateVariation { sigma: 0.0 });
    }

    #[test]
    fn test_single_non_zero_is_degenerate() {
        assert!(matches!(
            estimate_limits(&[0.0, 7.0, 0.0], 3, 2.0),
            Err(SkipReason::DegenerateVariation { .. })
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            estimate_limits(&[1.0, 2.0, 3.0], 0, 2.0),
            Err(SkipReason::Computation(_))
        ));
        assert!(matches!(
            estimate_limits(&[1.0, 2.0, 3.0], 3, 0.0),
            Err(SkipReason::Computation(_))
        ));
        assert!(matches!(
            estimate_limits(&[1.0, f64::NAN, 3.0], 3, 2.0),
            Err(SkipReason::Computation(_))
        ));
    }
}
