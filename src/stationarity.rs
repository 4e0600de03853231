//! Mean-reversion tests for residual series.
//!
//! Three independent, stateless tests over a single numeric series:
//!
//! - **Augmented Dickey-Fuller**: unit-root regression with one augmenting
//!   lag, MacKinnon finite-sample critical values, interpolated p-value
//! - **Half-life**: Ornstein-Uhlenbeck decay rate from the lag regression
//!   of first differences
//! - **Hurst exponent**: variance-of-lagged-differences scaling estimate
//!
//! Each consumes one `&[f64]` (normally a z-scored residual column) and
//! shares no state between calls, so verdicts for different assets can be
//! computed in any order or in parallel by the host.

use crate::config::SignalConfig;
use crate::errors::{validate_all_finite, validate_data_length, RvError, RvResult};
use crate::math_utils::ols_regression;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use nalgebra::{DMatrix, DVector};

/// Minimum observations for a usable ADF statistic.
pub const ADF_MIN_POINTS: usize = 20;
/// Default p-value ceiling for rejecting the unit-root null.
pub const DEFAULT_ADF_P_MAX: f64 = 0.05;
/// Minimum observations for the half-life regression.
pub const HALF_LIFE_MIN_POINTS: usize = 10;
/// Exclusive upper bound of the Hurst lag range (lags run 2..20).
pub const HURST_MAX_LAG: usize = 20;
/// Minimum observations for the Hurst dispersion fit.
pub const HURST_MIN_POINTS: usize = HURST_MAX_LAG + 10;

/// Result of an Augmented Dickey-Fuller unit-root test.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdfTest {
    /// t-statistic of the lagged-level coefficient
    pub statistic: f64,
    /// Interpolated p-value for the unit-root null
    pub p_value: f64,
    /// Finite-sample 1% critical value
    pub critical_1pct: f64,
    /// Finite-sample 5% critical value
    pub critical_5pct: f64,
    /// Finite-sample 10% critical value
    pub critical_10pct: f64,
}

impl AdfTest {
    /// True when the unit-root null is rejected at the given p-value ceiling.
    pub fn rejects_unit_root_at(&self, p_max: f64) -> bool {
        self.p_value > 0.0 && self.p_value < p_max
    }

    /// P-value verdict at the conventional 5% level.
    pub fn passes_p_test(&self) -> bool {
        self.rejects_unit_root_at(DEFAULT_ADF_P_MAX)
    }

    /// Critical-value verdict: statistic magnitude beyond the 5% critical
    /// value. Independent of [`AdfTest::passes_p_test`].
    pub fn passes_critical_test(&self) -> bool {
        self.statistic.abs() > self.critical_5pct.abs()
    }
}

/// Augmented Dickey-Fuller test with an intercept and one augmenting lag.
///
/// Estimates `Δy_t = α + β·y_{t-1} + γ·Δy_{t-1} + ε_t` by least squares
/// and reports the t-statistic of `β` against MacKinnon finite-sample
/// critical values. A strongly negative statistic rejects the unit root,
/// i.e. flags the series as mean-reverting.
///
/// # Errors
/// * `InsufficientData` below [`ADF_MIN_POINTS`] observations
/// * `NumericalError` for non-finite input or a singular design matrix
///
/// # References
/// * MacKinnon, J.G. (2010). "Critical Values for Cointegration Tests."
pub fn adf_test(series: &[f64]) -> RvResult<AdfTest> {
    validate_data_length(series, ADF_MIN_POINTS, "ADF test")?;
    validate_all_finite(series, "ADF series")?;

    let n = series.len();
    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // One observation is lost to differencing and one to the augmenting lag.
    let rows = diffs.len() - 1;
    let mut design = DMatrix::zeros(rows, 3);
    let mut response = DVector::zeros(rows);
    for (row, i) in (1..diffs.len()).enumerate() {
        design[(row, 0)] = 1.0;
        design[(row, 1)] = series[i];
        design[(row, 2)] = diffs[i - 1];
        response[row] = diffs[i];
    }

    let svd = design.clone().svd(true, true);
    let beta = svd
        .solve(&response, 1e-12)
        .map_err(|e| RvError::NumericalError {
            reason: format!("ADF regression failed: {}", e),
        })?;

    let fitted = &design * &beta;
    let rss = (&response - fitted).norm_squared();
    let dof = rows.checked_sub(3).filter(|&d| d > 0).ok_or_else(|| {
        RvError::InsufficientData {
            required: ADF_MIN_POINTS,
            actual: n,
        }
    })?;
    let sigma2 = rss / dof as f64;

    let xtx = design.transpose() * &design;
    let xtx_inv = xtx.try_inverse().ok_or_else(|| RvError::NumericalError {
        reason: "singular design matrix in ADF regression".to_string(),
    })?;
    let se = (sigma2 * xtx_inv[(1, 1)]).sqrt();
    if !se.is_finite() || se < 1e-12 {
        return Err(RvError::NumericalError {
            reason: "degenerate standard error in ADF regression".to_string(),
        });
    }

    let statistic = beta[1] / se;

    // MacKinnon finite-sample critical values, constant-only regression.
    let n_inv = 1.0 / n as f64;
    let n_inv2 = n_inv * n_inv;
    let critical_1pct = -3.43035 - 6.5393 * n_inv - 16.786 * n_inv2;
    let critical_5pct = -2.86154 - 2.8903 * n_inv - 4.234 * n_inv2;
    let critical_10pct = -2.56677 - 1.5384 * n_inv - 2.809 * n_inv2;

    let p_value = interpolated_p_value(statistic, critical_1pct, critical_5pct, critical_10pct);

    Ok(AdfTest {
        statistic,
        p_value,
        critical_1pct,
        critical_5pct,
        critical_10pct,
    })
}

/// Linear interpolation of the p-value between tabulated critical values.
fn interpolated_p_value(t_stat: f64, cv_01: f64, cv_05: f64, cv_10: f64) -> f64 {
    if t_stat < cv_01 {
        0.001
    } else if t_stat < cv_05 {
        0.01 + 0.04 * ((cv_05 - t_stat) / (cv_05 - cv_01)).clamp(0.0, 1.0)
    } else if t_stat < cv_10 {
        0.05 + 0.05 * ((cv_10 - t_stat) / (cv_10 - cv_05)).clamp(0.0, 1.0)
    } else if t_stat < 0.0 {
        0.10 + 0.89 * ((0.0 - t_stat) / (0.0 - cv_10)).clamp(0.0, 1.0)
    } else {
        0.99
    }
}

/// Ornstein-Uhlenbeck half-life of mean reversion, in observation units.
///
/// Regresses first differences on the one-step lagged level (lag and
/// difference at the first observation both pinned to zero) and maps the
/// slope to a decay half-life `-ln 2 / slope`.
///
/// # Errors
/// * `NonConvergentRegression` when the slope is non-negative: the series
///   shows no pull toward a mean and its half-life is undefined. Callers
///   must treat this as "not mean-reverting", never as a NaN half-life.
/// * `InsufficientData` below [`HALF_LIFE_MIN_POINTS`] observations
pub fn half_life(series: &[f64]) -> RvResult<f64> {
    validate_data_length(series, HALF_LIFE_MIN_POINTS, "half-life")?;
    validate_all_finite(series, "half-life series")?;

    let n = series.len();
    let mut lag = vec![0.0; n];
    lag[1..n].copy_from_slice(&series[..n - 1]);

    let mut delta: Vec<f64> = series.iter().zip(&lag).map(|(x, l)| x - l).collect();
    delta[0] = 0.0;

    let fit = ols_regression(&lag, &delta)?;
    if fit.slope >= 0.0 {
        return Err(RvError::NonConvergentRegression { slope: fit.slope });
    }

    Ok(-std::f64::consts::LN_2 / fit.slope)
}

/// Hurst exponent via the variance of lagged differences.
///
/// For each lag in `2..HURST_MAX_LAG` computes
/// `sqrt(std(x[lag:] - x[:-lag]))` and fits a line through
/// `log10(lag)` versus `log10` of those dispersions; the exponent is twice
/// the slope. Values below 0.5 indicate mean reversion, 0.5 a random walk,
/// above 0.5 a trending series.
pub fn hurst_exponent(series: &[f64]) -> RvResult<f64> {
    validate_data_length(series, HURST_MIN_POINTS, "Hurst exponent")?;
    validate_all_finite(series, "Hurst series")?;

    let n = series.len();
    let mut log_lags = Vec::with_capacity(HURST_MAX_LAG - 2);
    let mut log_dispersions = Vec::with_capacity(HURST_MAX_LAG - 2);

    for lag in 2..HURST_MAX_LAG {
        let lagged_diffs: Vec<f64> = (lag..n).map(|i| series[i] - series[i - lag]).collect();
        let dispersion = crate::math_utils::population_std(&lagged_diffs);
        if !(dispersion > 0.0) {
            return Err(RvError::NumericalError {
                reason: format!("zero dispersion of lag-{} differences", lag),
            });
        }
        log_lags.push((lag as f64).log10());
        log_dispersions.push(dispersion.sqrt().log10());
    }

    let fit = ols_regression(&log_lags, &log_dispersions)?;
    Ok(2.0 * fit.slope)
}

/// Combined mean-reversion verdict for one residual series.
///
/// Bundles the three test outputs with the boolean verdicts evaluated
/// against the thresholds in [`SignalConfig`]. The half-life is `None`
/// when its regression does not converge (slope >= 0), which counts as
/// out-of-band.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StationarityVerdict {
    /// Full ADF test output
    pub adf: AdfTest,
    /// OU half-life in observation units; `None` if non-mean-reverting
    pub half_life: Option<f64>,
    /// Hurst exponent estimate
    pub hurst: f64,
    /// ADF p-value verdict at the configured ceiling
    pub mean_reverting_by_p: bool,
    /// ADF critical-value verdict at the 5% level
    pub mean_reverting_by_critical: bool,
    /// Half-life within the configured band
    pub half_life_in_band: bool,
    /// Hurst exponent within the configured band
    pub hurst_in_band: bool,
}

/// Run all three stationarity tests on one series.
///
/// ADF and Hurst failures propagate; a non-convergent half-life is
/// recorded as `None` (the series is simply not mean-reverting by that
/// test) rather than failing the whole verdict.
pub fn stationarity_verdict(series: &[f64], config: &SignalConfig) -> RvResult<StationarityVerdict> {
    let adf = adf_test(series)?;

    let half_life = match half_life(series) {
        Ok(value) => Some(value),
        Err(RvError::NonConvergentRegression { slope }) => {
            log::debug!("half-life undefined (slope {:.4} >= 0)", slope);
            None
        }
        Err(err) => return Err(err),
    };

    let hurst = hurst_exponent(series)?;

    let (hl_lo, hl_hi) = config.half_life_band;
    let (h_lo, h_hi) = config.hurst_band;

    Ok(StationarityVerdict {
        adf,
        half_life,
        hurst,
        mean_reverting_by_p: adf.rejects_unit_root_at(config.adf_p_max),
        mean_reverting_by_critical: adf.passes_critical_test(),
        half_life_in_band: half_life.map_or(false, |hl| hl > hl_lo && hl < hl_hi),
        hurst_in_band: hurst > h_lo && hurst < h_hi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{
        generate_ou_process, generate_random_walk, generate_white_noise, GeneratorConfig, OuConfig,
    };
    use assert_approx_eq::assert_approx_eq;

    fn fast_ou(length: usize, seed: u64) -> Vec<f64> {
        let config = GeneratorConfig {
            length,
            seed: Some(seed),
        };
        let ou = OuConfig {
            mean: 0.0,
            reversion_rate: 0.35,
            volatility: 1.0,
        };
        generate_ou_process(&config, &ou).unwrap()
    }

    fn random_walk(length: usize, seed: u64) -> Vec<f64> {
        let config = GeneratorConfig {
            length,
            seed: Some(seed),
        };
        generate_random_walk(&config, 1.0).unwrap()
    }

    #[test]
    fn test_adf_flags_fast_ou_as_stationary() {
        let series = fast_ou(250, 42);
        let adf = adf_test(&series).unwrap();

        assert!(adf.statistic < adf.critical_1pct);
        assert!(adf.passes_p_test(), "p = {}", adf.p_value);
        assert!(adf.passes_critical_test());
    }

    fn drifting_walk(length: usize, seed: u64) -> Vec<f64> {
        // Unit root with drift: the drift dominates the path while the
        // accumulated shocks keep the unit root intact.
        random_walk(length, seed)
            .iter()
            .enumerate()
            .map(|(i, x)| 0.3 * i as f64 + 0.5 * x)
            .collect()
    }

    #[test]
    fn test_adf_does_not_reject_unit_root_with_drift() {
        let series = drifting_walk(250, 42);
        let adf = adf_test(&series).unwrap();

        assert!(!adf.passes_p_test(), "p = {}", adf.p_value);
        assert!(adf.p_value > DEFAULT_ADF_P_MAX);
    }

    #[test]
    fn test_adf_verdicts_are_independent_booleans() {
        // Both verdicts are computed from separate fields; an OU series
        // satisfies both, a random walk neither.
        let ou = adf_test(&fast_ou(300, 7)).unwrap();
        assert!(ou.passes_p_test() && ou.passes_critical_test());

        let walk = adf_test(&drifting_walk(250, 42)).unwrap();
        assert!(!walk.passes_p_test());
        assert!(!walk.passes_critical_test());
    }

    #[test]
    fn test_adf_rejects_short_series() {
        let series = vec![1.0; 10];
        assert!(matches!(
            adf_test(&series),
            Err(RvError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_adf_critical_values_are_ordered() {
        let series = fast_ou(100, 3);
        let adf = adf_test(&series).unwrap();
        assert!(adf.critical_1pct < adf.critical_5pct);
        assert!(adf.critical_5pct < adf.critical_10pct);
    }

    #[test]
    fn test_half_life_of_fast_ou_is_short() {
        // reversion_rate 0.35 decays a deviation by half in about
        // ln(2) / 0.35 ~ 2 observations.
        let series = fast_ou(500, 42);
        let hl = half_life(&series).unwrap();
        assert!(hl > 0.5 && hl < 6.0, "half-life {}", hl);
    }

    #[test]
    fn test_half_life_of_random_walk_is_undefined_or_out_of_band() {
        let series = random_walk(500, 11);
        match half_life(&series) {
            Err(RvError::NonConvergentRegression { .. }) => {}
            Ok(hl) => assert!(hl <= 1.0 || hl >= 14.0, "half-life {}", hl),
            Err(err) => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn test_half_life_of_trending_series_does_not_converge() {
        let series: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert!(matches!(
            half_life(&series),
            Err(RvError::NonConvergentRegression { .. })
        ));
    }

    #[test]
    fn test_hurst_of_random_walk_is_near_half() {
        let series = random_walk(1000, 42);
        let h = hurst_exponent(&series).unwrap();
        assert_approx_eq!(h, 0.5, 0.12);
        assert!(h > 0.4, "random walk must sit outside the reverting band, H = {}", h);
    }

    #[test]
    fn test_hurst_of_white_noise_is_near_zero() {
        // Lagged differences of white noise have lag-independent dispersion,
        // so the scaling slope (and the exponent) collapses toward zero.
        let config = GeneratorConfig {
            length: 1000,
            seed: Some(42),
        };
        let series = generate_white_noise(&config, 1.0).unwrap();
        let h = hurst_exponent(&series).unwrap();
        assert!(h.abs() < 0.15, "H = {}", h);
    }

    #[test]
    fn test_hurst_of_fast_ou_is_in_reverting_band() {
        let series = fast_ou(1000, 42);
        let h = hurst_exponent(&series).unwrap();
        assert!(h > 0.0 && h < 0.4, "H = {}", h);
    }

    #[test]
    fn test_hurst_rejects_constant_series() {
        let series = vec![3.0; 100];
        assert!(matches!(
            hurst_exponent(&series),
            Err(RvError::NumericalError { .. })
        ));
    }

    #[test]
    fn test_verdict_combines_all_tests() {
        let config = SignalConfig::default();
        let verdict = stationarity_verdict(&fast_ou(500, 42), &config).unwrap();

        assert!(verdict.mean_reverting_by_p);
        assert!(verdict.mean_reverting_by_critical);
        assert!(verdict.half_life.is_some());
        assert!(verdict.hurst_in_band);

        let walk = stationarity_verdict(&drifting_walk(500, 42), &config).unwrap();
        assert!(!walk.mean_reverting_by_p);
        assert!(!walk.half_life_in_band);
    }

    #[test]
    fn test_verdict_on_drifting_series_fails_half_life_band() {
        let config = SignalConfig::default();
        let walk = random_walk(300, 5);
        let drifting: Vec<f64> = walk
            .iter()
            .enumerate()
            .map(|(i, x)| i as f64 + 0.2 * x)
            .collect();
        let verdict = stationarity_verdict(&drifting, &config).unwrap();

        // The drift dominates: the half-life regression either fails to
        // converge (recorded as None) or yields a decay far beyond the band.
        assert!(!verdict.half_life_in_band);
    }
}
