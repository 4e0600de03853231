//! Mathematical utility functions shared across the modeling pipeline.
//!
//! Provides the column statistics, quantile interpolation, and simple
//! regression used by the factor model and the stationarity testers.
//! The regression centers its inputs before accumulating cross products,
//! which keeps the normal equations stable when levels are large relative
//! to their variance (crypto prices routinely are).

use crate::errors::{RvError, RvResult};

/// Minimum variance treated as non-degenerate in regressions and scalers.
pub const MIN_VARIANCE: f64 = 1e-12;

/// Safe comparison for floating point values (pushes NaN to the end).
pub fn float_total_cmp(a: &f64, b: &f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap(),
    }
}

/// Arithmetic mean. Returns NaN for empty input.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divides by n).
///
/// This is the scaler convention: the z-transform of the full fitting
/// window treats the window as the whole population.
pub fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let m = mean(data);
    let var = data.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / data.len() as f64;
    var.sqrt()
}

/// Sample standard deviation (divides by n - 1).
///
/// Residual dispersion uses the sample convention so that live residuals
/// are scaled the same way the historical residual table was.
pub fn sample_std(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return f64::NAN;
    }
    let m = mean(data);
    let var = data.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (data.len() - 1) as f64;
    var.sqrt()
}

/// Calculate a quantile from sorted data using linear interpolation.
///
/// Implements the standard interpolated quantile used by statistical
/// packages: the index `p * (n - 1)` is split into its floor and ceiling
/// neighbours and linearly blended.
///
/// # Arguments
/// * `sorted_data` - Data sorted ascending
/// * `p` - Quantile level in [0, 1]
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return f64::NAN;
    }

    if p <= 0.0 {
        return sorted_data[0];
    }
    if p >= 1.0 {
        return sorted_data[sorted_data.len() - 1];
    }

    let n = sorted_data.len();
    let index = p * (n - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_data[lower]
    } else {
        let weight = index - lower as f64;
        sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight
    }
}

/// Quantile of unsorted data; sorts a copy first.
pub fn quantile(data: &[f64], p: f64) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_by(float_total_cmp);
    percentile(&sorted, p)
}

/// Result of a simple linear regression `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy)]
pub struct OlsFit {
    /// Estimated slope coefficient
    pub slope: f64,
    /// Estimated intercept
    pub intercept: f64,
    /// Standard error of the slope estimate
    pub std_error: f64,
}

/// Ordinary least squares regression of `y` on `x` with an intercept.
///
/// Centers both variables before accumulating cross products to avoid
/// catastrophic cancellation with large levels.
///
/// # Errors
/// * `InsufficientData` if fewer than 3 paired observations
/// * `NumericalError` for non-finite inputs or a constant predictor
///
/// # Example
/// ```rust
/// use basket_rv::math_utils::ols_regression;
///
/// let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// let y = vec![2.0, 4.0, 6.0, 8.0, 10.0];
/// let fit = ols_regression(&x, &y).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-10);
/// ```
pub fn ols_regression(x: &[f64], y: &[f64]) -> RvResult<OlsFit> {
    if x.len() != y.len() || x.len() < 3 {
        return Err(RvError::InsufficientData {
            required: 3,
            actual: x.len().min(y.len()),
        });
    }

    if !x.iter().all(|v| v.is_finite()) || !y.iter().all(|v| v.is_finite()) {
        return Err(RvError::NumericalError {
            reason: "Non-finite values in regression data".to_string(),
        });
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let sxy: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum();
    let sxx: f64 = x
        .iter()
        .map(|xi| {
            let c = xi - mean_x;
            c * c
        })
        .sum();

    if sxx < MIN_VARIANCE {
        return Err(RvError::NumericalError {
            reason: format!(
                "Predictor variance too small for regression: {:.2e}",
                sxx / n
            ),
        });
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    if !slope.is_finite() || !intercept.is_finite() {
        return Err(RvError::NumericalError {
            reason: "Non-finite regression coefficients computed".to_string(),
        });
    }

    let rss: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| {
            let r = yi - (slope * xi + intercept);
            r * r
        })
        .sum();
    let mse = rss / (n - 2.0);
    let std_error = (mse / sxx).sqrt();

    Ok(OlsFit {
        slope,
        intercept,
        std_error,
    })
}
