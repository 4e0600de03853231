//! Error types and validation functions for relative-value analysis.
//!
//! All statistical failures in the pipeline are surfaced as typed errors,
//! never swallowed. The signal aggregator decides per asset whether a
//! failure excludes that asset from trade-idea output; nothing in this
//! crate retries or silently substitutes NaN.

use thiserror::Error;

/// Error types for relative-value model construction and signal derivation.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum RvError {
    /// Insufficient data for the requested computation.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// The factor model cannot be fit on this input.
    #[error("Degenerate model: {reason}")]
    DegenerateModel {
        /// Why the fit is degenerate (component count, zero variance, ...)
        reason: String,
    },

    /// A live-price lookup is missing an asset present in the history.
    #[error("Missing live price for asset '{asset}'")]
    MissingAsset {
        /// Asset identifier absent from the live-price mapping
        asset: String,
    },

    /// The half-life regression produced a non-negative slope, so the
    /// series does not mean-revert and its half-life is undefined.
    #[error("Half-life regression did not converge: slope = {slope}")]
    NonConvergentRegression {
        /// Estimated slope of the lag regression
        slope: f64,
    },

    /// An asset identifier was not found in the fitted model.
    #[error("Asset not found in model: {asset}")]
    AssetNotFound {
        /// Asset identifier that was requested
        asset: String,
    },

    /// Invalid parameter value for model or signal configuration.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Numerical computation error due to instability or singularity.
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for the numerical failure
        reason: String,
    },
}

/// Result type for relative-value analysis operations.
pub type RvResult<T> = Result<T, RvError>;

/// Validates that data has sufficient length for an operation.
///
/// # Arguments
/// * `data` - Input time series data
/// * `min_required` - Minimum number of data points required
/// * `operation` - Name of the operation requiring the data
///
/// # Example
/// ```rust
/// use basket_rv::errors::validate_data_length;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_data_length(&data, 2, "test").is_ok());
/// assert!(validate_data_length(&data, 5, "test").is_err());
/// ```
pub fn validate_data_length(data: &[f64], min_required: usize, _operation: &str) -> RvResult<()> {
    if data.len() < min_required {
        Err(RvError::InsufficientData {
            required: min_required,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Validates that a parameter is within inclusive bounds.
///
/// # Arguments
/// * `value` - Parameter value to validate
/// * `min` - Minimum acceptable value (inclusive)
/// * `max` - Maximum acceptable value (inclusive)
/// * `name` - Parameter name for error reporting
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> RvResult<()> {
    if value.is_nan() {
        return Err(RvError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if value < min || value > max {
        Err(RvError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that all values in a slice are finite.
///
/// Returns on the first non-finite value with its index, which is
/// essential diagnostics for market data that arrived with gaps.
///
/// # Example
/// ```rust
/// use basket_rv::errors::validate_all_finite;
///
/// assert!(validate_all_finite(&[1.0, 2.0], "prices").is_ok());
/// assert!(validate_all_finite(&[1.0, f64::NAN], "prices").is_err());
/// ```
pub fn validate_all_finite(data: &[f64], name: &str) -> RvResult<()> {
    if let Some((i, &value)) = data.iter().enumerate().find(|(_, &v)| !v.is_finite()) {
        return Err(RvError::NumericalError {
            reason: format!("{} contains non-finite value at index {}: {}", name, i, value),
        });
    }
    Ok(())
}
