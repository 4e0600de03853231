//! Configuration for factor-model fitting and signal derivation.
//!
//! Defaults mirror the production setup: a 3-component PCA over at least
//! 60 daily observations, 10%/90% residual quantile bands for the summary
//! table, and the classical mean-reversion acceptance bands for the
//! stationarity testers.

use crate::errors::{RvError, RvResult};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hard floor on fitting-window length; below this PCA and ADF estimates
/// are too unstable to be worth reporting.
pub const MIN_OBSERVATIONS: usize = 30;

/// Default quantile band used by trade-idea derivation.
pub const DEFAULT_IDEA_QUANTILE_BAND: f64 = 0.25;

/// Configuration for fitting the PCA factor model.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModelConfig {
    /// Number of principal components retained for fair-value reconstruction
    pub n_components: usize,
    /// Minimum rows required in the fitting window
    pub min_observations: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_components: 3,
            min_observations: 60,
        }
    }
}

impl ModelConfig {
    /// Validate the configuration against its structural constraints.
    ///
    /// The component-count-versus-asset-count check happens at fit time,
    /// since only the price matrix knows how many assets there are.
    pub fn validate(&self) -> RvResult<()> {
        if self.n_components == 0 {
            return Err(RvError::InvalidParameter {
                parameter: "n_components".to_string(),
                value: 0.0,
                constraint: "must be at least 1".to_string(),
            });
        }
        if self.min_observations < MIN_OBSERVATIONS {
            return Err(RvError::InvalidParameter {
                parameter: "min_observations".to_string(),
                value: self.min_observations as f64,
                constraint: format!("must be at least {}", MIN_OBSERVATIONS),
            });
        }
        Ok(())
    }
}

/// Configuration for stationarity verdicts and signal thresholds.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalConfig {
    /// Quantile band for the summary table; lower bound at this level,
    /// upper bound at one minus this level
    pub quantile_band: f64,
    /// ADF p-value ceiling for the mean-reversion filter
    pub adf_p_max: f64,
    /// Acceptable half-life range in days (exclusive bounds)
    pub half_life_band: (f64, f64),
    /// Acceptable Hurst exponent range (exclusive bounds)
    pub hurst_band: (f64, f64),
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            quantile_band: 0.10,
            adf_p_max: 0.05,
            half_life_band: (1.0, 14.0),
            hurst_band: (0.0, 0.4),
        }
    }
}

impl SignalConfig {
    /// Validate quantile and threshold parameters.
    pub fn validate(&self) -> RvResult<()> {
        if !(self.quantile_band > 0.0 && self.quantile_band < 0.5) {
            return Err(RvError::InvalidParameter {
                parameter: "quantile_band".to_string(),
                value: self.quantile_band,
                constraint: "(0, 0.5)".to_string(),
            });
        }
        if !(self.adf_p_max > 0.0 && self.adf_p_max < 1.0) {
            return Err(RvError::InvalidParameter {
                parameter: "adf_p_max".to_string(),
                value: self.adf_p_max,
                constraint: "(0, 1)".to_string(),
            });
        }
        if self.half_life_band.0 >= self.half_life_band.1 {
            return Err(RvError::InvalidParameter {
                parameter: "half_life_band".to_string(),
                value: self.half_life_band.0,
                constraint: "lower bound below upper bound".to_string(),
            });
        }
        if self.hurst_band.0 >= self.hurst_band.1 {
            return Err(RvError::InvalidParameter {
                parameter: "hurst_band".to_string(),
                value: self.hurst_band.0,
                constraint: "lower bound below upper bound".to_string(),
            });
        }
        Ok(())
    }
}
