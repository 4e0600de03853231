//! Signal aggregation: stationarity tables, summary rows, trade ideas.
//!
//! Merges a fitted factor model with live prices and per-asset
//! mean-reversion verdicts into decision tables. Two distinct outputs
//! matter here: the summary table carries every asset with every metric,
//! while the trade-idea table carries only assets that pass the
//! mean-reversion filter. An asset that fails the filter is *absent* from
//! the idea table, not merely labeled flat.

use crate::config::SignalConfig;
use crate::errors::{RvError, RvResult};
use crate::factor_model::FactorModel;
use crate::math_utils::quantile;
use crate::stationarity::{stationarity_verdict, StationarityVerdict};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Categorical trade recommendation for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TradeSignal {
    /// Price depressed below fair value; expect reversion up
    Buy,
    /// Price elevated above fair value; expect reversion down
    Sell,
    /// Residual within its historical band
    NoPosition,
}

impl fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSignal::Buy => write!(f, "Buy"),
            TradeSignal::Sell => write!(f, "Sell"),
            TradeSignal::NoPosition => write!(f, "No Position"),
        }
    }
}

/// One row of the per-asset summary table.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalRow {
    /// Asset identifier
    pub asset: String,
    /// Most recent observed price from the live feed
    pub live_price: f64,
    /// Most recent model fair value
    pub last_predicted: f64,
    /// Live deviation from fair value on the normalized-residual scale
    pub live_residual: f64,
    /// Most recent in-sample z-scored residual
    pub last_residual: f64,
    /// Sample standard deviation of the historical raw residual
    pub residual_std: f64,
    /// Lower quantile of the historical normalized residual
    pub lower_quantile: f64,
    /// Upper quantile of the historical normalized residual
    pub upper_quantile: f64,
    /// Stationarity verdict; `None` when the tests failed for this asset
    pub verdict: Option<StationarityVerdict>,
    /// Derived trade label; `NoPosition` unless the asset is mean-reverting
    pub signal: TradeSignal,
}

/// Mean-reversion band around the latest fair value for one asset.
///
/// Two residual standard deviations to each side of the last predicted
/// level, a quick visual check of how stretched the latest close is.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReversionBand {
    /// Asset identifier
    pub asset: String,
    /// Most recent close in the fitting window
    pub last_price: f64,
    /// Fair value plus two residual standard deviations
    pub upper: f64,
    /// Fair value minus two residual standard deviations
    pub lower: f64,
}

/// Strict-inequality residual classification. Equality with either bound
/// is not a signal.
fn classify_residual(live_residual: f64, lower: f64, upper: f64) -> TradeSignal {
    if live_residual > upper {
        TradeSignal::Sell
    } else if live_residual < lower {
        TradeSignal::Buy
    } else {
        TradeSignal::NoPosition
    }
}

/// Scale a live price onto the historical normalized-residual axis.
fn live_residual_for(
    model: &FactorModel,
    asset: &str,
    live_price: f64,
) -> RvResult<(f64, f64, f64)> {
    let last_predicted = model.last_predicted(asset)?;
    let residual_std = model.residual_std(asset)?;
    if !(residual_std > 0.0) {
        return Err(RvError::NumericalError {
            reason: format!(
                "residual dispersion for '{}' is zero; live deviation is undefined",
                asset
            ),
        });
    }
    Ok((
        (live_price - last_predicted) / residual_std,
        last_predicted,
        residual_std,
    ))
}

/// Every historical asset must have a live quote; a missing one surfaces
/// as an error instead of a silently dropped or NaN row.
fn require_live_price(live_prices: &BTreeMap<String, f64>, asset: &str) -> RvResult<f64> {
    live_prices
        .get(asset)
        .copied()
        .ok_or_else(|| RvError::MissingAsset {
            asset: asset.to_string(),
        })
}

/// Run the stationarity testers over every asset's normalized residual.
///
/// Assets whose tests fail outright are excluded from the table with a
/// warning; the whole basket only errors when no asset could be tested.
pub fn stationarity_table(
    model: &FactorModel,
    config: &SignalConfig,
) -> RvResult<BTreeMap<String, StationarityVerdict>> {
    config.validate()?;

    let mut table = BTreeMap::new();
    for asset in model.prices().assets() {
        let column = model.normalized_residual_column(asset)?;
        match stationarity_verdict(&column, config) {
            Ok(verdict) => {
                table.insert(asset.clone(), verdict);
            }
            Err(err) => {
                log::warn!("stationarity tests failed for '{}': {}", asset, err);
            }
        }
    }

    if table.is_empty() {
        return Err(RvError::NumericalError {
            reason: "stationarity testing failed for every asset in the basket".to_string(),
        });
    }
    Ok(table)
}

/// Build the full per-asset summary table.
///
/// One row per asset in the fitted model, in the model's asset order,
/// combining the live quote, last fair value, live residual, historical
/// quantile band at `config.quantile_band`, and the stationarity verdict.
/// The trade label is evaluated only for assets whose verdict passes the
/// ADF p-value filter; everything else reads `NoPosition`.
///
/// # Errors
/// * `MissingAsset` when any historical asset lacks a live quote
pub fn summary_table(
    model: &FactorModel,
    live_prices: &BTreeMap<String, f64>,
    config: &SignalConfig,
) -> RvResult<Vec<SignalRow>> {
    config.validate()?;

    let mut rows = Vec::with_capacity(model.prices().n_assets());
    for asset in model.prices().assets() {
        let live_price = require_live_price(live_prices, asset)?;
        let (live_residual, last_predicted, residual_std) =
            live_residual_for(model, asset, live_price)?;

        let column = model.normalized_residual_column(asset)?;
        let lower_quantile = quantile(&column, config.quantile_band);
        let upper_quantile = quantile(&column, 1.0 - config.quantile_band);

        let verdict = match stationarity_verdict(&column, config) {
            Ok(verdict) => Some(verdict),
            Err(err) => {
                log::warn!("stationarity tests failed for '{}': {}", asset, err);
                None
            }
        };

        let mean_reverting = verdict
            .as_ref()
            .map(|v| v.mean_reverting_by_p)
            .unwrap_or(false);
        let signal = if mean_reverting {
            classify_residual(live_residual, lower_quantile, upper_quantile)
        } else {
            TradeSignal::NoPosition
        };

        rows.push(SignalRow {
            asset: asset.clone(),
            live_price,
            last_predicted,
            live_residual,
            last_residual: model.last_normalized_residual(asset)?,
            residual_std,
            lower_quantile,
            upper_quantile,
            verdict,
            signal,
        });
    }

    Ok(rows)
}

/// Derive trade ideas for mean-reverting assets only.
///
/// Assets failing the ADF p-value filter (or whose stationarity tests
/// error) do not appear in the result at all. For the rest, the live
/// residual is compared against the historical normalized-residual
/// quantiles at `quantile_band` and `1 - quantile_band` with strict
/// inequalities.
///
/// # Arguments
/// * `quantile_band` - Quantile level in (0, 0.5); see
///   [`crate::config::DEFAULT_IDEA_QUANTILE_BAND`]
///
/// # Errors
/// * `InvalidParameter` for a band outside (0, 0.5)
/// * `MissingAsset` when any historical asset lacks a live quote
pub fn trade_ideas(
    model: &FactorModel,
    live_prices: &BTreeMap<String, f64>,
    quantile_band: f64,
) -> RvResult<BTreeMap<String, TradeSignal>> {
    if !(quantile_band > 0.0 && quantile_band < 0.5) {
        return Err(RvError::InvalidParameter {
            parameter: "quantile_band".to_string(),
            value: quantile_band,
            constraint: "(0, 0.5)".to_string(),
        });
    }

    let config = SignalConfig {
        quantile_band,
        ..SignalConfig::default()
    };

    // Surface missing quotes for the whole basket up front, including
    // assets the filter would later exclude.
    for asset in model.prices().assets() {
        require_live_price(live_prices, asset)?;
    }

    let mut ideas = BTreeMap::new();
    for asset in model.prices().assets() {
        let column = model.normalized_residual_column(asset)?;
        let verdict = match stationarity_verdict(&column, &config) {
            Ok(verdict) => verdict,
            Err(err) => {
                log::warn!("excluding '{}' from trade ideas: {}", asset, err);
                continue;
            }
        };
        if !verdict.mean_reverting_by_p {
            continue;
        }

        let live_price = require_live_price(live_prices, asset)?;
        let (live_residual, _, _) = live_residual_for(model, asset, live_price)?;
        let lower = quantile(&column, quantile_band);
        let upper = quantile(&column, 1.0 - quantile_band);

        ideas.insert(asset.clone(), classify_residual(live_residual, lower, upper));
    }

    Ok(ideas)
}

/// Two-sigma reversion bands around the latest fair value, per asset.
pub fn reversion_bands(model: &FactorModel) -> RvResult<Vec<ReversionBand>> {
    let last_prices = model.prices().last_row();

    let mut bands = Vec::with_capacity(model.prices().n_assets());
    for (j, asset) in model.prices().assets().iter().enumerate() {
        let predicted = model.last_predicted(asset)?;
        let residual_std = model.residual_std(asset)?;
        bands.push(ReversionBand {
            asset: asset.clone(),
            last_price: last_prices[j],
            upper: predicted + 2.0 * residual_std,
            lower: predicted - 2.0 * residual_std,
        });
    }
    Ok(bands)
}
