//! # Basket Relative Value
//!
//! PCA-based relative value analysis for crypto asset baskets.
//!
//! This crate builds a statistical fair-value model for each asset in a
//! basket from the common factors of the basket, measures each asset's
//! deviation from that fair value, tests whether those deviations behave
//! as mean-reverting processes, and derives categorical trade signals
//! from residual quantiles.
//!
//! ## Pipeline
//!
//! 1. **Standardize** each asset's price column (population statistics,
//!    invertible scaler)
//! 2. **Decompose** the standardized matrix with a fixed-rank PCA
//! 3. **Reconstruct** fair values from the retained components and invert
//!    the scaler back to price units
//! 4. **Residuals**: observed minus fair value, plus a column-wise
//!    z-scored form
//! 5. **Test** each residual series for mean reversion (ADF, half-life,
//!    Hurst exponent)
//! 6. **Aggregate** verdicts, residual quantile bands, and live prices
//!    into summary tables and Buy/Sell/No-Position ideas
//!
//! ## Quick Start
//!
//! ```rust
//! use basket_rv::generators::{generate_factor_basket, FactorBasketConfig, GeneratorConfig};
//! use basket_rv::{build_model, summary_table, trade_ideas, SignalConfig};
//! use std::collections::BTreeMap;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A 120-day synthetic basket driven by two common factors.
//!     let prices = generate_factor_basket(
//!         &GeneratorConfig { length: 120, seed: Some(42) },
//!         &FactorBasketConfig {
//!             n_assets: 4,
//!             n_factors: 2,
//!             noise_volatility: 0.5,
//!             base_price: 100.0,
//!         },
//!     )?;
//!
//!     // Live quotes; in production these come from a MarketDataSource.
//!     let live: BTreeMap<String, f64> = prices
//!         .assets()
//!         .iter()
//!         .cloned()
//!         .zip(prices.last_row())
//!         .collect();
//!
//!     let model = build_model(prices)?;
//!     let rows = summary_table(&model, &live, &SignalConfig::default())?;
//!     assert_eq!(rows.len(), 4);
//!
//!     // Only mean-reverting assets appear here.
//!     let ideas = trade_ideas(&model, &live, 0.25)?;
//!     for (asset, signal) in &ideas {
//!         println!("{}: {}", asset, signal);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Scope
//!
//! Price retrieval is an external collaborator behind
//! [`market_data::MarketDataSource`]; the core performs no I/O. Each
//! [`FactorModel`] is fitted once, read-only afterwards, and independent
//! of every other instance, so hosts may fit baskets in parallel freely.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod errors;
pub mod factor_model;
pub mod generators;
pub mod market_data;
pub mod math_utils;
pub mod price_matrix;
pub mod signals;
pub mod stationarity;

// Main public API re-exports
pub use config::{ModelConfig, SignalConfig, DEFAULT_IDEA_QUANTILE_BAND, MIN_OBSERVATIONS};
pub use errors::{RvError, RvResult};
pub use factor_model::{build_model, ColumnScaler, FactorModel};
pub use market_data::{MarketDataSource, StaticMarketData};
pub use price_matrix::PriceMatrix;

// Signal aggregation exports
pub use signals::{
    reversion_bands, stationarity_table, summary_table, trade_ideas, ReversionBand, SignalRow,
    TradeSignal,
};

// Stationarity test exports
pub use stationarity::{
    adf_test, half_life, hurst_exponent, stationarity_verdict, AdfTest, StationarityVerdict,
};
