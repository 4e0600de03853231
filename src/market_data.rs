//! Market-data boundary.
//!
//! Price retrieval is an external collaborator: the core consumes an
//! aligned [`PriceMatrix`] and a live-price mapping, and never performs
//! I/O itself. Hosts implement [`MarketDataSource`] against their
//! provider of choice; [`StaticMarketData`] serves tests and offline
//! snapshots.

use crate::errors::{RvError, RvResult};
use crate::price_matrix::PriceMatrix;
use std::collections::BTreeMap;

/// Source of historical and live prices for a basket of assets.
///
/// Implementations own all network and timeout policy. The contract is
/// strict on alignment: `fetch_history` must return dates ascending with
/// no gaps, one column per requested asset, and `fetch_live_prices` must
/// either quote every requested asset or fail.
pub trait MarketDataSource {
    /// Fetch an aligned daily price history for the requested assets.
    ///
    /// # Arguments
    /// * `asset_ids` - Asset identifiers, e.g. CoinGecko coin ids
    /// * `currency` - Quote currency, e.g. `"usd"`
    /// * `lookback_days` - Number of trailing daily observations
    fn fetch_history(
        &self,
        asset_ids: &[String],
        currency: &str,
        lookback_days: u32,
    ) -> RvResult<PriceMatrix>;

    /// Fetch the most recent quote for each requested asset.
    fn fetch_live_prices(
        &self,
        asset_ids: &[String],
        currency: &str,
    ) -> RvResult<BTreeMap<String, f64>>;
}

/// In-memory market data for tests and offline snapshots.
#[derive(Debug, Clone)]
pub struct StaticMarketData {
    history: PriceMatrix,
    live: BTreeMap<String, f64>,
}

impl StaticMarketData {
    /// Wrap a pre-built history and live-quote mapping.
    pub fn new(history: PriceMatrix, live: BTreeMap<String, f64>) -> Self {
        Self { history, live }
    }
}

impl MarketDataSource for StaticMarketData {
    fn fetch_history(
        &self,
        asset_ids: &[String],
        _currency: &str,
        lookback_days: u32,
    ) -> RvResult<PriceMatrix> {
        Ok(self.history.select(asset_ids)?.tail(lookback_days as usize))
    }

    fn fetch_live_prices(
        &self,
        asset_ids: &[String],
        _currency: &str,
    ) -> RvResult<BTreeMap<String, f64>> {
        let mut quotes = BTreeMap::new();
        for asset in asset_ids {
            let price = self
                .live
                .get(asset)
                .copied()
                .ok_or_else(|| RvError::MissingAsset {
                    asset: asset.clone(),
                })?;
            quotes.insert(asset.clone(), price);
        }
        Ok(quotes)
    }
}
