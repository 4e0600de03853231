//! Aligned date-by-asset price matrix.
//!
//! The matrix is the sole input of the factor model: rows are trading
//! dates in strictly ascending order, columns are asset identifiers, and
//! every cell is a positive finite price. Alignment (filling gaps,
//! dropping partial rows) is the data layer's job; construction here
//! rejects anything that is not already clean.

use crate::errors::{RvError, RvResult};
use chrono::NaiveDate;
use nalgebra::DMatrix;
use std::collections::BTreeSet;

/// A validated price history: dates ascending, one column per asset,
/// no gaps, strictly positive prices.
#[derive(Debug, Clone)]
pub struct PriceMatrix {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    values: DMatrix<f64>,
}

impl PriceMatrix {
    /// Construct a price matrix from pre-aligned data.
    ///
    /// # Arguments
    /// * `dates` - Row labels, strictly ascending and unique
    /// * `assets` - Column labels, unique and non-empty
    /// * `values` - Price levels, `dates.len()` rows by `assets.len()` columns
    ///
    /// # Errors
    /// * `InvalidParameter` for shape mismatches, duplicate or unordered
    ///   dates, duplicate or empty asset ids
    /// * `NumericalError` for non-finite or non-positive prices
    pub fn new(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        values: DMatrix<f64>,
    ) -> RvResult<Self> {
        if dates.is_empty() || assets.is_empty() {
            return Err(RvError::InvalidParameter {
                parameter: "price_matrix".to_string(),
                value: 0.0,
                constraint: "at least one date and one asset".to_string(),
            });
        }
        if values.nrows() != dates.len() || values.ncols() != assets.len() {
            return Err(RvError::InvalidParameter {
                parameter: "price_matrix_shape".to_string(),
                value: values.nrows() as f64,
                constraint: format!("{} rows x {} columns", dates.len(), assets.len()),
            });
        }

        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RvError::InvalidParameter {
                parameter: "dates".to_string(),
                value: dates.len() as f64,
                constraint: "strictly ascending and unique".to_string(),
            });
        }

        if assets.iter().any(|a| a.is_empty()) {
            return Err(RvError::InvalidParameter {
                parameter: "assets".to_string(),
                value: assets.len() as f64,
                constraint: "non-empty asset identifiers".to_string(),
            });
        }
        let unique: BTreeSet<&str> = assets.iter().map(String::as_str).collect();
        if unique.len() != assets.len() {
            return Err(RvError::InvalidParameter {
                parameter: "assets".to_string(),
                value: assets.len() as f64,
                constraint: "unique asset identifiers".to_string(),
            });
        }

        for (j, asset) in assets.iter().enumerate() {
            for i in 0..values.nrows() {
                let price = values[(i, j)];
                if !price.is_finite() || price <= 0.0 {
                    return Err(RvError::NumericalError {
                        reason: format!(
                            "price for '{}' at row {} is not a positive finite number: {}",
                            asset, i, price
                        ),
                    });
                }
            }
        }

        Ok(Self {
            dates,
            assets,
            values,
        })
    }

    /// Construct from row-major price rows (one `Vec` per date).
    pub fn from_rows(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        rows: &[Vec<f64>],
    ) -> RvResult<Self> {
        if rows.len() != dates.len() || rows.iter().any(|r| r.len() != assets.len()) {
            return Err(RvError::InvalidParameter {
                parameter: "price_rows".to_string(),
                value: rows.len() as f64,
                constraint: format!("{} rows of {} prices", dates.len(), assets.len()),
            });
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let values = DMatrix::from_row_slice(dates.len(), assets.len(), &flat);
        Self::new(dates, assets, values)
    }

    /// Number of dates (rows).
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of assets (columns).
    pub fn n_assets(&self) -> usize {
        self.values.ncols()
    }

    /// Row labels.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Column labels.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// The underlying price values (rows = dates, columns = assets).
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Column index of an asset, if present.
    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    /// Full price series for one asset.
    pub fn column(&self, asset: &str) -> RvResult<Vec<f64>> {
        let idx = self
            .asset_index(asset)
            .ok_or_else(|| RvError::AssetNotFound {
                asset: asset.to_string(),
            })?;
        Ok(self.values.column(idx).iter().copied().collect())
    }

    /// Prices on the most recent date, in asset order.
    pub fn last_row(&self) -> Vec<f64> {
        let last = self.values.nrows() - 1;
        self.values.row(last).iter().copied().collect()
    }

    /// Restrict the matrix to the trailing `n` rows.
    ///
    /// Used by offline data sources to emulate a lookback query. Returns
    /// the whole matrix when `n` covers it.
    pub fn tail(&self, n: usize) -> Self {
        if n >= self.n_rows() {
            return self.clone();
        }
        let start = self.n_rows() - n;
        Self {
            dates: self.dates[start..].to_vec(),
            assets: self.assets.clone(),
            values: DMatrix::from_fn(n, self.n_assets(), |i, j| self.values[(start + i, j)]),
        }
    }

    /// Restrict the matrix to a subset of assets, preserving request order.
    pub fn select(&self, asset_ids: &[String]) -> RvResult<Self> {
        let mut indices = Vec::with_capacity(asset_ids.len());
        for asset in asset_ids {
            let idx = self
                .asset_index(asset)
                .ok_or_else(|| RvError::AssetNotFound {
                    asset: asset.clone(),
                })?;
            indices.push(idx);
        }
        let values = DMatrix::from_fn(self.n_rows(), indices.len(), |i, j| {
            self.values[(i, indices[j])]
        });
        Self::new(self.dates.clone(), asset_ids.to_vec(), values)
    }
}
