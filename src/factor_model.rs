//! PCA fair-value factor model.
//!
//! Fits a fixed-rank principal component decomposition to a standardized
//! price matrix, reconstructs each asset from the retained common factors,
//! and exposes the reconstruction error ("mispricing") as residual and
//! z-scored residual matrices. The fit is a pure function of its input:
//! no randomness, no retries, and the model is read-only once built.

use crate::config::{ModelConfig, MIN_OBSERVATIONS};
use crate::errors::{RvError, RvResult};
use crate::math_utils::{self, MIN_VARIANCE};
use crate::price_matrix::PriceMatrix;
use nalgebra::{DMatrix, SymmetricEigen};

/// Per-column standardization parameters, invertible by construction.
///
/// Uses population statistics over the full fitting window, so the
/// z-transform and its inverse round-trip exactly.
#[derive(Debug, Clone)]
pub struct ColumnScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl ColumnScaler {
    /// Fit per-column mean and population standard deviation.
    ///
    /// # Errors
    /// `DegenerateModel` if any column has (near-)zero variance; a constant
    /// price series carries no information for the factor decomposition.
    pub fn fit(values: &DMatrix<f64>, assets: &[String]) -> RvResult<Self> {
        let mut means = Vec::with_capacity(values.ncols());
        let mut stds = Vec::with_capacity(values.ncols());

        for (j, asset) in assets.iter().enumerate() {
            let column: Vec<f64> = values.column(j).iter().copied().collect();
            let mean = math_utils::mean(&column);
            let std = math_utils::population_std(&column);
            if !std.is_finite() || std * std < MIN_VARIANCE {
                return Err(RvError::DegenerateModel {
                    reason: format!("asset '{}' has zero price variance", asset),
                });
            }
            means.push(mean);
            stds.push(std);
        }

        Ok(Self { means, stds })
    }

    /// Standardize: `z = (x - mean) / std` column-wise.
    pub fn transform(&self, values: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(values.nrows(), values.ncols(), |i, j| {
            (values[(i, j)] - self.means[j]) / self.stds[j]
        })
    }

    /// Invert the standardization back to original units.
    pub fn inverse_transform(&self, standardized: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(standardized.nrows(), standardized.ncols(), |i, j| {
            standardized[(i, j)] * self.stds[j] + self.means[j]
        })
    }

    /// Fitted per-column means.
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Fitted per-column population standard deviations.
    pub fn stds(&self) -> &[f64] {
        &self.stds
    }
}

/// A fitted PCA fair-value model over one price matrix.
///
/// Owns its input and every derived matrix; construct with
/// [`FactorModel::fit`] and treat as immutable afterwards. Refitting on
/// new data means fitting a fresh instance.
#[derive(Debug, Clone)]
pub struct FactorModel {
    prices: PriceMatrix,
    scaler: ColumnScaler,
    /// Component loadings, `n_components` rows by `n_assets` columns.
    loadings: DMatrix<f64>,
    /// Factor scores, one row per date, one column per component.
    scores: DMatrix<f64>,
    /// Fraction of total standardized variance captured per retained component.
    explained_variance_ratio: Vec<f64>,
    predicted: DMatrix<f64>,
    residual: DMatrix<f64>,
    normalized_residual: DMatrix<f64>,
    residual_std: Vec<f64>,
    n_components: usize,
}

impl FactorModel {
    /// Fit the factor model on a price matrix.
    ///
    /// Standardizes each asset column, eigendecomposes the covariance of
    /// the standardized matrix, retains exactly `config.n_components`
    /// components in descending eigenvalue order, reconstructs prices from
    /// those components, and derives the residual and z-scored residual
    /// matrices. Deterministic for a fixed input: eigenvector signs are
    /// normalized so each component's largest-magnitude loading is positive.
    ///
    /// # Errors
    /// * `InsufficientData` - fewer rows than `config.min_observations`
    /// * `DegenerateModel` - `n_components >= n_assets`, or a zero-variance
    ///   price column
    /// * `InvalidParameter` - invalid `config`
    pub fn fit(prices: PriceMatrix, config: &ModelConfig) -> RvResult<Self> {
        config.validate()?;

        let n_rows = prices.n_rows();
        let n_assets = prices.n_assets();
        let required = config.min_observations.max(MIN_OBSERVATIONS);
        if n_rows < required {
            return Err(RvError::InsufficientData {
                required,
                actual: n_rows,
            });
        }
        if config.n_components >= n_assets {
            return Err(RvError::DegenerateModel {
                reason: format!(
                    "{} components leave no residual for {} assets",
                    config.n_components, n_assets
                ),
            });
        }

        let scaler = ColumnScaler::fit(prices.values(), prices.assets())?;
        let standardized = scaler.transform(prices.values());

        // Population covariance of the standardized matrix. Columns are
        // z-scored, so this is the asset correlation matrix.
        let covariance = (standardized.transpose() * &standardized) / n_rows as f64;

        let eigen = SymmetricEigen::new(covariance);
        let mut order: Vec<usize> = (0..n_assets).collect();
        order.sort_by(|&a, &b| {
            math_utils::float_total_cmp(&eigen.eigenvalues[b], &eigen.eigenvalues[a])
        });

        let total_variance: f64 = eigen.eigenvalues.iter().map(|v| v.max(0.0)).sum();
        if total_variance <= 0.0 {
            return Err(RvError::NumericalError {
                reason: "covariance matrix has no positive eigenvalues".to_string(),
            });
        }

        let k = config.n_components;
        let mut loadings = DMatrix::zeros(k, n_assets);
        let mut explained_variance_ratio = Vec::with_capacity(k);
        for (row, &idx) in order.iter().take(k).enumerate() {
            let vector = eigen.eigenvectors.column(idx);
            // Sign convention: largest-magnitude entry positive.
            let dominant = vector
                .iter()
                .cloned()
                .max_by(|a, b| math_utils::float_total_cmp(&a.abs(), &b.abs()))
                .unwrap_or(1.0);
            let sign = if dominant < 0.0 { -1.0 } else { 1.0 };
            for j in 0..n_assets {
                loadings[(row, j)] = sign * vector[j];
            }
            explained_variance_ratio.push(eigen.eigenvalues[idx].max(0.0) / total_variance);
        }

        let scores = &standardized * loadings.transpose();
        let reconstructed = &scores * &loadings;
        let predicted = scaler.inverse_transform(&reconstructed);
        let residual = prices.values() - &predicted;

        let mut residual_mean = Vec::with_capacity(n_assets);
        let mut residual_std = Vec::with_capacity(n_assets);
        for j in 0..n_assets {
            let column: Vec<f64> = residual.column(j).iter().copied().collect();
            residual_mean.push(math_utils::mean(&column));
            residual_std.push(math_utils::sample_std(&column));
        }

        let normalized_residual = DMatrix::from_fn(n_rows, n_assets, |i, j| {
            if residual_std[j] > 0.0 {
                (residual[(i, j)] - residual_mean[j]) / residual_std[j]
            } else {
                // Perfect reconstruction: the residual column is constant
                // and its z-score is identically zero.
                0.0
            }
        });

        Ok(Self {
            prices,
            scaler,
            loadings,
            scores,
            explained_variance_ratio,
            predicted,
            residual,
            normalized_residual,
            residual_std,
            n_components: k,
        })
    }

    /// The input price matrix.
    pub fn prices(&self) -> &PriceMatrix {
        &self.prices
    }

    /// Fitted standardization parameters.
    pub fn scaler(&self) -> &ColumnScaler {
        &self.scaler
    }

    /// Component loadings (`n_components` x `n_assets`).
    pub fn loadings(&self) -> &DMatrix<f64> {
        &self.loadings
    }

    /// Per-date factor scores (`n_rows` x `n_components`).
    pub fn scores(&self) -> &DMatrix<f64> {
        &self.scores
    }

    /// Number of retained components.
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Fraction of standardized variance explained by each retained component.
    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }

    /// Reconstructed fair-value prices, same shape and labels as the input.
    pub fn predicted(&self) -> &DMatrix<f64> {
        &self.predicted
    }

    /// Raw residuals (observed minus predicted) in price units.
    pub fn residuals(&self) -> &DMatrix<f64> {
        &self.residual
    }

    /// Column-wise z-scored residuals.
    pub fn normalized_residuals(&self) -> &DMatrix<f64> {
        &self.normalized_residual
    }

    /// Sample standard deviation of one asset's raw residual series.
    pub fn residual_std(&self, asset: &str) -> RvResult<f64> {
        Ok(self.residual_std[self.asset_index(asset)?])
    }

    /// Most recent reconstructed fair value for one asset.
    pub fn last_predicted(&self, asset: &str) -> RvResult<f64> {
        let idx = self.asset_index(asset)?;
        Ok(self.predicted[(self.prices.n_rows() - 1, idx)])
    }

    /// Full z-scored residual series for one asset.
    pub fn normalized_residual_column(&self, asset: &str) -> RvResult<Vec<f64>> {
        let idx = self.asset_index(asset)?;
        Ok(self.normalized_residual.column(idx).iter().copied().collect())
    }

    /// Most recent in-sample z-scored residual for one asset.
    pub fn last_normalized_residual(&self, asset: &str) -> RvResult<f64> {
        let idx = self.asset_index(asset)?;
        Ok(self.normalized_residual[(self.prices.n_rows() - 1, idx)])
    }

    fn asset_index(&self, asset: &str) -> RvResult<usize> {
        self.prices
            .asset_index(asset)
            .ok_or_else(|| RvError::AssetNotFound {
                asset: asset.to_string(),
            })
    }
}

/// Fit a factor model with the default configuration (3 components over
/// at least 60 observations).
pub fn build_model(prices: PriceMatrix) -> RvResult<FactorModel> {
    FactorModel::fit(prices, &ModelConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{
        generate_factor_basket, FactorBasketConfig, GeneratorConfig,
    };
    use assert_approx_eq::assert_approx_eq;
    use chrono::NaiveDate;

    fn basket(n_assets: usize, n_factors: usize, noise: f64, seed: u64) -> PriceMatrix {
        let config = GeneratorConfig {
            length: 120,
            seed: Some(seed),
        };
        let basket_config = FactorBasketConfig {
            n_assets,
            n_factors,
            noise_volatility: noise,
            base_price: 100.0,
        };
        generate_factor_basket(&config, &basket_config).unwrap()
    }

    #[test]
    fn test_scaler_round_trip() {
        let prices = basket(4, 2, 0.2, 7);
        let scaler = ColumnScaler::fit(prices.values(), prices.assets()).unwrap();
        let z = scaler.transform(prices.values());
        let back = scaler.inverse_transform(&z);

        for i in 0..prices.n_rows() {
            for j in 0..prices.n_assets() {
                assert_approx_eq!(back[(i, j)], prices.values()[(i, j)], 1e-8);
            }
        }

        // Standardized columns have zero mean and unit population variance.
        for j in 0..z.ncols() {
            let column: Vec<f64> = z.column(j).iter().copied().collect();
            assert_approx_eq!(math_utils::mean(&column), 0.0, 1e-10);
            assert_approx_eq!(math_utils::population_std(&column), 1.0, 1e-10);
        }
    }

    #[test]
    fn test_scaler_rejects_constant_column() {
        let dates: Vec<NaiveDate> = (0..40)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i))
            .collect();
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![100.0, 50.0 + i as f64]).collect();
        let prices = PriceMatrix::from_rows(
            dates,
            vec!["flat".to_string(), "moving".to_string()],
            &rows,
        )
        .unwrap();

        assert!(matches!(
            ColumnScaler::fit(prices.values(), prices.assets()),
            Err(RvError::DegenerateModel { .. })
        ));
    }

    #[test]
    fn test_zero_noise_basket_reconstructs_exactly() {
        // Prices built from 2 factors, fit with 2 components: the retained
        // factors span the data and residuals collapse to numerical noise.
        let prices = basket(5, 2, 0.0, 11);
        let config = ModelConfig {
            n_components: 2,
            min_observations: 60,
        };
        let model = FactorModel::fit(prices, &config).unwrap();

        let max_residual = model
            .residuals()
            .iter()
            .fold(0.0_f64, |acc, r| acc.max(r.abs()));
        assert!(
            max_residual < 1e-6,
            "rank-2 basket should reconstruct exactly, max residual {}",
            max_residual
        );
    }

    #[test]
    fn test_normalized_residuals_are_zscored() {
        let prices = basket(4, 2, 0.5, 13);
        let model = FactorModel::fit(prices, &ModelConfig::default()).unwrap();

        for asset in model.prices().assets().to_vec() {
            let column = model.normalized_residual_column(&asset).unwrap();
            assert_approx_eq!(math_utils::mean(&column), 0.0, 1e-8);
            assert_approx_eq!(math_utils::sample_std(&column), 1.0, 1e-8);
        }
    }

    #[test]
    fn test_predicted_shape_matches_input() {
        let prices = basket(4, 2, 0.5, 17);
        let n_rows = prices.n_rows();
        let n_assets = prices.n_assets();
        let model = FactorModel::fit(prices, &ModelConfig::default()).unwrap();

        assert_eq!(model.predicted().nrows(), n_rows);
        assert_eq!(model.predicted().ncols(), n_assets);
        assert_eq!(model.scores().ncols(), 3);
        assert_eq!(model.loadings().nrows(), 3);
        assert_eq!(model.explained_variance_ratio().len(), 3);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let config = ModelConfig::default();
        let model_a = FactorModel::fit(basket(4, 2, 0.5, 19), &config).unwrap();
        let model_b = FactorModel::fit(basket(4, 2, 0.5, 19), &config).unwrap();

        for i in 0..model_a.predicted().nrows() {
            for j in 0..model_a.predicted().ncols() {
                assert_eq!(model_a.predicted()[(i, j)], model_b.predicted()[(i, j)]);
            }
        }
    }

    #[test]
    fn test_explained_variance_is_descending_and_bounded() {
        let prices = basket(6, 2, 0.3, 23);
        let model = FactorModel::fit(prices, &ModelConfig::default()).unwrap();

        let ratios = model.explained_variance_ratio();
        assert!(ratios.windows(2).all(|w| w[0] >= w[1]));
        let total: f64 = ratios.iter().sum();
        assert!(total > 0.0 && total <= 1.0 + 1e-9);
        // Two true factors dominate a rank-2-plus-noise basket.
        assert!(ratios[0] + ratios[1] > 0.8);
    }

    #[test]
    fn test_rejects_component_count_at_asset_count() {
        let prices = basket(3, 2, 0.5, 29);
        let config = ModelConfig {
            n_components: 3,
            min_observations: 60,
        };
        assert!(matches!(
            FactorModel::fit(prices, &config),
            Err(RvError::DegenerateModel { .. })
        ));
    }

    #[test]
    fn test_rejects_short_window() {
        let config = GeneratorConfig {
            length: 40,
            seed: Some(31),
        };
        let basket_config = FactorBasketConfig {
            n_assets: 4,
            n_factors: 2,
            noise_volatility: 0.5,
            base_price: 100.0,
        };
        let prices = generate_factor_basket(&config, &basket_config).unwrap();
        assert!(matches!(
            FactorModel::fit(prices, &ModelConfig::default()),
            Err(RvError::InsufficientData { required: 60, actual: 40 })
        ));
    }

    #[test]
    fn test_unknown_asset_accessors_error() {
        let prices = basket(4, 2, 0.5, 37);
        let model = FactorModel::fit(prices, &ModelConfig::default()).unwrap();

        assert!(matches!(
            model.residual_std("dogecoin"),
            Err(RvError::AssetNotFound { .. })
        ));
        assert!(model.last_predicted("dogecoin").is_err());
        assert!(model.normalized_residual_column("dogecoin").is_err());
    }
}
