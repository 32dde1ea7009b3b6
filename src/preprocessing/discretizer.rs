//! Binning / discretization with value substitution
//!
//! A fitted [`Binner`] assigns every value to a bin and then replaces the bin
//! index by the mean of the training values that fell into that bin, so the
//! output stays on the scale of the input.

use super::{map_columns, numeric_values, observed_values, FeatureTransform};
use crate::error::{PrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Edges closer than this are merged
const MIN_BIN_WIDTH: f64 = 1e-8;
const KMEANS_MAX_ITER: usize = 100;

/// Strategy for creating bins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinningStrategy {
    /// Equal-width bins
    #[default]
    Uniform,
    /// Equal-frequency bins (quantiles)
    Quantile,
    /// K-means based binning
    KMeans,
}

impl BinningStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            BinningStrategy::Uniform => "uniform",
            BinningStrategy::Quantile => "quantile",
            BinningStrategy::KMeans => "kmeans",
        }
    }
}

impl FromStr for BinningStrategy {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uniform" => Ok(BinningStrategy::Uniform),
            "quantile" => Ok(BinningStrategy::Quantile),
            "kmeans" => Ok(BinningStrategy::KMeans),
            other => Err(PrepError::ConfigError(format!(
                "unknown discretizer strategy '{other}', expected uniform, quantile or kmeans"
            ))),
        }
    }
}

/// Fitted bins of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBins {
    /// Bin edges, first and last being the training min and max
    edges: Vec<f64>,
    /// Bin index -> mean of the training values in that bin
    value_map: BTreeMap<usize, f64>,
}

impl ColumnBins {
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn value_map(&self) -> &BTreeMap<usize, f64> {
        &self.value_map
    }

    pub fn n_bins(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    /// Bin index of a value: the number of interior edges at or below it.
    /// Values outside the fitted range land in the first or last bin.
    pub fn find_bin(&self, value: f64) -> usize {
        let interior: &[f64] = if self.edges.len() > 2 {
            &self.edges[1..self.edges.len() - 1]
        } else {
            &[]
        };
        interior.partition_point(|&edge| edge <= value)
    }

    /// Substitute value of a bin. A bin that received no training values
    /// borrows the mean of the nearest populated bin, the lower one on ties.
    pub fn bin_value(&self, bin: usize) -> Option<f64> {
        self.value_map.get(&bin).copied().or_else(|| {
            self.value_map
                .iter()
                .min_by_key(|&(&index, _)| (index.abs_diff(bin), index))
                .map(|(_, &value)| value)
        })
    }
}

/// Feature binner/discretizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binner {
    strategy: BinningStrategy,
    n_bins: usize,
    bins: HashMap<String, ColumnBins>,
    is_fitted: bool,
}

impl Binner {
    /// Create a new binner; at least two bins are required
    pub fn new(strategy: BinningStrategy, n_bins: usize) -> Result<Self> {
        if n_bins < 2 {
            return Err(PrepError::ConfigError(format!(
                "discretizer needs at least 2 bins, got {n_bins}"
            )));
        }
        Ok(Self {
            strategy,
            n_bins,
            bins: HashMap::new(),
            is_fitted: false,
        })
    }

    pub fn strategy(&self) -> BinningStrategy {
        self.strategy
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Fitted bins for a column
    pub fn column_bins(&self, column: &str) -> Option<&ColumnBins> {
        self.bins.get(column)
    }

    /// Compute bin edges based on strategy
    fn compute_bin_edges(&self, values: &mut [f64]) -> Vec<f64> {
        values.sort_by(f64::total_cmp);

        let min_val = values[0];
        let max_val = values[values.len() - 1];
        if max_val - min_val <= 0.0 {
            return vec![min_val, max_val];
        }

        let edges: Vec<f64> = match self.strategy {
            BinningStrategy::Uniform => {
                let step = (max_val - min_val) / self.n_bins as f64;
                (0..=self.n_bins)
                    .map(|i| min_val + i as f64 * step)
                    .collect()
            }
            BinningStrategy::Quantile => (0..=self.n_bins)
                .map(|i| quantile_sorted(values, i as f64 / self.n_bins as f64))
                .collect(),
            BinningStrategy::KMeans => self.kmeans_bin_edges(values),
        };

        // Drop edges that would leave a (near) empty-width bin
        let mut kept = Vec::with_capacity(edges.len());
        for (i, &edge) in edges.iter().enumerate() {
            if i == 0 || edge - edges[i - 1] > MIN_BIN_WIDTH {
                kept.push(edge);
            }
        }
        if kept.len() < 2 {
            kept = vec![min_val, max_val];
        }
        kept
    }

    /// K-means based bin edge computation on sorted values
    fn kmeans_bin_edges(&self, values: &[f64]) -> Vec<f64> {
        // Initialize centroids at the midpoints of uniform bins
        let min_val = values[0];
        let max_val = values[values.len() - 1];
        let step = (max_val - min_val) / self.n_bins as f64;

        let mut centroids: Vec<f64> = (0..self.n_bins)
            .map(|i| min_val + (i as f64 + 0.5) * step)
            .collect();

        for _ in 0..KMEANS_MAX_ITER {
            let mut sums = vec![0.0; self.n_bins];
            let mut counts = vec![0usize; self.n_bins];

            for &v in values {
                let nearest = centroids
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| (v - **a).abs().total_cmp(&(v - **b).abs()))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                sums[nearest] += v;
                counts[nearest] += 1;
            }

            let mut converged = true;
            for (i, centroid) in centroids.iter_mut().enumerate() {
                if counts[i] > 0 {
                    let updated = sums[i] / counts[i] as f64;
                    if (updated - *centroid).abs() > 1e-6 {
                        converged = false;
                    }
                    *centroid = updated;
                }
            }

            if converged {
                break;
            }
        }

        // Compute edges as midpoints between sorted centroids
        centroids.sort_by(f64::total_cmp);

        let mut edges = vec![min_val];
        edges.extend(centroids.windows(2).map(|pair| (pair[0] + pair[1]) / 2.0));
        edges.push(max_val);
        edges
    }

    fn fit_column(&self, series: &Series) -> Result<ColumnBins> {
        let mut values = observed_values(series)?;
        if values.is_empty() {
            return Err(PrepError::DataError(format!(
                "column '{}' has no values to bin",
                series.name()
            )));
        }

        let edges = self.compute_bin_edges(&mut values);
        let mut bins = ColumnBins {
            edges,
            value_map: BTreeMap::new(),
        };

        let mut totals: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
        for &v in &values {
            let entry = totals.entry(bins.find_bin(v)).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
        bins.value_map = totals
            .into_iter()
            .map(|(bin, (sum, count))| (bin, sum / count as f64))
            .collect();

        if bins.value_map.values().any(|v| !v.is_finite()) {
            return Err(PrepError::DataError(format!(
                "column '{}' gives non-finite bin means",
                series.name()
            )));
        }
        Ok(bins)
    }

    fn bin_series(series: &Series, bins: &ColumnBins) -> Result<Series> {
        let binned: Float64Chunked = numeric_values(series)?
            .into_iter()
            .map(|opt| match opt {
                Some(v) if !v.is_nan() => bins.bin_value(bins.find_bin(v)),
                other => other,
            })
            .collect();

        Ok(binned.with_name(series.name().clone()).into_series())
    }
}

impl FeatureTransform for Binner {
    fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let bins = self.fit_column(series)?;
            tracing::debug!(
                column = %series.name(),
                strategy = ?self.strategy,
                bins = bins.n_bins(),
                "Fitted discretizer"
            );
            self.bins.insert(series.name().to_string(), bins);
        }

        self.is_fitted = true;
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PrepError::ModelNotFitted);
        }

        map_columns(df, |series| {
            let bins = self.bins.get(series.name().as_str()).ok_or_else(|| {
                PrepError::PreprocessingError(format!(
                    "column '{}' was not seen when the discretizer was fitted",
                    series.name()
                ))
            })?;
            Self::bin_series(series, bins)
        })
    }
}

/// Linear-interpolated quantile of sorted, non-empty values
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
