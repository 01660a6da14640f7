//! Feature standardization and K-Means clustering of daily usage

use crate::data::DailyRecord;
use crate::error::DashboardError;
use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use linfa_preprocessing::linear_scaling::LinearScaler;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Features clustered per day, in column order
pub const FEATURE_NAMES: [&str; 3] = ["cnt", "temp", "hum"];

pub const MIN_CLUSTERS: usize = 2;
pub const MAX_CLUSTERS: usize = 8;

/// Parameters for a clustering run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    pub n_clusters: usize,
    pub seed: u64,
    pub max_iters: u64,
    pub tolerance: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            seed: 42,
            max_iters: 300,
            tolerance: 1e-4,
        }
    }
}

/// Fit a zero-mean, unit-variance scaler over the feature columns.
///
/// Uses the population standard deviation; constant columns are left unscaled.
pub fn fit_scaler(features: &Array2<f64>) -> crate::Result<LinearScaler<f64>> {
    let dataset = Dataset::new(features.clone(), Array1::<usize>::zeros(features.nrows()));
    Ok(LinearScaler::standard().fit(&dataset)?)
}

/// K-Means fitted over standardized daily features
#[derive(Debug)]
pub struct ClusterModel {
    /// Fitted K-Means model from linfa
    pub model: KMeans<f64, L2Dist>,
    pub n_clusters: usize,
    /// Cluster label per input day, in input order
    pub labels: Array1<usize>,
    /// Centroids in standardized space
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares
    pub inertia: f64,
    /// Scaler fitted on the raw features
    pub scaler: LinearScaler<f64>,
}

impl ClusterModel {
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            if label < self.n_clusters {
                sizes[label] += 1;
            }
        }
        sizes
    }

    /// Indices of the input days assigned to `cluster`
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == cluster)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Raw (count, temperature, humidity) matrix, one row per day
pub fn feature_matrix(records: &[DailyRecord]) -> crate::Result<Array2<f64>> {
    let raw: Vec<f64> = records
        .iter()
        .flat_map(|r| [f64::from(r.count), r.temp, r.humidity])
        .collect();

    Ok(Array2::from_shape_vec((records.len(), FEATURE_NAMES.len()), raw)?)
}

/// Standardize the daily features and fit K-Means
///
/// # Arguments
/// * `records` - Daily rows to cluster
/// * `params` - Cluster count, RNG seed and convergence settings
///
/// # Returns
/// * Fitted `ClusterModel`; identical inputs and seed give identical labels
pub fn fit_clusters(records: &[DailyRecord], params: &ClusterParams) -> crate::Result<ClusterModel> {
    let n_clusters = params.n_clusters;
    if !(MIN_CLUSTERS..=MAX_CLUSTERS).contains(&n_clusters) {
        return Err(DashboardError::InvalidClusterCount {
            got: n_clusters,
            min: MIN_CLUSTERS,
            max: MAX_CLUSTERS,
        }
        .into());
    }

    if records.len() < n_clusters {
        return Err(DashboardError::NotEnoughDays {
            needed: n_clusters,
            found: records.len(),
        }
        .into());
    }

    let raw = feature_matrix(records)?;
    let scaler = fit_scaler(&raw)?;
    let features = scaler.transform(raw);

    let targets: Array1<usize> = Array1::zeros(records.len());
    let dataset = Dataset::new(features, targets);

    let rng = StdRng::seed_from_u64(params.seed);
    let model = KMeans::params_with(n_clusters, rng, L2Dist)
        .max_n_iterations(params.max_iters)
        .tolerance(params.tolerance)
        .fit(&dataset)?;

    let labels = model.predict(dataset.records());
    let centroids = model.centroids().clone();
    let inertia = compute_inertia(dataset.records(), &labels, &centroids);

    Ok(ClusterModel {
        model,
        n_clusters,
        labels,
        centroids,
        inertia,
        scaler,
    })
}

/// Within-cluster sum of squares
fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    labels
        .iter()
        .enumerate()
        .filter(|(_, &cluster)| cluster < centroids.nrows())
        .map(|(i, &cluster)| {
            features
                .row(i)
                .iter()
                .zip(centroids.row(cluster).iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
        })
        .sum()
}
