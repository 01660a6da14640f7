//! Command-line interface definitions and argument parsing

use crate::dashboard::DashboardSettings;
use crate::data::DataCache;
use crate::error::DashboardError;
use crate::model::{ClusterParams, MAX_CLUSTERS, MIN_CLUSTERS};
use crate::view::View;
use clap::Parser;
use std::path::PathBuf;

/// Bike-sharing demand analysis dashboard
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the daily usage CSV
    #[arg(long, default_value = "day.csv")]
    pub day: PathBuf,

    /// Path to the hourly usage CSV
    #[arg(long, default_value = "hour.csv")]
    pub hour: PathBuf,

    /// Render a single analysis and exit instead of prompting
    #[arg(long, value_enum)]
    pub view: Option<View>,

    /// Cluster whose statistics are shown by the clustering analysis
    #[arg(long)]
    pub cluster: Option<usize>,

    /// Directory for the generated charts
    #[arg(short, long, default_value = "charts")]
    pub output_dir: PathBuf,

    /// Number of clusters for K-Means
    #[arg(short = 'k', long, default_value = "3")]
    pub clusters: usize,

    /// Seed for K-Means initialization
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Maximum iterations for K-Means algorithm
    #[arg(long, default_value = "300")]
    pub max_iters: u64,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Validate the clustering flags and build the session settings
    pub fn settings(&self) -> crate::Result<DashboardSettings> {
        if !(MIN_CLUSTERS..=MAX_CLUSTERS).contains(&self.clusters) {
            return Err(DashboardError::InvalidClusterCount {
                got: self.clusters,
                min: MIN_CLUSTERS,
                max: MAX_CLUSTERS,
            }
            .into());
        }
        if !(self.tolerance > 0.0) {
            anyhow::bail!("Tolerance must be positive, got {}", self.tolerance);
        }
        if let Some(cluster) = self.cluster {
            if cluster >= self.clusters {
                return Err(DashboardError::UnknownCluster {
                    requested: cluster,
                    available: self.clusters,
                }
                .into());
            }
        }

        Ok(DashboardSettings {
            output_dir: self.output_dir.clone(),
            cluster_params: ClusterParams {
                n_clusters: self.clusters,
                seed: self.seed,
                max_iters: self.max_iters,
                tolerance: self.tolerance,
            },
        })
    }

    /// Cache over the two input tables; nothing is read until first use
    pub fn cache(&self) -> DataCache {
        DataCache::new(&self.day, &self.hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("bikescope").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);

        assert_eq!(args.day, PathBuf::from("day.csv"));
        assert_eq!(args.hour, PathBuf::from("hour.csv"));
        assert_eq!(args.view, None);

        let settings = args.settings().unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("charts"));
        assert_eq!(settings.cluster_params, ClusterParams::default());
    }

    #[test]
    fn test_view_flag() {
        let args = parse(&["--view", "user-types", "--cluster", "2"]);
        assert_eq!(args.view, Some(View::UserTypePatterns));
        assert_eq!(args.cluster, Some(2));

        assert!(Args::try_parse_from(["bikescope", "--view", "forecast"]).is_err());
    }

    #[test]
    fn test_settings_validation() {
        assert!(parse(&["-k", "1"]).settings().is_err());
        assert!(parse(&["-k", "9"]).settings().is_err());
        assert!(parse(&["--tolerance", "0"]).settings().is_err());
        assert!(parse(&["--cluster", "3"]).settings().is_err());

        let settings = parse(&["-k", "4", "--seed", "7", "--cluster", "3"])
            .settings()
            .unwrap();
        assert_eq!(settings.cluster_params.n_clusters, 4);
        assert_eq!(settings.cluster_params.seed, 7);
    }
}
