//! Dashboard controller: cached tables, view dispatch and rendering

use crate::data::{BikeData, DataCache};
use crate::model::ClusterParams;
use crate::view::{compute, View, ViewData, ViewOptions};
use crate::viz::render_view;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Settings fixed for the lifetime of a dashboard session
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    /// Directory the PNG charts are written to
    pub output_dir: PathBuf,
    pub cluster_params: ClusterParams,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("charts"),
            cluster_params: ClusterParams::default(),
        }
    }
}

/// Outcome of rendering one view
#[derive(Debug)]
pub struct ViewReport {
    pub view: View,
    pub data: ViewData,
    /// Charts written for this view, in display order
    pub charts: Vec<PathBuf>,
}

/// One analyst session. Every call to [`Dashboard::show`] recomputes the view
/// from the cached tables; nothing carries over between selections.
#[derive(Debug)]
pub struct Dashboard {
    cache: DataCache,
    settings: DashboardSettings,
}

impl Dashboard {
    pub fn new(cache: DataCache, settings: DashboardSettings) -> Self {
        Self { cache, settings }
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    /// Loaded tables, parsing them on first use
    pub fn data(&self) -> crate::Result<&BikeData> {
        Ok(self.cache.get()?)
    }

    /// Compute and render `view`, with `cluster` as the clustering sub-selection
    pub fn show(&self, view: View, cluster: Option<usize>) -> crate::Result<ViewReport> {
        let data = self.data()?;
        let options = ViewOptions {
            cluster_params: self.settings.cluster_params,
            cluster,
        };

        let started = Instant::now();
        let view_data = compute(view, data, &options)?;
        let charts = render_view(view, &view_data, &self.settings.output_dir)?;

        info!(
            view = view.slug(),
            charts = charts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "view rendered"
        );

        Ok(ViewReport {
            view,
            data: view_data,
            charts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DailyRecord, WeatherSituation};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn create_test_dashboard(output_dir: PathBuf) -> Dashboard {
        let daily = vec![DailyRecord {
            date: NaiveDate::from_ymd_opt(2011, 1, 1).unwrap(),
            count: 100,
            casual: 30,
            registered: 70,
            temp: 0.34,
            atemp: 0.36,
            humidity: 0.8,
            windspeed: 0.16,
            weekday: 6,
            weather: WeatherSituation::MistCloudy,
        }];

        Dashboard::new(
            DataCache::preloaded(BikeData {
                daily,
                hourly: Vec::new(),
            }),
            DashboardSettings {
                output_dir,
                ..DashboardSettings::default()
            },
        )
    }

    #[test]
    fn test_show_user_types() {
        let temp_dir = tempdir().unwrap();
        let dashboard = create_test_dashboard(temp_dir.path().to_path_buf());

        let report = dashboard.show(View::UserTypePatterns, None).unwrap();

        assert_eq!(report.view, View::UserTypePatterns);
        assert_eq!(report.charts.len(), 2);
        assert!(report.charts.iter().all(|c| c.starts_with(temp_dir.path())));
    }

    #[test]
    fn test_clustering_needs_enough_days() {
        let temp_dir = tempdir().unwrap();
        let dashboard = create_test_dashboard(temp_dir.path().to_path_buf());

        // A failed view leaves the session usable
        assert!(dashboard.show(View::Clustering, None).is_err());
        assert!(dashboard.show(View::Trend, None).is_ok());
    }

    #[test]
    fn test_missing_files_surface_as_errors() {
        let temp_dir = tempdir().unwrap();
        let dashboard = Dashboard::new(
            DataCache::new(temp_dir.path().join("day.csv"), temp_dir.path().join("hour.csv")),
            DashboardSettings::default(),
        );

        let err = dashboard.show(View::Trend, None).unwrap_err();
        assert!(err.to_string().contains("daily table not found"));
    }
}
