//! Analysis selector and the per-view computations

use crate::analysis::{
    correlation, describe, hourly_profiles, mean_by_hour, melt_user_types, usage_by_day_type,
    DayTypeUsage, HourlyMean, HourlyProfile, Summary, UserTypeCount,
};
use crate::data::{BikeData, DailyRecord, DayType, HourlyRecord, WeatherSituation};
use crate::error::DashboardError;
use crate::model::{fit_clusters, ClusterModel, ClusterParams, FEATURE_NAMES};
use chrono::NaiveDate;
use clap::ValueEnum;
use polars::df;
use polars::prelude::*;
use std::fmt;
use std::str::FromStr;

/// The canned analyses offered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum View {
    #[value(name = "trend")]
    Trend,
    #[value(name = "weather")]
    WeatherImpact,
    #[value(name = "user-types")]
    UserTypePatterns,
    #[value(name = "hourly")]
    HourlyUsage,
    #[value(name = "clustering")]
    Clustering,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Trend,
        View::WeatherImpact,
        View::UserTypePatterns,
        View::HourlyUsage,
        View::Clustering,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            View::Trend => "Trend Analysis",
            View::WeatherImpact => "Weather Impact",
            View::UserTypePatterns => "User Type Patterns",
            View::HourlyUsage => "Hourly Usage Analysis",
            View::Clustering => "Clustering Analysis",
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            View::Trend => "Daily Bike Usage Over Time",
            View::WeatherImpact => "Daily Bike Usage vs. Weather Conditions",
            View::UserTypePatterns => "Daily Bike Usage by User Type",
            View::HourlyUsage => "Hourly Bike Usage Analysis",
            View::Clustering => {
                "Clustering of Daily Bike Usage Based on Usage, Temperature, and Humidity"
            }
        }
    }

    /// Short name used on the command line and in chart file names
    pub fn slug(&self) -> &'static str {
        match self {
            View::Trend => "trend",
            View::WeatherImpact => "weather",
            View::UserTypePatterns => "user-types",
            View::HourlyUsage => "hourly",
            View::Clustering => "clustering",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for View {
    type Err = DashboardError;

    /// Accepts either the display label or the short name, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        View::ALL
            .iter()
            .copied()
            .find(|v| v.label().eq_ignore_ascii_case(wanted) || v.slug().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DashboardError::UnknownView(s.to_string()))
    }
}

/// Inputs to a view besides the data itself
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewOptions {
    pub cluster_params: ClusterParams,
    /// Cluster whose statistics are shown by the clustering view
    pub cluster: Option<usize>,
}

/// Total rentals on one date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub count: u32,
}

/// Which weather variable a scatter panel plots against usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherFactor {
    Temperature,
    FeltTemperature,
    Humidity,
    Windspeed,
}

impl WeatherFactor {
    /// Panel order of the 2x2 grid, row-major
    pub const ALL: [WeatherFactor; 4] = [
        WeatherFactor::Temperature,
        WeatherFactor::FeltTemperature,
        WeatherFactor::Humidity,
        WeatherFactor::Windspeed,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            WeatherFactor::Temperature => "Temperature vs. Bike Users",
            WeatherFactor::FeltTemperature => "Felt Temperature vs. Bike Users",
            WeatherFactor::Humidity => "Humidity vs. Bike Users",
            WeatherFactor::Windspeed => "Windspeed vs. Bike Users",
        }
    }

    fn value(&self, record: &DailyRecord) -> f64 {
        match self {
            WeatherFactor::Temperature => record.temp,
            WeatherFactor::FeltTemperature => record.atemp,
            WeatherFactor::Humidity => record.humidity,
            WeatherFactor::Windspeed => record.windspeed,
        }
    }
}

/// One scatter panel of the weather grid: (factor value, count) per day
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherPanel {
    pub factor: WeatherFactor,
    pub points: Vec<(f64, f64)>,
    /// Pearson correlation between the factor and usage, if defined
    pub correlation: Option<f64>,
}

/// A day with its cluster label attached
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusteredDay {
    pub date: NaiveDate,
    pub count: u32,
    pub temp: f64,
    pub humidity: f64,
    pub label: usize,
}

/// `describe()` of the clustered features restricted to one cluster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterStats {
    pub cluster: usize,
    pub count: Summary,
    pub temp: Summary,
    pub humidity: Summary,
}

#[derive(Debug)]
pub struct ClusterView {
    pub days: Vec<ClusteredDay>,
    pub model: ClusterModel,
    pub selected: Option<ClusterStats>,
}

impl ClusterView {
    /// Labels that occur, ascending
    pub fn available_clusters(&self) -> Vec<usize> {
        let mut labels: Vec<usize> = self.days.iter().map(|d| d.label).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// `describe()` of cnt/temp/hum over the days labelled `cluster`
    pub fn stats(&self, cluster: usize) -> crate::Result<ClusterStats> {
        let labels: Vec<u64> = self.days.iter().map(|d| d.label as u64).collect();
        let counts: Vec<f64> = self.days.iter().map(|d| f64::from(d.count)).collect();
        let temps: Vec<f64> = self.days.iter().map(|d| d.temp).collect();
        let humidities: Vec<f64> = self.days.iter().map(|d| d.humidity).collect();

        let members = df!(
            "label" => labels,
            "cnt" => counts,
            "temp" => temps,
            "hum" => humidities
        )?
        .lazy()
        .filter(col("label").eq(lit(cluster as u64)));

        match describe(members, &FEATURE_NAMES)?.as_deref() {
            Some(&[count, temp, humidity]) => Ok(ClusterStats {
                cluster,
                count,
                temp,
                humidity,
            }),
            _ => Err(DashboardError::UnknownCluster {
                requested: cluster,
                available: self.model.n_clusters,
            }
            .into()),
        }
    }
}

/// Everything a view needs to be drawn, one variant per view
#[derive(Debug)]
pub enum ViewData {
    Trend(Vec<TrendPoint>),
    WeatherImpact(Vec<WeatherPanel>),
    UserTypePatterns {
        by_user_type: Vec<UserTypeCount>,
        by_day_type: Vec<DayTypeUsage>,
    },
    HourlyUsage {
        overall: Vec<HourlyMean>,
        by_day_type: Vec<HourlyProfile<DayType>>,
        by_weather: Vec<HourlyProfile<WeatherSituation>>,
    },
    Clustering(ClusterView),
}

/// Compute the data behind `view`. Pure given its inputs.
pub fn compute(view: View, data: &BikeData, options: &ViewOptions) -> crate::Result<ViewData> {
    Ok(match view {
        View::Trend => ViewData::Trend(trend(&data.daily)),
        View::WeatherImpact => ViewData::WeatherImpact(weather_panels(&data.daily)?),
        View::UserTypePatterns => ViewData::UserTypePatterns {
            by_user_type: melt_user_types(&data.daily),
            by_day_type: usage_by_day_type(&data.daily)?,
        },
        View::HourlyUsage => ViewData::HourlyUsage {
            overall: mean_by_hour(&data.hourly)?,
            by_day_type: hourly_profiles(&data.hourly, HourlyRecord::day_type)?,
            by_weather: hourly_profiles(&data.hourly, |r| r.weather)?,
        },
        View::Clustering => ViewData::Clustering(clustering(&data.daily, options)?),
    })
}

pub fn trend(records: &[DailyRecord]) -> Vec<TrendPoint> {
    records
        .iter()
        .map(|r| TrendPoint {
            date: r.date,
            count: r.count,
        })
        .collect()
}

pub fn weather_panels(records: &[DailyRecord]) -> crate::Result<Vec<WeatherPanel>> {
    WeatherFactor::ALL
        .iter()
        .map(|&factor| {
            let points: Vec<(f64, f64)> = records
                .iter()
                .map(|r| (factor.value(r), f64::from(r.count)))
                .collect();
            Ok(WeatherPanel {
                factor,
                correlation: correlation(&points)?,
                points,
            })
        })
        .collect()
}

fn clustering(records: &[DailyRecord], options: &ViewOptions) -> crate::Result<ClusterView> {
    let model = fit_clusters(records, &options.cluster_params)?;

    let days = records
        .iter()
        .zip(model.labels.iter())
        .map(|(r, &label)| ClusteredDay {
            date: r.date,
            count: r.count,
            temp: r.temp,
            humidity: r.humidity,
            label,
        })
        .collect();

    let mut view = ClusterView {
        days,
        model,
        selected: None,
    };
    if let Some(cluster) = options.cluster {
        view.selected = Some(view.stats(cluster)?);
    }

    Ok(view)
}
