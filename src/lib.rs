//! Bikescope: an interactive CLI dashboard for bike-sharing demand analysis
//!
//! This library loads the daily and hourly rental tables once per session and
//! renders five canned analyses: usage trend, weather impact, user-type
//! patterns, hourly usage profiles and K-Means clustering of days.

pub mod analysis;
pub mod cli;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod logger;
pub mod model;
pub mod view;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use dashboard::{Dashboard, DashboardSettings, ViewReport};
pub use data::{load_data, BikeData, DailyRecord, DataCache, DayType, HourlyRecord, WeatherSituation};
pub use error::{DashboardError, LoadError};
pub use model::{fit_clusters, ClusterModel, ClusterParams};
pub use view::{compute, View, ViewData, ViewOptions};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
