//! Typed errors for data loading and view selection

use std::path::PathBuf;
use thiserror::Error;

/// Failure while reading one of the input tables
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{table} table not found at {}", path.display())]
    MissingFile { table: &'static str, path: PathBuf },

    #[error("{table} table is missing column '{column}'")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("{table} table, row {row}, column '{column}': {reason}")]
    MalformedRow {
        table: &'static str,
        row: usize,
        column: &'static str,
        reason: String,
    },

    #[error("failed to read {table} table: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: polars::prelude::PolarsError,
    },
}

/// Failure while resolving a selection or running an analysis
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("unknown analysis '{0}'")]
    UnknownView(String),

    #[error("cluster {requested} does not exist (valid: 0..{available})")]
    UnknownCluster { requested: usize, available: usize },

    #[error("number of clusters must be between {min} and {max}, got {got}")]
    InvalidClusterCount { got: usize, min: usize, max: usize },

    #[error("need at least {needed} days to form {needed} clusters, found {found}")]
    NotEnoughDays { needed: usize, found: usize },
}
