//! Ошибки библиотеки

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RiskError>;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Column '{column}' has wrong type: expected {expected}")]
    ColumnType { column: String, expected: String },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Convergence failed after {iterations} iterations")]
    Convergence { iterations: usize },

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
