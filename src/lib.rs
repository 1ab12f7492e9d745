//! Loan Risk - обучение и сравнение моделей дефолта по займам

pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod preprocessing;
pub mod report;
pub mod types;

pub use config::{LoanSchema, ModelSelection, ModelSettings, SplitSettings};
pub use error::{Result, RiskError};
pub use models::{Classifier, ModelHarness, PreparedDataset};
pub use preprocessing::{FeatureEncoder, FeatureEngineer};
pub use types::{HarnessOutput, ModelResult, RecordTable};
