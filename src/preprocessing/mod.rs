/// Модуль предобработки данных

pub mod encoding;
pub mod feature_engineering;
pub mod normalization;

pub use encoding::{CategoryVocabulary, EncodedFeatures, FeatureColumn, FeatureEncoder};
pub use feature_engineering::{CleanedLoans, FeatureEngineer};
pub use normalization::{normalize_column, ColumnScaler, NormalizationRange};
