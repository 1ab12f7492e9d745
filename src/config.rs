//! Конфигурация пайплайна и моделей

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Выбор моделей для запуска
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelSelection {
    LogisticRegression,
    RandomForest,
    Embeddings,
    All,
}

impl ModelSelection {
    pub const NAMES: [&'static str; 4] = ["Logistic Regression", "Random Forest", "Embeddings", "All"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSelection::LogisticRegression => "Logistic Regression",
            ModelSelection::RandomForest => "Random Forest",
            ModelSelection::Embeddings => "Embeddings",
            ModelSelection::All => "All",
        }
    }

    pub fn runs_logistic(&self) -> bool {
        matches!(self, ModelSelection::LogisticRegression | ModelSelection::All)
    }

    pub fn runs_forest(&self) -> bool {
        matches!(self, ModelSelection::RandomForest | ModelSelection::All)
    }

    pub fn runs_embeddings(&self) -> bool {
        matches!(self, ModelSelection::Embeddings | ModelSelection::All)
    }

    /// Нужна ли one-hot матрица признаков
    pub fn needs_feature_matrix(&self) -> bool {
        self.runs_logistic() || self.runs_forest()
    }
}

impl FromStr for ModelSelection {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Logistic Regression" => Ok(ModelSelection::LogisticRegression),
            "Random Forest" => Ok(ModelSelection::RandomForest),
            "Embeddings" => Ok(ModelSelection::Embeddings),
            "All" => Ok(ModelSelection::All),
            other => Err(RiskError::Config(format!(
                "Unknown model selection '{}'. Expected one of: {}",
                other,
                Self::NAMES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for ModelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Веса классов в функции потерь
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassWeights {
    #[serde(default = "default_negative_weight")]
    pub negative: f64,
    #[serde(default = "default_positive_weight")]
    pub positive: f64,
}

impl ClassWeights {
    pub const UNIFORM: ClassWeights = ClassWeights { negative: 1.0, positive: 1.0 };

    pub fn weight(&self, label: f64) -> f64 {
        if label > 0.5 {
            self.positive
        } else {
            self.negative
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.negative > 0.0 && self.positive > 0.0) {
            return Err(RiskError::Config(format!(
                "Class weights must be positive, got {{0: {}, 1: {}}}",
                self.negative, self.positive
            )));
        }
        Ok(())
    }
}

impl Default for ClassWeights {
    fn default() -> Self {
        Self {
            negative: default_negative_weight(),
            positive: default_positive_weight(),
        }
    }
}

fn default_negative_weight() -> f64 {
    0.1
}

fn default_positive_weight() -> f64 {
    0.9
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticSettings {
    /// Обратная сила L2-регуляризации
    #[serde(default = "default_inverse_regularization")]
    pub c: f64,
    #[serde(default = "default_logistic_max_iter")]
    pub max_iter: usize,
    #[serde(default = "default_logistic_tol")]
    pub tol: f64,
    #[serde(default)]
    pub class_weights: ClassWeights,
}

fn default_inverse_regularization() -> f64 {
    10.0
}

fn default_logistic_max_iter() -> usize {
    500
}

fn default_logistic_tol() -> f64 {
    1e-4
}

impl Default for LogisticSettings {
    fn default() -> Self {
        Self {
            c: default_inverse_regularization(),
            max_iter: default_logistic_max_iter(),
            tol: default_logistic_tol(),
            class_weights: ClassWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSettings {
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default)]
    pub class_weights: ClassWeights,
}

fn default_n_trees() -> usize {
    25
}

fn default_max_depth() -> usize {
    10
}

fn default_min_samples_split() -> usize {
    2
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            class_weights: ClassWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Верхняя граница размерности эмбеддинга одной колонки
    #[serde(default = "default_max_embedding_dim")]
    pub max_embedding_dim: usize,
    #[serde(default = "default_hidden_units")]
    pub hidden_units: usize,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_uniform_weights")]
    pub class_weights: ClassWeights,
}

fn default_max_embedding_dim() -> usize {
    10
}

fn default_hidden_units() -> usize {
    16
}

fn default_epochs() -> usize {
    10
}

fn default_batch_size() -> usize {
    32
}

fn default_learning_rate() -> f64 {
    0.05
}

fn default_uniform_weights() -> ClassWeights {
    ClassWeights::UNIFORM
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            max_embedding_dim: default_max_embedding_dim(),
            hidden_units: default_hidden_units(),
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            class_weights: default_uniform_weights(),
        }
    }
}

/// Гиперпараметры всех моделей; можно загрузить из JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default)]
    pub logistic: LogisticSettings,
    #[serde(default)]
    pub forest: ForestSettings,
    #[serde(default)]
    pub embeddings: EmbeddingSettings,
}

impl ModelSettings {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings: ModelSettings = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.logistic.class_weights.validate()?;
        self.forest.class_weights.validate()?;
        self.embeddings.class_weights.validate()?;

        if self.logistic.c <= 0.0 {
            return Err(RiskError::Config(format!(
                "Inverse regularization strength must be positive, got {}",
                self.logistic.c
            )));
        }
        if self.forest.n_trees == 0 {
            return Err(RiskError::Config("Random forest needs at least one tree".to_string()));
        }
        if self.embeddings.batch_size == 0 || self.embeddings.hidden_units == 0 {
            return Err(RiskError::Config(
                "Embedding batch size and hidden units must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Параметры разбиения train/test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSettings {
    pub test_fraction: f64,
    /// None: недетерминированное разбиение
    pub seed: Option<u64>,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            test_fraction: 0.3,
            seed: None,
        }
    }
}

impl SplitSettings {
    /// Доля отложенной выборки должна лежать строго в (0, 1)
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(RiskError::Config(format!(
                "Test fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

/// Имена колонок входного датасета
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSchema {
    pub loan_amount: String,
    pub country: String,
    pub sector: String,
    pub activity: String,
    pub status: String,
    pub funded_year: String,
    pub funded_month: String,
    /// Полная дата, если year/month нет
    pub funded_date: String,
    pub funded_time: String,
    pub valid_statuses: Vec<String>,
    pub positive_status: String,
    pub month_weight: f64,
}

impl Default for LoanSchema {
    fn default() -> Self {
        Self {
            loan_amount: "Loan Amount".to_string(),
            country: "Country".to_string(),
            sector: "Sector".to_string(),
            activity: "Activity".to_string(),
            status: "Status".to_string(),
            funded_year: "Funded Date.year".to_string(),
            funded_month: "Funded Date.month".to_string(),
            funded_date: "Funded Date".to_string(),
            funded_time: "Funded Time".to_string(),
            valid_statuses: vec!["paid".to_string(), "defaulted".to_string()],
            positive_status: "defaulted".to_string(),
            month_weight: 0.0833,
        }
    }
}

impl LoanSchema {
    pub fn categorical_columns(&self) -> Vec<String> {
        vec![self.country.clone(), self.sector.clone(), self.activity.clone()]
    }

    pub fn ordinal_columns(&self) -> Vec<String> {
        vec![self.loan_amount.clone(), self.funded_time.clone()]
    }
}
