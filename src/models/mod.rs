/// ML модели

pub mod embeddings;
pub mod harness;
pub mod logistic;
pub mod metrics;
pub mod random_forest;

use ndarray::Array1;

use crate::error::Result;

pub use embeddings::{EmbeddingClassifier, EmbeddingInputs};
pub use harness::{train_test_split, ModelHarness, PreparedDataset, SplitIndices};
pub use logistic::LogisticRegression;
pub use metrics::ClassificationMetrics;
pub use random_forest::{DecisionTree, RandomForest};

/// Общий интерфейс бинарного классификатора
pub trait Classifier {
    /// Форма входных данных модели
    type Input: ?Sized;

    fn name(&self) -> &'static str;

    fn fit(&mut self, x: &Self::Input, y: &Array1<f64>) -> Result<()>;

    /// Вероятность положительного класса (дефолта)
    fn predict_proba(&self, x: &Self::Input) -> Result<Array1<f64>>;

    fn predict(&self, x: &Self::Input) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }
}

/// Стабильная сигмоида
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
