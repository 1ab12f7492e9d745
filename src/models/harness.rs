//! Обучение и сравнение моделей на общем разбиении train/test

use std::time::Instant;

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::{ModelSelection, ModelSettings, SplitSettings};
use crate::error::{Result, RiskError};
use crate::models::{
    ClassificationMetrics, Classifier, EmbeddingClassifier, EmbeddingInputs, LogisticRegression,
    RandomForest,
};
use crate::preprocessing::{EncodedFeatures, FeatureEncoder};
use crate::types::{HarnessOutput, ModelResult, RecordTable};

/// Индексы строк обучающей и отложенной выборок
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Случайное разбиение: ceil(n * test_fraction) строк уходят в отложенную выборку
pub fn train_test_split(n_rows: usize, test_fraction: f64, seed: Option<u64>) -> Result<SplitIndices> {
    SplitSettings { test_fraction, seed }.validate()?;

    // допуск на ошибку округления, чтобы 10 * 0.3 давало 3
    let n_test = (n_rows as f64 * test_fraction - 1e-9).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(RiskError::Config(format!(
            "Cannot split {} rows with test fraction {}: both sets must be non-empty",
            n_rows, test_fraction
        )));
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut permutation: Vec<usize> = (0..n_rows).collect();
    permutation.shuffle(&mut rng);

    let train = permutation.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: permutation,
    })
}

/// Данные, подготовленные один раз на запуск и общие для всех моделей
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    /// One-hot матрица для логистической регрессии и леса
    pub features: Option<EncodedFeatures>,
    /// Входы модели с эмбеддингами
    pub embedding_inputs: Option<EmbeddingInputs>,
    pub labels: Array1<f64>,
}

impl PreparedDataset {
    /// Строит только те представления, которые нужны выбранным моделям
    pub fn build<S: AsRef<str>>(
        table: &RecordTable,
        labels: Array1<f64>,
        categorical_columns: &[S],
        ordinal_columns: &[S],
        selection: ModelSelection,
    ) -> Result<Self> {
        if table.n_rows() != labels.len() {
            return Err(RiskError::Shape {
                expected: format!("{} labels", table.n_rows()),
                actual: format!("{} labels", labels.len()),
            });
        }

        let features = if selection.needs_feature_matrix() {
            let encoded = FeatureEncoder::encode(table, categorical_columns, ordinal_columns)?;
            tracing::info!(
                "Feature matrix: {} rows x {} columns",
                encoded.n_rows(),
                encoded.n_features()
            );
            Some(encoded)
        } else {
            None
        };

        let embedding_inputs = if selection.runs_embeddings() {
            Some(EmbeddingInputs::from_table(table, categorical_columns, ordinal_columns)?)
        } else {
            None
        };

        Ok(Self {
            features,
            embedding_inputs,
            labels,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }
}

/// Обучающая и отложенная части одного представления
struct SplitData<X> {
    x_train: X,
    x_test: X,
}

pub struct ModelHarness {
    selection: ModelSelection,
    settings: ModelSettings,
    split: SplitSettings,
}

impl ModelHarness {
    pub fn new(selection: ModelSelection, settings: ModelSettings, split: SplitSettings) -> Self {
        Self {
            selection,
            settings,
            split,
        }
    }

    fn model_seed(&self, offset: u64) -> Option<u64> {
        self.split.seed.map(|seed| seed.wrapping_add(offset))
    }

    /// Модели, работающие на one-hot матрице, в порядке отчёта
    fn matrix_models(&self) -> Vec<Box<dyn Classifier<Input = Array2<f64>>>> {
        let mut models: Vec<Box<dyn Classifier<Input = Array2<f64>>>> = Vec::new();
        if self.selection.runs_logistic() {
            models.push(Box::new(LogisticRegression::new(self.settings.logistic.clone())));
        }
        if self.selection.runs_forest() {
            models.push(Box::new(RandomForest::new(
                self.settings.forest.clone(),
                self.model_seed(1),
            )));
        }
        models
    }

    /// Одно разбиение, все выбранные модели; ошибка любой модели прерывает запуск
    pub fn run(&self, dataset: &PreparedDataset) -> Result<HarnessOutput> {
        let n_rows = dataset.n_rows();
        let split = train_test_split(n_rows, self.split.test_fraction, self.split.seed)?;
        tracing::info!(
            "Split {} rows: {} train, {} test",
            n_rows,
            split.train.len(),
            split.test.len()
        );

        let y_train = dataset.labels.select(Axis(0), &split.train);
        let y_test = dataset.labels.select(Axis(0), &split.test);
        let mut results = Vec::new();

        if self.selection.needs_feature_matrix() {
            let features = dataset.features.as_ref().ok_or_else(|| {
                RiskError::Config(format!("'{}' needs an encoded feature matrix", self.selection))
            })?;
            let data = SplitData {
                x_train: features.matrix.select(Axis(0), &split.train),
                x_test: features.matrix.select(Axis(0), &split.test),
            };

            for mut model in self.matrix_models() {
                results.push(evaluate(model.as_mut(), &data, &y_train, &y_test)?);
            }
        }

        if self.selection.runs_embeddings() {
            let inputs = dataset.embedding_inputs.as_ref().ok_or_else(|| {
                RiskError::Config(format!("'{}' needs embedding inputs", self.selection))
            })?;
            let data = SplitData {
                x_train: inputs.select_rows(&split.train),
                x_test: inputs.select_rows(&split.test),
            };

            let mut model = EmbeddingClassifier::new(self.settings.embeddings.clone(), self.model_seed(2));
            results.push(evaluate(&mut model, &data, &y_train, &y_test)?);
        }

        Ok(HarnessOutput {
            y_test: y_test.to_vec(),
            test_indices: split.test,
            n_train: split.train.len(),
            models: results,
        })
    }
}

fn evaluate<C>(
    model: &mut C,
    data: &SplitData<C::Input>,
    y_train: &Array1<f64>,
    y_test: &Array1<f64>,
) -> Result<ModelResult>
where
    C: Classifier + ?Sized,
    C::Input: Sized,
{
    let start = Instant::now();
    tracing::info!("Training {}", model.name());

    model.fit(&data.x_train, y_train)?;
    let y_prob = model.predict_proba(&data.x_test)?;
    let y_pred = model.predict(&data.x_test)?;

    if y_pred.len() != y_test.len() {
        return Err(RiskError::Shape {
            expected: format!("{} predictions", y_test.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }

    let y_pred = y_pred.to_vec();
    let y_prob = y_prob.to_vec();
    let metrics = ClassificationMetrics::compute(&y_test.to_vec(), &y_pred, &y_prob)?;
    tracing::info!(
        "{} done in {:.2?}: accuracy {:.4}",
        model.name(),
        start.elapsed(),
        metrics.accuracy
    );

    Ok(ModelResult {
        name: model.name().to_string(),
        y_pred,
        y_prob,
        metrics,
    })
}
