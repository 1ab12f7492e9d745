//! Нейросеть с эмбеддингами категорий
//!
//! Каждая категориальная колонка получает свою таблицу эмбеддингов,
//! векторы конкатенируются с нормализованными ординальными признаками
//! и идут через скрытый ReLU-слой к сигмоиде.

use ndarray::{s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::EmbeddingSettings;
use crate::error::{Result, RiskError};
use crate::models::{sigmoid, Classifier};
use crate::preprocessing::{normalize_column, CategoryVocabulary, NormalizationRange};
use crate::types::RecordTable;

/// Входы модели: индексы категорий и нормализованные ординальные колонки
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingInputs {
    /// n × число категориальных колонок; неизвестная категория = размер словаря - 1
    pub categories: Array2<usize>,
    /// Размер словаря каждой колонки (включая слот неизвестных)
    pub vocab_sizes: Vec<usize>,
    pub ordinal: Array2<f64>,
}

impl EmbeddingInputs {
    pub fn from_table<S: AsRef<str>>(
        table: &RecordTable,
        categorical_columns: &[S],
        ordinal_columns: &[S],
    ) -> Result<Self> {
        let n_rows = table.n_rows();

        let mut categories = Array2::zeros((n_rows, categorical_columns.len()));
        let mut vocab_sizes = Vec::with_capacity(categorical_columns.len());
        for (c, name) in categorical_columns.iter().enumerate() {
            let values = table.column(name.as_ref())?.to_text();
            let vocabulary = CategoryVocabulary::fit(&values);
            for (row, value) in values.iter().enumerate() {
                categories[[row, c]] = vocabulary.embedding_index(value);
            }
            vocab_sizes.push(vocabulary.embedding_vocab_size());
        }

        let mut ordinal = Array2::zeros((n_rows, ordinal_columns.len()));
        for (c, name) in ordinal_columns.iter().enumerate() {
            let values = table.numeric_column(name.as_ref())?;
            ordinal
                .column_mut(c)
                .assign(&normalize_column(values, NormalizationRange::Unit));
        }

        Ok(Self {
            categories,
            vocab_sizes,
            ordinal,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.categories.nrows()
    }

    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            categories: self.categories.select(Axis(0), rows),
            vocab_sizes: self.vocab_sizes.clone(),
            ordinal: self.ordinal.select(Axis(0), rows),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.categories.nrows() != self.ordinal.nrows() {
            return Err(RiskError::Shape {
                expected: format!("{} ordinal rows", self.categories.nrows()),
                actual: format!("{} ordinal rows", self.ordinal.nrows()),
            });
        }
        if self.categories.ncols() != self.vocab_sizes.len() {
            return Err(RiskError::Shape {
                expected: format!("{} categorical columns", self.vocab_sizes.len()),
                actual: format!("{} categorical columns", self.categories.ncols()),
            });
        }
        for (c, &size) in self.vocab_sizes.iter().enumerate() {
            if self.categories.column(c).iter().any(|&idx| idx >= size) {
                return Err(RiskError::Data(format!(
                    "Category index out of vocabulary in column {}",
                    c
                )));
            }
        }
        Ok(())
    }
}

/// Параметры, выученные сетью
struct Network {
    embeddings: Vec<Array2<f64>>,
    offsets: Vec<usize>,
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array1<f64>,
    b2: f64,
    n_ordinal: usize,
}

struct Forward {
    input: Array2<f64>,
    pre_activation: Array2<f64>,
    hidden: Array2<f64>,
    proba: Array1<f64>,
}

impl Network {
    fn init<R: Rng>(vocab_sizes: &[usize], n_ordinal: usize, settings: &EmbeddingSettings, rng: &mut R) -> Self {
        let mut embeddings = Vec::with_capacity(vocab_sizes.len());
        let mut offsets = Vec::with_capacity(vocab_sizes.len());
        let mut width = 0;
        for &size in vocab_sizes {
            let dim = settings.max_embedding_dim.min((size + 1) / 2).max(1);
            embeddings.push(Array2::from_shape_fn((size, dim), |_| rng.gen_range(-0.05..0.05)));
            offsets.push(width);
            width += dim;
        }
        let input_width = width + n_ordinal;
        let hidden = settings.hidden_units;

        // Glorot uniform
        let limit1 = (6.0 / (input_width + hidden) as f64).sqrt();
        let limit2 = (6.0 / (hidden + 1) as f64).sqrt();

        Self {
            embeddings,
            offsets,
            w1: Array2::from_shape_fn((input_width, hidden), |_| rng.gen_range(-limit1..limit1)),
            b1: Array1::zeros(hidden),
            w2: Array1::from_shape_fn(hidden, |_| rng.gen_range(-limit2..limit2)),
            b2: 0.0,
            n_ordinal,
        }
    }

    fn embedding_width(&self) -> usize {
        self.embeddings.iter().map(|e| e.ncols()).sum()
    }

    /// Конкатенация эмбеддингов и ординальных признаков для строк
    fn gather(&self, inputs: &EmbeddingInputs, rows: &[usize]) -> Array2<f64> {
        let emb_width = self.embedding_width();
        let mut input = Array2::zeros((rows.len(), emb_width + self.n_ordinal));
        for (r, &row) in rows.iter().enumerate() {
            for (c, table) in self.embeddings.iter().enumerate() {
                let idx = inputs.categories[[row, c]];
                let offset = self.offsets[c];
                input
                    .slice_mut(s![r, offset..offset + table.ncols()])
                    .assign(&table.row(idx));
            }
            input
                .slice_mut(s![r, emb_width..])
                .assign(&inputs.ordinal.row(row));
        }
        input
    }

    fn forward(&self, inputs: &EmbeddingInputs, rows: &[usize]) -> Forward {
        let input = self.gather(inputs, rows);
        let pre_activation = input.dot(&self.w1) + &self.b1;
        let hidden = pre_activation.mapv(|v| v.max(0.0));
        let proba = (hidden.dot(&self.w2) + self.b2).mapv(sigmoid);
        Forward {
            input,
            pre_activation,
            hidden,
            proba,
        }
    }
}

pub struct EmbeddingClassifier {
    settings: EmbeddingSettings,
    seed: Option<u64>,
    network: Option<Network>,
}

impl EmbeddingClassifier {
    pub fn new(settings: EmbeddingSettings, seed: Option<u64>) -> Self {
        Self {
            settings,
            seed,
            network: None,
        }
    }

    /// Одна эпоха мини-батчевого SGD, возвращает средний взвешенный logloss
    fn train_epoch(
        &self,
        network: &mut Network,
        inputs: &EmbeddingInputs,
        y: &Array1<f64>,
        order: &[usize],
    ) -> f64 {
        let lr = self.settings.learning_rate;
        let weights = self.settings.class_weights;
        let mut epoch_loss = 0.0;

        for batch in order.chunks(self.settings.batch_size) {
            let fwd = network.forward(inputs, batch);
            let n = batch.len() as f64;

            let mut grad_logit = Array1::zeros(batch.len());
            for (k, &row) in batch.iter().enumerate() {
                let p = fwd.proba[k];
                let w = weights.weight(y[row]);
                grad_logit[k] = w * (p - y[row]) / n;
                let p = p.clamp(1e-12, 1.0 - 1e-12);
                epoch_loss -= w * (y[row] * p.ln() + (1.0 - y[row]) * (1.0 - p).ln());
            }

            let grad_w2 = fwd.hidden.t().dot(&grad_logit);
            let grad_b2 = grad_logit.sum();

            let relu_mask = fwd.pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
            let grad_hidden = &grad_logit.view().insert_axis(Axis(1))
                * &network.w2.view().insert_axis(Axis(0))
                * &relu_mask;

            let grad_w1 = fwd.input.t().dot(&grad_hidden);
            let grad_b1 = grad_hidden.sum_axis(Axis(0));
            let grad_input = grad_hidden.dot(&network.w1.t());

            network.w2.scaled_add(-lr, &grad_w2);
            network.b2 -= lr * grad_b2;
            network.w1.scaled_add(-lr, &grad_w1);
            network.b1.scaled_add(-lr, &grad_b1);

            for (r, &row) in batch.iter().enumerate() {
                for c in 0..network.embeddings.len() {
                    let idx = inputs.categories[[row, c]];
                    let offset = network.offsets[c];
                    let dim = network.embeddings[c].ncols();
                    let grad = grad_input.slice(s![r, offset..offset + dim]);
                    network.embeddings[c].row_mut(idx).scaled_add(-lr, &grad);
                }
            }
        }

        epoch_loss / order.len().max(1) as f64
    }
}

impl Default for EmbeddingClassifier {
    fn default() -> Self {
        Self::new(EmbeddingSettings::default(), None)
    }
}

impl Classifier for EmbeddingClassifier {
    type Input = EmbeddingInputs;

    fn name(&self) -> &'static str {
        "Embeddings"
    }

    fn fit(&mut self, inputs: &EmbeddingInputs, y: &Array1<f64>) -> Result<()> {
        inputs.validate()?;
        let n_samples = inputs.n_rows();
        if n_samples == 0 {
            return Err(RiskError::Data("Empty dataset".to_string()));
        }
        if n_samples != y.len() {
            return Err(RiskError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut network = Network::init(
            &inputs.vocab_sizes,
            inputs.ordinal.ncols(),
            &self.settings,
            &mut rng,
        );

        let mut order: Vec<usize> = (0..n_samples).collect();
        for epoch in 0..self.settings.epochs {
            order.shuffle(&mut rng);
            let loss = self.train_epoch(&mut network, inputs, y, &order);
            if !loss.is_finite() {
                return Err(RiskError::Numerical(format!(
                    "Embedding model loss diverged at epoch {}",
                    epoch
                )));
            }
            tracing::debug!("Embeddings epoch {}: loss {:.4}", epoch + 1, loss);
        }

        self.network = Some(network);
        Ok(())
    }

    fn predict_proba(&self, inputs: &EmbeddingInputs) -> Result<Array1<f64>> {
        let network = self.network.as_ref().ok_or(RiskError::ModelNotFitted)?;
        inputs.validate()?;

        let expected: Vec<usize> = network.embeddings.iter().map(|e| e.nrows()).collect();
        if inputs.vocab_sizes != expected || inputs.ordinal.ncols() != network.n_ordinal {
            return Err(RiskError::Shape {
                expected: format!("vocabularies {:?} + {} ordinal", expected, network.n_ordinal),
                actual: format!(
                    "vocabularies {:?} + {} ordinal",
                    inputs.vocab_sizes,
                    inputs.ordinal.ncols()
                ),
            });
        }

        let rows: Vec<usize> = (0..inputs.n_rows()).collect();
        Ok(network.forward(inputs, &rows).proba)
    }
}
