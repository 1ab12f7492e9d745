//! One-hot кодирование категорий и сборка матрицы признаков

use std::collections::{BTreeSet, HashMap};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::preprocessing::normalization::{ColumnScaler, NormalizationRange};
use crate::types::RecordTable;

/// Порог числа категорий, после которого предупреждаем о памяти
pub const HIGH_CARDINALITY_WARNING: usize = 1000;

/// Словарь категорий одной колонки; индексы в лексикографическом порядке
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    categories: Vec<String>,
    index: HashMap<String, usize>,
}

impl CategoryVocabulary {
    pub fn fit(values: &[String]) -> Self {
        let categories: Vec<String> = values
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        Self { categories, index }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn get(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    /// Индекс для слоя эмбеддингов: неизвестные категории идут в слот `len()`
    pub fn embedding_index(&self, value: &str) -> usize {
        self.get(value).unwrap_or(self.categories.len())
    }

    /// Размер таблицы эмбеддингов с учётом слота неизвестных
    pub fn embedding_vocab_size(&self) -> usize {
        self.categories.len() + 1
    }
}

/// Описание одной колонки итоговой матрицы
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureColumn {
    OneHot { source: String, category: String },
    Ordinal { source: String, min: f64, max: f64 },
}

impl FeatureColumn {
    pub fn name(&self) -> String {
        match self {
            FeatureColumn::OneHot { source, category } => format!("{}={}", source, category),
            FeatureColumn::Ordinal { source, .. } => source.clone(),
        }
    }
}

/// Матрица признаков вместе с метаданными колонок
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    pub matrix: Array2<f64>,
    pub columns: Vec<FeatureColumn>,
}

impl EncodedFeatures {
    pub fn n_rows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.matrix.ncols()
    }
}

/// Обученный кодировщик: словари категорий + нормализаторы ординальных колонок
///
/// Неизвестная при обучении категория даёт нулевой one-hot блок.
/// Память матрицы O(строки × сумма категорий).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    categorical: Vec<(String, CategoryVocabulary)>,
    ordinal: Vec<(String, ColumnScaler)>,
}

impl FeatureEncoder {
    pub fn fit<S: AsRef<str>>(
        table: &RecordTable,
        categorical_columns: &[S],
        ordinal_columns: &[S],
    ) -> Result<Self> {
        // Сначала проверяем все колонки, чтобы ошибка конфигурации была до вычислений
        for name in categorical_columns.iter().chain(ordinal_columns) {
            table.column(name.as_ref())?;
        }

        let mut categorical = Vec::with_capacity(categorical_columns.len());
        for name in categorical_columns {
            let name = name.as_ref();
            let vocabulary = CategoryVocabulary::fit(&table.column(name)?.to_text());
            if vocabulary.len() > HIGH_CARDINALITY_WARNING {
                tracing::warn!(
                    "Column '{}' has {} categories; one-hot block will use {} x {} cells",
                    name,
                    vocabulary.len(),
                    table.n_rows(),
                    vocabulary.len()
                );
            }
            categorical.push((name.to_string(), vocabulary));
        }

        let mut ordinal = Vec::with_capacity(ordinal_columns.len());
        for name in ordinal_columns {
            let name = name.as_ref();
            let values = table.numeric_column(name)?;
            let scaler = match ColumnScaler::fit(values, NormalizationRange::Unit) {
                Ok(scaler) => scaler,
                // пустая таблица: нормализатор-константа даёт нули
                Err(_) if values.is_empty() => ColumnScaler::fit(&[0.0], NormalizationRange::Unit)?,
                Err(e) => return Err(e),
            };
            if scaler.is_constant() {
                tracing::debug!("Ordinal column '{}' is constant, encoding as zeros", name);
            }
            ordinal.push((name.to_string(), scaler));
        }

        Ok(Self { categorical, ordinal })
    }

    /// Обучение и кодирование одной и той же таблицы
    pub fn encode<S: AsRef<str>>(
        table: &RecordTable,
        categorical_columns: &[S],
        ordinal_columns: &[S],
    ) -> Result<EncodedFeatures> {
        Self::fit(table, categorical_columns, ordinal_columns)?.transform(table)
    }

    pub fn n_features(&self) -> usize {
        self.categorical.iter().map(|(_, v)| v.len()).sum::<usize>() + self.ordinal.len()
    }

    pub fn columns(&self) -> Vec<FeatureColumn> {
        let mut columns = Vec::with_capacity(self.n_features());
        for (source, vocabulary) in &self.categorical {
            for category in vocabulary.categories() {
                columns.push(FeatureColumn::OneHot {
                    source: source.clone(),
                    category: category.clone(),
                });
            }
        }
        for (source, scaler) in &self.ordinal {
            columns.push(FeatureColumn::Ordinal {
                source: source.clone(),
                min: scaler.min(),
                max: scaler.max(),
            });
        }
        columns
    }

    /// Кодирует таблицу; порядок строк сохраняется
    pub fn transform(&self, table: &RecordTable) -> Result<EncodedFeatures> {
        let n_rows = table.n_rows();
        let mut matrix = Array2::zeros((n_rows, self.n_features()));
        let mut offset = 0;
        let mut unknown = 0usize;

        for (name, vocabulary) in &self.categorical {
            let values = table.column(name)?.to_text();
            for (row, value) in values.iter().enumerate() {
                match vocabulary.get(value) {
                    Some(idx) => matrix[[row, offset + idx]] = 1.0,
                    None => unknown += 1,
                }
            }
            offset += vocabulary.len();
        }

        for (name, scaler) in &self.ordinal {
            let values = table.numeric_column(name)?;
            for (row, &value) in values.iter().enumerate() {
                matrix[[row, offset]] = scaler.transform_value(value);
            }
            offset += 1;
        }

        if unknown > 0 {
            tracing::debug!("{} unseen category values encoded as zero blocks", unknown);
        }

        if offset != self.n_features() {
            return Err(RiskError::Shape {
                expected: format!("{} feature columns", self.n_features()),
                actual: format!("{} feature columns", offset),
            });
        }

        Ok(EncodedFeatures {
            matrix,
            columns: self.columns(),
        })
    }
}
