/// Типы данных для пайплайна

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::models::metrics::ClassificationMetrics;

/// Значения одной колонки таблицы
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    Text(Vec<String>),
    Numeric(Vec<f64>), // пропуски = NaN
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Text(values) => values.len(),
            ColumnValues::Numeric(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Значения как строки (числовые колонки форматируются)
    pub fn to_text(&self) -> Vec<String> {
        match self {
            ColumnValues::Text(values) => values.clone(),
            ColumnValues::Numeric(values) => values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Таблица записей: упорядоченные именованные колонки одинаковой длины
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordTable {
    names: Vec<String>,
    columns: Vec<ColumnValues>,
    n_rows: usize,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавляет колонку; длина должна совпадать с уже добавленными
    pub fn with_column(mut self, name: impl Into<String>, values: ColumnValues) -> Result<Self> {
        self.push_column(name, values)?;
        Ok(self)
    }

    pub fn push_column(&mut self, name: impl Into<String>, values: ColumnValues) -> Result<()> {
        let name = name.into();
        if !self.columns.is_empty() && values.len() != self.n_rows {
            return Err(RiskError::Shape {
                expected: format!("{} rows in column '{}'", self.n_rows, name),
                actual: format!("{} rows", values.len()),
            });
        }
        if self.names.contains(&name) {
            return Err(RiskError::Data(format!("Duplicate column '{}'", name)));
        }

        self.n_rows = values.len();
        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Result<&ColumnValues> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.columns[idx])
            .ok_or_else(|| RiskError::MissingColumn(name.to_string()))
    }

    pub fn text_column(&self, name: &str) -> Result<&[String]> {
        match self.column(name)? {
            ColumnValues::Text(values) => Ok(values),
            ColumnValues::Numeric(_) => Err(RiskError::ColumnType {
                column: name.to_string(),
                expected: "text".to_string(),
            }),
        }
    }

    pub fn numeric_column(&self, name: &str) -> Result<&[f64]> {
        match self.column(name)? {
            ColumnValues::Numeric(values) => Ok(values),
            ColumnValues::Text(_) => Err(RiskError::ColumnType {
                column: name.to_string(),
                expected: "numeric".to_string(),
            }),
        }
    }
}

/// Результат одной модели на отложенной выборке
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResult {
    pub name: String,
    pub y_pred: Vec<f64>,
    pub y_prob: Vec<f64>,
    pub metrics: ClassificationMetrics,
}

/// Всё, что харнесс передаёт в отчёт
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessOutput {
    pub y_test: Vec<f64>,
    pub test_indices: Vec<usize>,
    pub n_train: usize,
    pub models: Vec<ModelResult>,
}

impl HarnessOutput {
    pub fn model(&self, name: &str) -> Option<&ModelResult> {
        self.models.iter().find(|m| m.name == name)
    }
}
