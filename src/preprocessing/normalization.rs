//! Нормализация числовых колонок в ограниченный диапазон

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Целевой диапазон нормализации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormalizationRange {
    /// [0, 1]
    #[default]
    Unit,
    /// [-1, 1]
    Centered,
}

/// Min/max нормализатор одной колонки
///
/// Для константной колонки (max == min) выдаёт нули в обоих режимах:
/// 0 соответствует нижней границе [0, 1] и середине [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScaler {
    min: f64,
    max: f64,
    range: NormalizationRange,
}

impl ColumnScaler {
    /// Min и max считаются по всей колонке; NaN пропускаются
    pub fn fit(values: &[f64], range: NormalizationRange) -> Result<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in values.iter().filter(|v| !v.is_nan()) {
            min = min.min(v);
            max = max.max(v);
        }

        if !min.is_finite() || !max.is_finite() {
            return Err(RiskError::Data(
                "Cannot normalize a column without finite values".to_string(),
            ));
        }

        Ok(Self { min, max, range })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn is_constant(&self) -> bool {
        self.max == self.min
    }

    pub fn transform_value(&self, value: f64) -> f64 {
        if self.is_constant() {
            return 0.0;
        }

        let unit = (value - self.min) / (self.max - self.min);
        match self.range {
            NormalizationRange::Unit => unit,
            NormalizationRange::Centered => unit * 2.0 - 1.0,
        }
    }

    pub fn transform(&self, values: &[f64]) -> Array1<f64> {
        values.iter().map(|&v| self.transform_value(v)).collect()
    }
}

/// Нормализует колонку целиком
///
/// Пустая колонка и колонка без конечных значений дают нули той же длины.
pub fn normalize_column(values: &[f64], range: NormalizationRange) -> Array1<f64> {
    match ColumnScaler::fit(values, range) {
        Ok(scaler) => scaler.transform(values),
        Err(_) => Array1::zeros(values.len()),
    }
}
