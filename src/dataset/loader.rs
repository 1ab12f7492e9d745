//! Загрузка CSV в таблицу записей

use std::path::Path;

use polars::prelude::*;

use crate::config::LoanSchema;
use crate::error::{Result, RiskError};
use crate::types::{ColumnValues, RecordTable};

/// Читает CSV целиком
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(RiskError::Config(format!(
            "Dataset not found: {}",
            path.display()
        )));
    }

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()?
        .collect()?;
    Ok(df)
}

/// Числовые колонки -> Numeric (null = NaN), остальные -> Text (null = "")
fn to_column_values(column: &Column) -> Result<ColumnValues> {
    if column.dtype().is_primitive_numeric() {
        let cast = column.cast(&DataType::Float64)?;
        let values = cast
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        return Ok(ColumnValues::Numeric(values));
    }

    let cast = column.cast(&DataType::String)?;
    let values = cast
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or("").to_string())
        .collect();
    Ok(ColumnValues::Text(values))
}

/// Переводит выбранные колонки DataFrame в таблицу записей
pub fn select_columns(df: &DataFrame, columns: &[&str]) -> Result<RecordTable> {
    let mut table = RecordTable::new();
    for &name in columns {
        let column = df
            .column(name)
            .map_err(|_| RiskError::MissingColumn(name.to_string()))?;
        table.push_column(name, to_column_values(column)?)?;
    }
    Ok(table)
}

/// Загружает колонки, нужные пайплайну займов
pub fn load_loans(path: &Path, schema: &LoanSchema) -> Result<RecordTable> {
    let df = read_csv(path)?;
    let (rows, cols) = df.shape();
    tracing::info!("Loaded {}: {} rows, {} columns", path.display(), rows, cols);

    let available: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let has = |name: &str| available.iter().any(|c| c == name);

    let mut columns: Vec<&str> = vec![
        schema.loan_amount.as_str(),
        schema.country.as_str(),
        schema.sector.as_str(),
        schema.activity.as_str(),
        schema.status.as_str(),
    ];
    if has(schema.funded_year.as_str()) && has(schema.funded_month.as_str()) {
        columns.push(schema.funded_year.as_str());
        columns.push(schema.funded_month.as_str());
    } else if has(schema.funded_date.as_str()) {
        tracing::info!(
            "Using '{}' for funded time ({} / {} not present)",
            schema.funded_date,
            schema.funded_year,
            schema.funded_month
        );
        columns.push(schema.funded_date.as_str());
    } else {
        return Err(RiskError::MissingColumn(format!(
            "{} and {} (or {})",
            schema.funded_year, schema.funded_month, schema.funded_date
        )));
    }

    select_columns(&df, &columns)
}
