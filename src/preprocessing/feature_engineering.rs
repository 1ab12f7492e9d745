//! Очистка таблицы займов и производные признаки

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use ndarray::Array1;

use crate::config::LoanSchema;
use crate::error::{Result, RiskError};
use crate::types::{ColumnValues, RecordTable};

/// Очищенная таблица и вектор меток
#[derive(Debug, Clone)]
pub struct CleanedLoans {
    pub table: RecordTable,
    pub labels: Array1<f64>,
    /// Строки со статусом вне допустимого набора
    pub dropped_status: usize,
    /// Строки без суммы или даты финансирования
    pub dropped_incomplete: usize,
}

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Непрерывное время финансирования: год + вес * месяц
    pub fn funded_time(year: f64, month: f64, month_weight: f64) -> f64 {
        year + month_weight * month
    }

    /// Год и месяц из полной даты (RFC 3339, "%Y-%m-%d %H:%M:%S" или "%Y-%m-%d")
    pub fn parse_funded_date(raw: &str) -> Option<(i32, u32)> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some((dt.year(), dt.month()));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return Some((dt.year(), dt.month()));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .map(|d| (d.year(), d.month()))
    }

    /// Бинарные метки: 1.0 для положительного статуса
    pub fn labels(statuses: &[String], positive_status: &str) -> Array1<f64> {
        statuses
            .iter()
            .map(|s| if s == positive_status { 1.0 } else { 0.0 })
            .collect()
    }

    fn funded_times(raw: &RecordTable, schema: &LoanSchema) -> Result<Vec<f64>> {
        if raw.has_column(&schema.funded_year) && raw.has_column(&schema.funded_month) {
            let years = raw.numeric_column(&schema.funded_year)?;
            let months = raw.numeric_column(&schema.funded_month)?;
            return Ok(years
                .iter()
                .zip(months)
                .map(|(&y, &m)| Self::funded_time(y, m, schema.month_weight))
                .collect());
        }

        if raw.has_column(&schema.funded_date) {
            let dates = raw.column(&schema.funded_date)?.to_text();
            return Ok(dates
                .iter()
                .map(|d| match Self::parse_funded_date(d) {
                    Some((y, m)) => Self::funded_time(y as f64, m as f64, schema.month_weight),
                    None => f64::NAN,
                })
                .collect());
        }

        Err(RiskError::MissingColumn(format!(
            "{} and {} (or {})",
            schema.funded_year, schema.funded_month, schema.funded_date
        )))
    }

    /// Оставляет строки с допустимым статусом и полными числовыми полями,
    /// добавляет колонку времени финансирования
    pub fn clean(raw: &RecordTable, schema: &LoanSchema) -> Result<CleanedLoans> {
        for name in [
            &schema.loan_amount,
            &schema.country,
            &schema.sector,
            &schema.activity,
            &schema.status,
        ] {
            raw.column(name)?;
        }

        let funded_time = Self::funded_times(raw, schema)?;
        let statuses = raw.column(&schema.status)?.to_text();
        let amounts = raw.numeric_column(&schema.loan_amount)?;

        let mut keep = Vec::with_capacity(raw.n_rows());
        let mut dropped_status = 0;
        let mut dropped_incomplete = 0;

        for row in 0..raw.n_rows() {
            if !schema.valid_statuses.iter().any(|s| s == &statuses[row]) {
                dropped_status += 1;
            } else if amounts[row].is_nan() || funded_time[row].is_nan() {
                dropped_incomplete += 1;
            } else {
                keep.push(row);
            }
        }

        if dropped_incomplete > 0 {
            tracing::warn!("Dropped {} rows with missing amount or funded date", dropped_incomplete);
        }
        tracing::info!(
            "Cleaning kept {} of {} rows ({} with other statuses)",
            keep.len(),
            raw.n_rows(),
            dropped_status
        );

        let mut table = RecordTable::new();
        table.push_column(
            schema.loan_amount.clone(),
            ColumnValues::Numeric(keep.iter().map(|&i| amounts[i]).collect()),
        )?;
        for name in [&schema.country, &schema.sector, &schema.activity] {
            let values = raw.column(name)?.to_text();
            table.push_column(
                name.clone(),
                ColumnValues::Text(keep.iter().map(|&i| values[i].clone()).collect()),
            )?;
        }

        let kept_statuses: Vec<String> = keep.iter().map(|&i| statuses[i].clone()).collect();
        let labels = Self::labels(&kept_statuses, &schema.positive_status);
        table.push_column(schema.status.clone(), ColumnValues::Text(kept_statuses))?;
        table.push_column(
            schema.funded_time.clone(),
            ColumnValues::Numeric(keep.iter().map(|&i| funded_time[i]).collect()),
        )?;

        Ok(CleanedLoans {
            table,
            labels,
            dropped_status,
            dropped_incomplete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(values: &[&str]) -> ColumnValues {
        ColumnValues::Text(values.iter().map(|s| s.to_string()).collect())
    }

    fn raw_table() -> RecordTable {
        RecordTable::new()
            .with_column("Loan Amount", ColumnValues::Numeric(vec![100.0, 200.0, f64::NAN, 400.0]))
            .unwrap()
            .with_column("Country", text(&["Kenya", "Peru", "Kenya", "Chile"]))
            .unwrap()
            .with_column("Sector", text(&["Food", "Retail", "Food", "Food"]))
            .unwrap()
            .with_column("Activity", text(&["Farming", "Shop", "Farming", "Bakery"]))
            .unwrap()
            .with_column("Status", text(&["paid", "defaulted", "paid", "fundraising"]))
            .unwrap()
            .with_column("Funded Date.year", ColumnValues::Numeric(vec![2010.0, 2011.0, 2012.0, 2013.0]))
            .unwrap()
            .with_column("Funded Date.month", ColumnValues::Numeric(vec![1.0, 12.0, 6.0, 3.0]))
            .unwrap()
    }

    #[test]
    fn test_clean_filters_and_derives() {
        let cleaned = FeatureEngineer::clean(&raw_table(), &LoanSchema::default()).unwrap();

        assert_eq!(cleaned.table.n_rows(), 2);
        assert_eq!(cleaned.dropped_status, 1);
        assert_eq!(cleaned.dropped_incomplete, 1);
        assert_eq!(cleaned.labels.to_vec(), vec![0.0, 1.0]);

        let time = cleaned.table.numeric_column("Funded Time").unwrap();
        assert!((time[0] - 2010.0833).abs() < 1e-9);
        assert!((time[1] - (2011.0 + 0.0833 * 12.0)).abs() < 1e-9);
        assert_eq!(cleaned.table.text_column("Country").unwrap(), &["Kenya", "Peru"]);
    }

    #[test]
    fn test_funded_date_fallback() {
        let raw = RecordTable::new()
            .with_column("Loan Amount", ColumnValues::Numeric(vec![50.0, 75.0]))
            .unwrap()
            .with_column("Country", text(&["Kenya", "Peru"]))
            .unwrap()
            .with_column("Sector", text(&["Food", "Retail"]))
            .unwrap()
            .with_column("Activity", text(&["Farming", "Shop"]))
            .unwrap()
            .with_column("Status", text(&["paid", "defaulted"]))
            .unwrap()
            .with_column("Funded Date", text(&["2012-03-04T10:00:00Z", "not a date"]))
            .unwrap();

        let cleaned = FeatureEngineer::clean(&raw, &LoanSchema::default()).unwrap();
        assert_eq!(cleaned.table.n_rows(), 1);
        assert_eq!(cleaned.dropped_incomplete, 1);
        let time = cleaned.table.numeric_column("Funded Time").unwrap();
        assert!((time[0] - (2012.0 + 0.0833 * 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_required_column() {
        let raw = RecordTable::new()
            .with_column("Loan Amount", ColumnValues::Numeric(vec![1.0]))
            .unwrap();
        let err = FeatureEngineer::clean(&raw, &LoanSchema::default()).unwrap_err();
        assert!(matches!(err, RiskError::MissingColumn(name) if name == "Country"));
    }

    #[test]
    fn test_parse_funded_date_formats() {
        assert_eq!(FeatureEngineer::parse_funded_date("2014-07-01"), Some((2014, 7)));
        assert_eq!(FeatureEngineer::parse_funded_date("2014-07-01 12:30:00"), Some((2014, 7)));
        assert_eq!(FeatureEngineer::parse_funded_date("2014-07-01T12:30:00+03:00"), Some((2014, 7)));
        assert_eq!(FeatureEngineer::parse_funded_date("July 2014"), None);
    }
}
