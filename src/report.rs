//! Сводка по датасету и сравнение моделей для терминала и JSON

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use serde::Serialize;

use crate::config::LoanSchema;
use crate::error::Result;
use crate::preprocessing::CleanedLoans;
use crate::types::HarnessOutput;

/// Сколько стран показывать в сводке
pub const TOP_COUNTRIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryDefaults {
    pub country: String,
    pub loans: usize,
    pub defaults: usize,
    pub default_rate: f64,
}

/// Сводка по очищенному датасету
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub dropped_status: usize,
    pub dropped_incomplete: usize,
    pub status_counts: BTreeMap<String, usize>,
    pub default_rate: f64,
    /// Страны с наибольшей долей дефолтов
    pub top_countries: Vec<CountryDefaults>,
}

impl DatasetSummary {
    pub fn from_cleaned(cleaned: &CleanedLoans, schema: &LoanSchema) -> Result<Self> {
        let statuses = cleaned.table.text_column(&schema.status)?;
        let countries = cleaned.table.text_column(&schema.country)?;
        let rows = cleaned.table.n_rows();

        let mut status_counts = BTreeMap::new();
        for status in statuses {
            *status_counts.entry(status.clone()).or_insert(0) += 1;
        }

        // страна -> (займы, дефолты)
        let mut by_country: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for (country, &label) in countries.iter().zip(cleaned.labels.iter()) {
            let entry = by_country.entry(country.as_str()).or_insert((0, 0));
            entry.0 += 1;
            if label > 0.5 {
                entry.1 += 1;
            }
        }

        let mut top_countries: Vec<CountryDefaults> = by_country
            .into_iter()
            .map(|(country, (loans, defaults))| CountryDefaults {
                country: country.to_string(),
                loans,
                defaults,
                default_rate: defaults as f64 / loans as f64,
            })
            .collect();
        top_countries.sort_by(|a, b| {
            b.default_rate
                .total_cmp(&a.default_rate)
                .then_with(|| b.loans.cmp(&a.loans))
                .then_with(|| a.country.cmp(&b.country))
        });
        top_countries.truncate(TOP_COUNTRIES);

        let defaults = cleaned.labels.iter().filter(|&&l| l > 0.5).count();
        let default_rate = if rows > 0 {
            defaults as f64 / rows as f64
        } else {
            0.0
        };

        Ok(Self {
            rows,
            dropped_status: cleaned.dropped_status,
            dropped_incomplete: cleaned.dropped_incomplete,
            status_counts,
            default_rate,
            top_countries,
        })
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("Rows"), Cell::new(self.rows)]);
        for (status, count) in &self.status_counts {
            table.add_row(vec![Cell::new(format!("Status: {}", status)), Cell::new(count)]);
        }
        table.add_row(vec![
            Cell::new("Dropped (status)"),
            Cell::new(self.dropped_status).fg(warn_color(self.dropped_status)),
        ]);
        table.add_row(vec![
            Cell::new("Dropped (incomplete)"),
            Cell::new(self.dropped_incomplete).fg(warn_color(self.dropped_incomplete)),
        ]);
        table.add_row(vec![
            Cell::new("Default rate"),
            Cell::new(format!("{:.2}%", self.default_rate * 100.0)).add_attribute(Attribute::Bold),
        ]);
        table
    }

    pub fn countries_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Country").add_attribute(Attribute::Bold),
            Cell::new("Loans").add_attribute(Attribute::Bold),
            Cell::new("Defaults").add_attribute(Attribute::Bold),
            Cell::new("Default rate").add_attribute(Attribute::Bold),
        ]);
        for row in &self.top_countries {
            table.add_row(vec![
                Cell::new(&row.country),
                Cell::new(row.loans),
                Cell::new(row.defaults),
                Cell::new(format!("{:.2}%", row.default_rate * 100.0)),
            ]);
        }
        table
    }

    pub fn display(&self) {
        println!();
        println!("    DATASET SUMMARY");
        println!("    {}", "─".repeat(50));
        print_indented(&self.table());

        if !self.top_countries.is_empty() {
            println!();
            println!("    TOP COUNTRIES BY DEFAULT RATE");
            println!("    {}", "─".repeat(50));
            print_indented(&self.countries_table());
        }
    }
}

fn warn_color(count: usize) -> Color {
    if count == 0 {
        Color::White
    } else {
        Color::Yellow
    }
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

/// Таблица сравнения моделей на отложенной выборке
pub fn comparison_table(output: &HarnessOutput) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        ["Model", "Accuracy", "Precision", "Recall", "F1", "ROC AUC", "TP", "FP", "TN", "FN"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );

    let best = output
        .models
        .iter()
        .map(|m| m.metrics.f1)
        .fold(f64::NEG_INFINITY, f64::max);

    for result in &output.models {
        let m = &result.metrics;
        let name = if output.models.len() > 1 && m.f1 == best {
            Cell::new(&result.name).fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            Cell::new(&result.name)
        };
        let auc = m
            .roc_auc
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "n/a".to_string());

        table.add_row(vec![
            name,
            Cell::new(format!("{:.4}", m.accuracy)),
            Cell::new(format!("{:.4}", m.precision)),
            Cell::new(format!("{:.4}", m.recall)),
            Cell::new(format!("{:.4}", m.f1)),
            Cell::new(auc),
            Cell::new(m.confusion.true_positive),
            Cell::new(m.confusion.false_positive),
            Cell::new(m.confusion.true_negative),
            Cell::new(m.confusion.false_negative),
        ]);
    }
    table
}

pub fn print_comparison(output: &HarnessOutput) {
    println!();
    println!(
        "    MODEL COMPARISON ({} train / {} test rows)",
        output.n_train,
        output.y_test.len()
    );
    println!("    {}", "─".repeat(50));
    print_indented(&comparison_table(output));
    println!();
}

/// Сохраняет результаты харнесса в JSON
pub fn write_json_report(path: &Path, output: &HarnessOutput) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, output)?;
    tracing::info!("Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassificationMetrics;
    use crate::types::{ColumnValues, ModelResult, RecordTable};
    use ndarray::array;

    fn cleaned() -> CleanedLoans {
        let schema = LoanSchema::default();
        let table = RecordTable::new()
            .with_column(
                schema.country.as_str(),
                ColumnValues::Text(
                    ["Kenya", "Kenya", "Peru", "Peru", "Peru"].iter().map(|s| s.to_string()).collect(),
                ),
            )
            .unwrap()
            .with_column(
                schema.status.as_str(),
                ColumnValues::Text(
                    ["defaulted", "paid", "paid", "paid", "defaulted"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                ),
            )
            .unwrap();
        CleanedLoans {
            table,
            labels: array![1.0, 0.0, 0.0, 0.0, 1.0],
            dropped_status: 2,
            dropped_incomplete: 0,
        }
    }

    #[test]
    fn test_dataset_summary() {
        let summary = DatasetSummary::from_cleaned(&cleaned(), &LoanSchema::default()).unwrap();
        assert_eq!(summary.rows, 5);
        assert_eq!(summary.status_counts["paid"], 3);
        assert_eq!(summary.status_counts["defaulted"], 2);
        assert!((summary.default_rate - 0.4).abs() < 1e-12);

        assert_eq!(summary.top_countries[0].country, "Kenya");
        assert!((summary.top_countries[0].default_rate - 0.5).abs() < 1e-12);
        assert_eq!(summary.top_countries[1].loans, 3);
    }

    #[test]
    fn test_comparison_table_and_json() {
        let y_test = vec![1.0, 0.0, 1.0, 0.0];
        let y_pred = vec![1.0, 0.0, 0.0, 0.0];
        let y_prob = vec![0.9, 0.2, 0.4, 0.1];
        let metrics = ClassificationMetrics::compute(&y_test, &y_pred, &y_prob).unwrap();
        let output = HarnessOutput {
            y_test,
            test_indices: vec![0, 1, 2, 3],
            n_train: 6,
            models: vec![ModelResult {
                name: "Logistic Regression".to_string(),
                y_pred,
                y_prob,
                metrics,
            }],
        };

        let rendered = comparison_table(&output).to_string();
        assert!(rendered.contains("Logistic Regression"));
        assert!(rendered.contains("0.7500"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json_report(&path, &output).unwrap();
        let parsed: HarnessOutput =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.models[0].name, "Logistic Regression");
        assert_eq!(parsed.n_train, 6);
    }
}
