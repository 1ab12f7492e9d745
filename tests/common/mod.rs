//! Общие фикстуры для интеграционных тестов

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use loan_risk::types::{ColumnValues, RecordTable};
use tempfile::TempDir;

const COUNTRIES: [&str; 4] = ["Kenya", "Peru", "Chile", "Togo"];
const SECTORS: [&str; 3] = ["Food", "Retail", "Services"];
const ACTIVITIES: [&str; 3] = ["Farming", "Shop", "Bakery"];

pub fn text(values: &[&str]) -> ColumnValues {
    ColumnValues::Text(values.iter().map(|s| s.to_string()).collect())
}

/// 10 строк: Country (3 значения), Sector (2), одна ординальная колонка
pub fn small_loan_table() -> RecordTable {
    RecordTable::new()
        .with_column(
            "Country",
            text(&["Kenya", "Peru", "Chile", "Kenya", "Peru", "Chile", "Kenya", "Peru", "Chile", "Kenya"]),
        )
        .unwrap()
        .with_column(
            "Sector",
            text(&["Food", "Retail", "Food", "Retail", "Food", "Retail", "Food", "Retail", "Food", "Retail"]),
        )
        .unwrap()
        .with_column(
            "Loan Amount",
            ColumnValues::Numeric(vec![100.0, 250.0, 400.0, 550.0, 700.0, 850.0, 1000.0, 1150.0, 1300.0, 1450.0]),
        )
        .unwrap()
}

pub struct LoanRow {
    pub amount: f64,
    pub country: &'static str,
    pub sector: &'static str,
    pub activity: &'static str,
    pub status: &'static str,
    pub year: i32,
    pub month: i32,
}

/// Детерминированный датасет, где дефолт зависит от страны и суммы
pub fn synthetic_loans(n: usize) -> Vec<LoanRow> {
    (0..n)
        .map(|i| {
            let country = COUNTRIES[i % COUNTRIES.len()];
            let amount = 100.0 + ((i * 37) % 1000) as f64;
            let risky = country == "Togo" || (country == "Peru" && amount > 600.0);
            LoanRow {
                amount,
                country,
                sector: SECTORS[(i / 2) % SECTORS.len()],
                activity: ACTIVITIES[(i / 3) % ACTIVITIES.len()],
                status: if risky { "defaulted" } else { "paid" },
                year: 2006 + (i % 8) as i32,
                month: 1 + (i % 12) as i32,
            }
        })
        .collect()
}

/// Таблица займов в памяти, как её выдаёт очистка
pub fn synthetic_table(n: usize) -> (RecordTable, Vec<f64>) {
    let rows = synthetic_loans(n);
    let labels = rows
        .iter()
        .map(|r| if r.status == "defaulted" { 1.0 } else { 0.0 })
        .collect();
    let column = |f: fn(&LoanRow) -> &'static str| {
        ColumnValues::Text(rows.iter().map(|r| f(r).to_string()).collect())
    };

    let table = RecordTable::new()
        .with_column("Loan Amount", ColumnValues::Numeric(rows.iter().map(|r| r.amount).collect()))
        .unwrap()
        .with_column("Country", column(|r| r.country))
        .unwrap()
        .with_column("Sector", column(|r| r.sector))
        .unwrap()
        .with_column("Activity", column(|r| r.activity))
        .unwrap()
        .with_column(
            "Funded Time",
            ColumnValues::Numeric(
                rows.iter()
                    .map(|r| r.year as f64 + 0.0833 * r.month as f64)
                    .collect(),
            ),
        )
        .unwrap();
    (table, labels)
}

/// Пишет CSV с колонками входного датасета займов
pub fn write_loans_csv(n: usize) -> (TempDir, PathBuf) {
    let mut lines =
        vec!["Loan Amount,Country,Sector,Activity,Status,Funded Date.year,Funded Date.month".to_string()];
    for r in synthetic_loans(n) {
        lines.push(format!(
            "{},{},{},{},{},{},{}",
            r.amount, r.country, r.sector, r.activity, r.status, r.year, r.month
        ));
    }
    write_csv("loans.csv", &lines)
}

/// Пишет произвольный CSV во временную папку
pub fn write_csv(name: &str, lines: &[String]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    (dir, path)
}
