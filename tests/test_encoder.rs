//! Кодирование признаков: форма, порядок строк, неизвестные категории

use loan_risk::preprocessing::{normalize_column, FeatureColumn, FeatureEncoder, NormalizationRange};
use loan_risk::types::{ColumnValues, RecordTable};

#[path = "common/mod.rs"]
mod common;

use common::{small_loan_table, text};

#[test]
fn test_encoded_shape() {
    let table = small_loan_table();
    let encoded = FeatureEncoder::encode(&table, &["Country", "Sector"], &["Loan Amount"]).unwrap();

    assert_eq!(encoded.matrix.dim(), (10, 6), "3 countries + 2 sectors + 1 ordinal");
    assert_eq!(encoded.columns.len(), 6);
    assert_eq!(encoded.columns[0].name(), "Country=Chile");
    assert!(matches!(&encoded.columns[5], FeatureColumn::Ordinal { source, .. } if source == "Loan Amount"));
}

#[test]
fn test_rows_stay_aligned() {
    let table = small_loan_table();
    let encoded = FeatureEncoder::encode(&table, &["Country", "Sector"], &["Loan Amount"]).unwrap();
    let countries = table.text_column("Country").unwrap();

    for (row, country) in countries.iter().enumerate() {
        let block = encoded.matrix.row(row);
        let hot: Vec<usize> = (0..3).filter(|&c| block[c] == 1.0).collect();
        assert_eq!(hot.len(), 1, "exactly one hot country per row");
        assert_eq!(encoded.columns[hot[0]].name(), format!("Country={}", country));
        assert!((block.slice(ndarray::s![0..5]).sum() - 2.0).abs() < 1e-12);
    }

    // первая и последняя суммы дают 0 и 1
    assert_eq!(encoded.matrix[[0, 5]], 0.0);
    assert_eq!(encoded.matrix[[9, 5]], 1.0);
}

#[test]
fn test_reencoding_is_identical() {
    let table = small_loan_table();
    let encoder = FeatureEncoder::fit(&table, &["Country", "Sector"], &["Loan Amount"]).unwrap();

    let first = encoder.transform(&table).unwrap();
    let second = encoder.transform(&table).unwrap();
    assert_eq!(first.matrix, second.matrix);
    assert_eq!(first.columns, second.columns);
}

#[test]
fn test_unseen_category_is_zero_block() {
    let table = small_loan_table();
    let encoder = FeatureEncoder::fit(&table, &["Country", "Sector"], &["Loan Amount"]).unwrap();

    let fresh = RecordTable::new()
        .with_column("Country", text(&["Uganda", "Peru"]))
        .unwrap()
        .with_column("Sector", text(&["Food", "Transport"]))
        .unwrap()
        .with_column("Loan Amount", ColumnValues::Numeric(vec![100.0, 1450.0]))
        .unwrap();
    let encoded = encoder.transform(&fresh).unwrap();

    assert_eq!(encoded.matrix.dim(), (2, 6));
    assert!(encoded.matrix.row(0).iter().take(3).all(|&v| v == 0.0));
    assert_eq!(encoded.matrix[[0, 3]], 1.0);
    assert!(encoded.matrix.row(1).iter().skip(3).take(2).all(|&v| v == 0.0));
}

#[test]
fn test_constant_ordinal_encodes_zeros() {
    let table = RecordTable::new()
        .with_column("Country", text(&["Kenya", "Peru", "Kenya"]))
        .unwrap()
        .with_column("Loan Amount", ColumnValues::Numeric(vec![500.0, 500.0, 500.0]))
        .unwrap();
    let encoded = FeatureEncoder::encode(&table, &["Country"], &["Loan Amount"]).unwrap();
    assert!(encoded.matrix.column(2).iter().all(|&v| v == 0.0));
}

#[test]
fn test_missing_column_is_reported() {
    let table = small_loan_table();
    let err = FeatureEncoder::encode(&table, &["Country", "Activity"], &["Loan Amount"]).unwrap_err();
    assert!(err.to_string().contains("Activity"));
}

#[test]
fn test_normalizer_ranges() {
    let values = [3.0, 1.0, 5.0];
    let unit = normalize_column(&values, NormalizationRange::Unit);
    assert_eq!(unit.to_vec(), vec![0.5, 0.0, 1.0]);

    let centered = normalize_column(&values, NormalizationRange::Centered);
    assert_eq!(centered.to_vec(), vec![0.0, -1.0, 1.0]);
}
