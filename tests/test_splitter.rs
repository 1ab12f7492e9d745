//! Нарезка CSV на части с повторяющимся заголовком

use loan_risk::dataset::split_csv;
use loan_risk::RiskError;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

fn numbered_rows(n: usize, delimiter: char) -> Vec<String> {
    let mut lines = vec![format!("id{d}amount{d}country", d = delimiter)];
    for i in 0..n {
        lines.push(format!("{i}{d}{i}.50{d}C{i}", i = i, d = delimiter));
    }
    lines
}

fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_split_250_rows_into_three_files() {
    let lines = numbered_rows(250, ',');
    let (_input_dir, input) = common::write_csv("big.csv", &lines);
    let output = TempDir::new().unwrap();

    let files = split_csv(&input, output.path(), "part_{}.csv", 100, b',').unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(files[0].file_name().unwrap(), "part_1.csv");
    assert_eq!(files[2].file_name().unwrap(), "part_3.csv");

    let mut data_rows = Vec::new();
    for (file, expected_rows) in files.iter().zip([100, 100, 50]) {
        let chunk = read_lines(file);
        assert_eq!(chunk[0], lines[0], "header repeated in {}", file.display());
        assert_eq!(chunk.len() - 1, expected_rows);
        data_rows.extend(chunk.into_iter().skip(1));
    }

    // порядок и формат значений сохранены
    assert_eq!(data_rows, lines[1..].to_vec());
}

#[test]
fn test_split_keeps_delimiter() {
    let lines = numbered_rows(5, ';');
    let (_input_dir, input) = common::write_csv("semi.csv", &lines);
    let output = TempDir::new().unwrap();

    let files = split_csv(&input, output.path(), "s_{}.csv", 2, b';').unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(read_lines(&files[0]), lines[0..3].to_vec());
    assert_eq!(read_lines(&files[2]), vec![lines[0].clone(), lines[5].clone()]);
}

#[test]
fn test_exact_multiple_has_no_empty_tail() {
    let (_input_dir, input) = common::write_csv("even.csv", &numbered_rows(200, ','));
    let output = TempDir::new().unwrap();

    let files = split_csv(&input, output.path(), "p_{}.csv", 100, b',').unwrap();
    assert_eq!(files.len(), 2);
}

#[test]
fn test_header_only_input_produces_nothing() {
    let (_input_dir, input) = common::write_csv("empty.csv", &numbered_rows(0, ','));
    let output = TempDir::new().unwrap();

    let files = split_csv(&input, output.path(), "p_{}.csv", 100, b',').unwrap();
    assert!(files.is_empty());
}

#[test]
fn test_duplicate_header_names_are_kept() {
    let lines = ["a,a,b", "1,2,3", "4,5,6"].map(str::to_string);
    let (_input_dir, input) = common::write_csv("dup.csv", &lines);
    let output = TempDir::new().unwrap();

    let files = split_csv(&input, output.path(), "d_{}.csv", 1, b',').unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(std::fs::read_to_string(&files[0]).unwrap(), "a,a,b\n1,2,3\n");
    assert_eq!(std::fs::read_to_string(&files[1]).unwrap(), "a,a,b\n4,5,6\n");
}

#[test]
fn test_empty_header_name_is_kept() {
    let lines = ["a,,c", "1,2,3"].map(str::to_string);
    let (_input_dir, input) = common::write_csv("blank.csv", &lines);
    let output = TempDir::new().unwrap();

    let files = split_csv(&input, output.path(), "e_{}.csv", 10, b',').unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(std::fs::read_to_string(&files[0]).unwrap(), "a,,c\n1,2,3\n");
}

#[test]
fn test_bad_template_is_config_error() {
    let (_input_dir, input) = common::write_csv("t.csv", &numbered_rows(3, ','));
    let output = TempDir::new().unwrap();

    let err = split_csv(&input, output.path(), "no_placeholder.csv", 100, b',').unwrap_err();
    assert!(matches!(err, RiskError::Config(_)));
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}
