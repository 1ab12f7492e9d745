//! Разбиение большого CSV на пронумерованные части

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{Result, RiskError};

/// Место для номера части в шаблоне имени
pub const CHUNK_PLACEHOLDER: &str = "{}";

/// Имя части по шаблону; номера начинаются с 1
pub fn chunk_file_name(template: &str, chunk: usize) -> Result<String> {
    if template.matches(CHUNK_PLACEHOLDER).count() != 1 {
        return Err(RiskError::Config(format!(
            "Output name template '{}' must contain exactly one '{}'",
            template, CHUNK_PLACEHOLDER
        )));
    }
    Ok(template.replacen(CHUNK_PLACEHOLDER, &chunk.to_string(), 1))
}

/// Делит CSV на файлы по `row_limit` строк данных, заголовок повторяется в каждом
///
/// Записи читаются потоком и копируются как есть, поэтому заголовок
/// (в том числе повторяющиеся и пустые имена) и значения не меняются.
/// Файл только с заголовком не даёт ни одной части.
pub fn split_csv(
    input: &Path,
    output_dir: &Path,
    name_template: &str,
    row_limit: usize,
    delimiter: u8,
) -> Result<Vec<PathBuf>> {
    if row_limit == 0 {
        return Err(RiskError::Config("Row limit must be positive".to_string()));
    }
    chunk_file_name(name_template, 1)?;
    if !input.is_file() {
        return Err(RiskError::Config(format!("Input not found: {}", input.display())));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(input)?;
    let mut records = reader.byte_records();

    let header = match records.next() {
        Some(record) => record?,
        None => return Ok(Vec::new()),
    };

    std::fs::create_dir_all(output_dir)?;

    let mut written: Vec<PathBuf> = Vec::new();
    let mut writer: Option<csv::Writer<File>> = None;
    let mut rows_in_chunk = 0;
    let mut n_rows = 0;

    for record in records {
        let record = record?;

        if writer.is_none() || rows_in_chunk == row_limit {
            if let Some(mut full) = writer.take() {
                full.flush()?;
                if let Some(done) = written.last() {
                    tracing::debug!("Wrote {} rows to {}", rows_in_chunk, done.display());
                }
            }

            let path = output_dir.join(chunk_file_name(name_template, written.len() + 1)?);
            let mut next = open_chunk(&path, delimiter)?;
            next.write_byte_record(&header)?;
            writer = Some(next);
            written.push(path);
            rows_in_chunk = 0;
        }

        if let Some(current) = writer.as_mut() {
            current.write_byte_record(&record)?;
        }
        rows_in_chunk += 1;
        n_rows += 1;
    }

    if let Some(mut last) = writer {
        last.flush()?;
    }

    tracing::info!(
        "Split {} rows from {} into {} files",
        n_rows,
        input.display(),
        written.len()
    );
    Ok(written)
}

fn open_chunk(path: &Path, delimiter: u8) -> Result<csv::Writer<File>> {
    let writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)?;
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_file_name() {
        assert_eq!(chunk_file_name("part_{}.csv", 3).unwrap(), "part_3.csv");
        assert!(chunk_file_name("part.csv", 1).is_err());
        assert!(chunk_file_name("{}_{}.csv", 1).is_err());
    }

    #[test]
    fn test_trailing_chunk_is_not_empty() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        std::fs::write(&input, "x\n1\n2\n3\n4\n").unwrap();

        let files = split_csv(&input, &dir.path().join("out"), "c_{}.csv", 2, b',').unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(std::fs::read_to_string(&files[1]).unwrap(), "x\n3\n4\n");
    }

    #[test]
    fn test_zero_row_limit() {
        let err = split_csv(Path::new("in.csv"), Path::new("."), "p_{}.csv", 0, b',').unwrap_err();
        assert!(matches!(err, RiskError::Config(_)));
    }
}
