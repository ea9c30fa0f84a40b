//! Offline datasets read from a local CSV file

use crate::core::{ColumnMetadata, DataMetadata, DatasetId, DatasetMetadata, GridData, Quality, Row};
use crate::error::{PrepError, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

/// Column id of the n-th field, as the server numbers them
pub fn column_id(index: usize) -> String {
    format!("{index:04}")
}

/// Most specific type accepting every non-empty value
fn infer_type(values: &[String]) -> &'static str {
    let present: Vec<&str> = values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();
    if present.is_empty() {
        "string"
    } else if present.iter().all(|v| v.parse::<i64>().is_ok()) {
        "integer"
    } else if present.iter().all(|v| v.parse::<f64>().is_ok()) {
        "double"
    } else if present.iter().all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false")) {
        "boolean"
    } else {
        "string"
    }
}

/// Read a CSV file with a header line into a dataset
pub fn load_csv(path: &Path) -> Result<(DatasetMetadata, GridData)> {
    let local_error = |e: &dyn std::fmt::Display| PrepError::LocalData(format!("{}: {e}", path.display()));

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| local_error(&e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| local_error(&e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut columns_values: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(|e| local_error(&e))?;
        for (index, values) in columns_values.iter_mut().enumerate() {
            values.push(record.get(index).unwrap_or_default().to_string());
        }
    }
    let record_count = columns_values.first().map(Vec::len).unwrap_or(0);

    let columns: Vec<ColumnMetadata> = headers
        .iter()
        .zip(&columns_values)
        .enumerate()
        .map(|(index, (name, values))| {
            let empty = values.iter().filter(|v| v.trim().is_empty()).count() as u64;
            ColumnMetadata {
                quality: Quality {
                    empty,
                    invalid: 0,
                    valid: values.len() as u64 - empty,
                    invalid_values: Vec::new(),
                },
                ..ColumnMetadata::new(column_id(index), name.as_str(), infer_type(values))
            }
        })
        .collect();

    let records: Vec<Row> = (0..record_count)
        .map(|line| {
            let values: Map<String, Value> = columns_values
                .iter()
                .enumerate()
                .map(|(index, values)| (column_id(index), Value::String(values[line].clone())))
                .collect();
            Row {
                tdp_id: line as u64 + 1,
                values,
                ..Default::default()
            }
        })
        .collect();

    let created = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(|modified| DateTime::<Utc>::from(modified).timestamp_millis());
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dataset = DatasetMetadata {
        id: DatasetId::new(path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()),
        name,
        author: String::new(),
        records: record_count as u64,
        created,
    };

    info!(path = %path.display(), records = record_count, columns = columns.len(), "loaded local dataset");
    Ok((
        dataset,
        GridData {
            metadata: DataMetadata { columns },
            records,
            preview: false,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_csv() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("customers.csv");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "id,name,score,active").unwrap();
        writeln!(file, "1,Alice,10.5,true").unwrap();
        writeln!(file, "2,Bob,,false").unwrap();
        writeln!(file, "3,Charlie,7").unwrap();
        drop(file);

        let (dataset, data) = load_csv(&csv_path).unwrap();
        assert_eq!(dataset.id.as_str(), "customers");
        assert_eq!(dataset.name, "customers.csv");
        assert_eq!(dataset.records, 3);
        assert!(dataset.created_at().is_some());

        let types: Vec<&str> = data.metadata.columns.iter().map(|c| c.column_type.as_str()).collect();
        assert_eq!(types, vec!["integer", "string", "double", "boolean"]);
        assert_eq!(data.metadata.columns[2].quality.empty, 1);
        assert_eq!(data.metadata.columns[3].quality.empty, 1);

        assert_eq!(data.records[2].tdp_id, 3);
        assert_eq!(data.records[2].cell_text("0001"), "Charlie");
        assert_eq!(data.records[2].cell_text("0003"), "");
    }

    #[test]
    fn test_missing_file() {
        let err = load_csv(Path::new("/nonexistent/file.csv")).unwrap_err();
        assert!(matches!(err, PrepError::LocalData(_)));
    }
}
