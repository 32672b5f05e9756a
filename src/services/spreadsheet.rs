//! Spreadsheet row reader for bulk imports (xlsx, xls, ods, csv)

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::Value;
use std::io::Cursor;

use crate::{
    error::{AppError, AppResult},
    models::RowMap,
};

/// Turns an uploaded file into header-keyed rows
pub trait SpreadsheetReader: Send + Sync {
    /// Parse the first sheet. The first row holds the headers.
    fn parse(&self, content: &[u8], file_name: Option<&str>) -> AppResult<Vec<RowMap>>;
}

/// Workbook formats through `calamine`, CSV through `csv`
#[derive(Debug, Clone, Copy, Default)]
pub struct CalamineReader;

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.trim().to_string()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::Error(e) => {
            tracing::debug!("Spreadsheet cell error {:?}", e);
            Value::Null
        }
        other => Value::String(other.to_string()),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Zip a header row with data rows, dropping blank cells and empty rows
fn build_rows<I>(headers: Vec<String>, rows: I) -> Vec<RowMap>
where
    I: IntoIterator<Item = Vec<Value>>,
{
    rows.into_iter()
        .map(|cells| {
            headers
                .iter()
                .zip(cells)
                .filter(|(header, value)| !header.is_empty() && !is_blank(value))
                .map(|(header, value)| (header.clone(), value))
                .collect::<RowMap>()
        })
        .filter(|row| !row.is_empty())
        .collect()
}

impl CalamineReader {
    fn parse_workbook(&self, content: &[u8]) -> AppResult<Vec<RowMap>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(content.to_vec()))
            .map_err(|e| AppError::Spreadsheet(format!("Unreadable workbook: {}", e)))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AppError::Spreadsheet("Workbook has no sheets".to_string()))?
            .map_err(|e| AppError::Spreadsheet(format!("Unreadable sheet: {}", e)))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| AppError::Spreadsheet("Sheet is empty".to_string()))?
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        Ok(build_rows(
            headers,
            rows.map(|row| row.iter().map(cell_to_value).collect::<Vec<_>>()),
        ))
    }

    fn parse_csv(&self, content: &[u8]) -> AppResult<Vec<RowMap>> {
        let text = String::from_utf8_lossy(content);
        let text = text.trim_start_matches('\u{feff}');
        let first_line = text.lines().next().unwrap_or_default();
        let delimiter = if first_line.matches(';').count() > first_line.matches(',').count() {
            b';'
        } else {
            b','
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::Spreadsheet(format!("Unreadable CSV header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| AppError::Spreadsheet(format!("Unreadable CSV row: {}", e)))?;
            records.push(
                record
                    .iter()
                    .map(|field| Value::String(field.trim().to_string()))
                    .collect::<Vec<_>>(),
            );
        }
        Ok(build_rows(headers, records))
    }
}

impl SpreadsheetReader for CalamineReader {
    fn parse(&self, content: &[u8], file_name: Option<&str>) -> AppResult<Vec<RowMap>> {
        if content.is_empty() {
            return Err(AppError::Spreadsheet("Uploaded file is empty".to_string()));
        }

        let is_csv = file_name
            .map(|name| {
                let name = name.to_lowercase();
                name.ends_with(".csv") || name.ends_with(".txt")
            })
            .unwrap_or(false);

        let rows = if is_csv {
            self.parse_csv(content)?
        } else {
            self.parse_workbook(content)?
        };

        if rows.is_empty() {
            return Err(AppError::Spreadsheet("No data rows found".to_string()));
        }
        tracing::debug!("Parsed {} spreadsheet row(s)", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_csv_rows_are_keyed_by_header() {
        let content = "Titel;Auteur;Barcode\nDe reis;Anna;978-90-1\n;;\nHet bos;Bram;\n";
        let rows = CalamineReader.parse(content.as_bytes(), Some("boeken.CSV")).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Titel"], json!("De reis"));
        assert_eq!(rows[0]["Barcode"], json!("978-90-1"));
        assert!(!rows[1].contains_key("Barcode"));
    }

    #[test]
    fn test_header_only_is_an_error() {
        let err = CalamineReader.parse(b"naam,gebruikersnaam\n", Some("leerlingen.csv")).unwrap_err();
        assert!(matches!(err, AppError::Spreadsheet(_)));
    }

    #[test]
    fn test_garbage_workbook_is_an_error() {
        let err = CalamineReader.parse(b"not a workbook", Some("boeken.xlsx")).unwrap_err();
        assert!(matches!(err, AppError::Spreadsheet(_)));
        let err = CalamineReader.parse(b"", None).unwrap_err();
        assert!(matches!(err, AppError::Spreadsheet(_)));
    }

    #[test]
    fn test_cell_conversion() {
        assert_eq!(cell_to_value(&Data::Float(9781234567890.0)), json!(9781234567890.0));
        assert_eq!(cell_to_value(&Data::Int(7)), json!(7));
        assert_eq!(cell_to_value(&Data::String(" ja ".into())), json!("ja"));
        assert_eq!(cell_to_value(&Data::Empty), Value::Null);
    }
}
