//! Turns an uploaded spreadsheet into sheets of raw rows.
//!
//! The first row of each sheet is the header row. Data rows become
//! column -> value maps; blank cells are left out and fully blank rows are
//! dropped. Date cells stay numeric serials so that the date parser sees the
//! same thing for every workbook format.

use crate::domain::model::{RawRow, Sheet, Workbook};
use crate::utils::error::{HsseError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv"];

pub fn parse_workbook(file_name: &str, bytes: Vec<u8>) -> Result<Workbook> {
    let path = Path::new(file_name);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if extension == "csv" {
        let sheet_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Sheet1")
            .to_string();
        return Ok(Workbook {
            sheets: vec![parse_csv_sheet(&sheet_name, &bytes)?],
        });
    }

    parse_spreadsheet(bytes)
}

pub fn parse_spreadsheet(bytes: Vec<u8>) -> Result<Workbook> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let sheet = sheet_from_range(&name, &range);
        tracing::debug!("Read sheet \"{}\": {} data rows", name, sheet.rows.len());
        sheets.push(sheet);
    }

    Ok(Workbook { sheets })
}

pub fn parse_csv_sheet(sheet_name: &str, bytes: &[u8]) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let headers = unique_headers(reader.headers()?.iter().map(str::to_string));

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells: Vec<Value> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Value::Null
                } else {
                    Value::String(field.to_string())
                }
            })
            .collect();
        if let Some(row) = build_row(&headers, cells) {
            rows.push(row);
        }
    }

    Ok(Sheet {
        name: sheet_name.to_string(),
        headers,
        rows,
    })
}

fn sheet_from_range(name: &str, range: &Range<Data>) -> Sheet {
    let mut iter = range.rows();

    let headers = match iter.next() {
        Some(header_row) => unique_headers(header_row.iter().map(|cell| match cell_value(cell) {
            Value::Null => String::new(),
            value => crate::core::normalizer::value_to_string(&value).trim().to_string(),
        })),
        None => Vec::new(),
    };

    let rows = iter
        .filter_map(|cells| build_row(&headers, cells.iter().map(cell_value).collect()))
        .collect();

    Sheet {
        name: name.to_string(),
        headers,
        rows,
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(n) => Value::from(*n),
        Data::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => serde_json::Number::from_f64(dt.as_f64())
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

/// Blank headers become `__EMPTY`, repeated ones get a `_1`, `_2`, ... suffix.
fn unique_headers(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.map(|header| {
        let base = if header.is_empty() {
            "__EMPTY".to_string()
        } else {
            header
        };
        let count = seen.entry(base.clone()).or_insert(0);
        let name = if *count == 0 {
            base.clone()
        } else {
            format!("{}_{}", base, count)
        };
        *count += 1;
        name
    })
    .collect()
}

fn build_row(headers: &[String], cells: Vec<Value>) -> Option<RawRow> {
    let cells: HashMap<String, Value> = headers
        .iter()
        .zip(cells)
        .filter(|(_, value)| !value.is_null())
        .map(|(header, value)| (header.clone(), value))
        .collect();

    if cells.is_empty() {
        None
    } else {
        Some(RawRow { cells })
    }
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_csv_becomes_single_sheet_named_after_file() {
        let csv = "Title,Date,Severity\nSlip,2024-01-15,Low\n,,\nBurn,,High\n";
        let workbook = parse_workbook("uploads/Incidents.csv", csv.as_bytes().to_vec()).unwrap();

        assert_eq!(workbook.sheets.len(), 1);
        let sheet = &workbook.sheets[0];
        assert_eq!(sheet.name, "Incidents");
        assert_eq!(sheet.headers, vec!["Title", "Date", "Severity"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].get("Date"), Some(&json!("2024-01-15")));
        assert_eq!(sheet.rows[1].get("Date"), None);
    }

    #[test]
    fn test_duplicate_and_blank_headers() {
        let headers = unique_headers(
            ["Status", "", "Status", "", "Loc ID"].iter().map(|s| s.to_string()),
        );
        assert_eq!(headers, vec!["Status", "__EMPTY", "Status_1", "__EMPTY_1", "Loc ID"]);
    }

    #[test]
    fn test_header_only_csv_has_no_rows() {
        let workbook = parse_workbook("Training.csv", b"TrainingName,Date\n".to_vec()).unwrap();
        assert!(workbook.sheets[0].rows.is_empty());
        assert_eq!(workbook.sheets[0].headers.len(), 2);
    }

    #[test]
    fn test_garbage_bytes_fail_to_parse() {
        let result = parse_workbook("report.xlsx", b"definitely not a zip archive".to_vec());
        assert!(matches!(result, Err(HsseError::WorkbookError(_))));
    }
}
