//! Spreadsheet loading into plain cell grids.
//!
//! `.csv` goes through the `csv` reader; every other extension is handed to
//! calamine (xlsx, xls, xlsb, ods). Cells keep only what reconciliation
//! needs: numbers, text, or empty.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ExtractError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Empty => Value::Null,
        }
    }

    fn header_text(&self) -> String {
        match self {
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// One worksheet. Row 0 is expected to be the header row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetGrid {
    pub fn headers(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|r| r.iter().map(Cell::header_text).collect())
            .unwrap_or_default()
    }

    /// Data rows as header-keyed objects, blank rows and unnamed columns skipped.
    pub fn objects(&self) -> Vec<Value> {
        let headers = self.headers();
        self.rows
            .iter()
            .skip(1)
            .filter(|row| !row.iter().all(Cell::is_empty))
            .map(|row| {
                let mut obj = Map::new();
                for (header, cell) in headers.iter().zip(row) {
                    if !header.is_empty() {
                        obj.insert(header.clone(), cell.to_json());
                    }
                }
                Value::Object(obj)
            })
            .collect()
    }
}

/// Load every worksheet of a spreadsheet file.
pub fn load_sheets(path: &Path) -> Result<Vec<SheetGrid>, ExtractError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ExtractError::Io(format!("{}: {}", path.display(), e)))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Sheet1");
        return Ok(vec![parse_csv(name, &content)?]);
    }

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ExtractError::Sheet(format!("{}: {}", path.display(), e)))?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(ExtractError::Sheet(format!("{}: no sheets", path.display())));
    }

    let mut grids = Vec::with_capacity(sheet_names.len());
    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| ExtractError::Sheet(format!("sheet '{}': {}", name, e)))?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(convert_cell).collect())
            .collect();
        grids.push(SheetGrid { name: name.clone(), rows });
    }
    log::debug!("{}: loaded {} sheet(s)", path.display(), grids.len());
    Ok(grids)
}

/// Parse CSV text. Numeric-looking fields become numbers.
pub fn parse_csv(name: &str, content: &str) -> Result<SheetGrid, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::Sheet(format!("{}: {}", name, e)))?;
        rows.push(record.iter().map(csv_cell).collect());
    }
    Ok(SheetGrid { name: name.to_string(), rows })
}

fn csv_cell(field: &str) -> Cell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Cell::Number(n),
        _ => Cell::Text(trimmed.to_string()),
    }
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => Cell::Text(d.format("%Y-%m-%d").to_string()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LOANS: &str = "\
Loan Id,Borrower,Finance Charge,Booking Date
100,Jane Doe,500.00,2024-01-15
,,,
200,John Roe,,2024-02-01
";

    #[test]
    fn csv_types_cells() {
        let grid = parse_csv("loans", LOANS).unwrap();
        assert_eq!(grid.rows.len(), 4);
        assert_eq!(grid.rows[1][0], Cell::Number(100.0));
        assert_eq!(grid.rows[1][1], Cell::Text("Jane Doe".into()));
        assert_eq!(grid.rows[3][2], Cell::Empty);
    }

    #[test]
    fn objects_skip_blank_rows() {
        let grid = parse_csv("loans", LOANS).unwrap();
        let objects = grid.objects();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0]["Loan Id"], json!(100.0));
        assert_eq!(objects[0]["Booking Date"], json!("2024-01-15"));
        assert_eq!(objects[1]["Finance Charge"], Value::Null);
    }

    #[test]
    fn load_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loans.csv");
        std::fs::write(&path, LOANS).unwrap();

        let grids = load_sheets(&path).unwrap();
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0].name, "loans");
        assert_eq!(grids[0].headers(), vec!["Loan Id", "Borrower", "Finance Charge", "Booking Date"]);
    }

    #[test]
    fn unreadable_workbook_is_sheet_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(load_sheets(&path), Err(ExtractError::Sheet(_))));
    }

    #[test]
    fn missing_csv_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_sheets(&dir.path().join("nope.csv")), Err(ExtractError::Io(_))));
    }
}
