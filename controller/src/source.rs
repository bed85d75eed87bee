use std::fs::File;
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use chamber_common::Cell;
use csv::ReaderBuilder;

use crate::loader::LoadError;

/// Sheet a workbook must contain for us to treat it as a schedule.
pub const TIMEPOINTS_SHEET: &str = "timepoints";

/// A schedule source read whole: one header row plus data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Reads a schedule file into memory, dispatching on extension.
pub fn read_table(path: &Path) -> Result<RawTable, LoadError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => read_csv(path),
        Some("xlsx") => read_xlsx(path),
        _ => Err(LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn read_csv(path: &Path) -> Result<RawTable, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // Rows are allowed to be ragged; short rows pad with null targets at
    // decode time.
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut headers = Vec::new();
    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if i == 0 {
            headers = record.iter().map(str::to_string).collect();
        } else {
            rows.push(record.iter().map(Cell::text).collect());
        }
    }

    Ok(RawTable { headers, rows })
}

fn read_xlsx(path: &Path) -> Result<RawTable, LoadError> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|source| LoadError::Xlsx {
        path: path.to_path_buf(),
        source,
    })?;

    if !workbook.sheet_names().iter().any(|s| s == TIMEPOINTS_SHEET) {
        return Err(LoadError::MissingSheet {
            path: path.to_path_buf(),
        });
    }

    let range = workbook
        .worksheet_range(TIMEPOINTS_SHEET)
        .map_err(|source| LoadError::Xlsx {
            path: path.to_path_buf(),
            source,
        })?;

    let mut sheet_rows = range.rows();
    let headers = sheet_rows
        .next()
        .map(|row| row.iter().map(header_text).collect())
        .unwrap_or_default();
    let rows = sheet_rows
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    Ok(RawTable { headers, rows })
}

fn header_text(data: &Data) -> String {
    match data {
        Data::String(text) => text.clone(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(text) => Cell::text(text.clone()),
        Data::Float(value) => Cell::Number(*value),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Bool(value) => Cell::text(value.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Cell::DateTime(naive),
            None => Cell::Empty,
        },
        Data::DateTimeIso(text) | Data::DurationIso(text) => Cell::text(text.clone()),
    }
}
