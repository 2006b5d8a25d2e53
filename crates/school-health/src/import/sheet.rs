//! Workbook reading
//!
//! Only the first worksheet is read. Cells come back as text so the row
//! parser sees one representation regardless of how Excel typed the cell.

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;
use tracing::debug;

use crate::errors::{ImportError, ImportResult};

/// Raw rows of the first worksheet, header row included
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    pub sheet_name: String,
    pub rows: Vec<Vec<String>>,
}

/// Open an `.xlsx` or `.xls` buffer and return the first worksheet as text.
pub fn read_first_sheet(buffer: &[u8]) -> ImportResult<SheetData> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(buffer.to_vec()))
        .map_err(|e| ImportError::workbook(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ImportError::NoSheets)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::workbook(e.to_string()))?;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_text).collect())
        .collect();

    if rows.is_empty() {
        return Err(ImportError::EmptySheet);
    }

    debug!(sheet = %sheet_name, rows = rows.len(), "Read worksheet");
    Ok(SheetData { sheet_name, rows })
}

fn cell_to_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // Codes and years typed as numbers must not pick up a ".0"
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}
