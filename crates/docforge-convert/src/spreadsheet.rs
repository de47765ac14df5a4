//! Spreadsheet reading via calamine

use crate::error::{ConvertError, Result};
use crate::render::Block;
use calamine::{Data, Range, Reader, Xls, Xlsx};
use std::io::{Cursor, Read, Seek};
use tracing::debug;

/// Workbook container formats calamine is asked to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookKind {
    Xlsx,
    Xls,
}

/// One worksheet as display strings, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// Read every worksheet of a workbook, in workbook order.
pub fn read_workbook(bytes: &[u8], kind: WorkbookKind) -> Result<Vec<Sheet>> {
    let cursor = Cursor::new(bytes);
    let sheets = match kind {
        WorkbookKind::Xlsx => {
            let mut workbook: Xlsx<_> = Xlsx::new(cursor).map_err(|e| {
                ConvertError::Spreadsheet(format!("Failed to read workbook: {}", e))
            })?;
            collect_sheets(&mut workbook)?
        }
        WorkbookKind::Xls => {
            let mut workbook: Xls<_> = Xls::new(cursor).map_err(|e| {
                ConvertError::Spreadsheet(format!("Failed to read workbook: {}", e))
            })?;
            collect_sheets(&mut workbook)?
        }
    };

    debug!(sheets = sheets.len(), "read workbook");
    Ok(sheets)
}

fn collect_sheets<RS, R>(workbook: &mut R) -> Result<Vec<Sheet>>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name).map_err(|e| {
            ConvertError::Spreadsheet(format!("Failed to read sheet '{}': {}", name, e))
        })?;
        sheets.push(Sheet {
            rows: range_rows(&range),
            name,
        });
    }
    Ok(sheets)
}

fn range_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// A `Sheet: <name>` heading followed by the sheet's grid, per sheet.
pub fn sheets_to_blocks(sheets: Vec<Sheet>) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(sheets.len() * 2);
    for sheet in sheets {
        blocks.push(Block::heading(2, format!("Sheet: {}", sheet.name)));
        if !sheet.rows.is_empty() {
            blocks.push(Block::Table {
                rows: sheet.rows,
                header: false,
            });
        }
    }
    blocks
}
