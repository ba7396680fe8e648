//! Loading the first sheet of an upload into a grid of raw cells.
//!
//! Spreadsheet containers go through calamine; CSV/TSV/OCR text dumps go
//! through the csv reader. Grid coordinates always match sheet coordinates:
//! leading empty rows and columns that the readers skip are padded back.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDateTime;
use mfs_core::CellValue;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::error::IngestError;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "xla", "xlam", "ods"];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const SNIFF_LINES: usize = 10;

/// First sheet of an upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
    /// Sheets after the first that were not read
    pub ignored_sheets: usize,
}

impl Sheet {
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
            ignored_sheets: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Spreadsheet,
    Text,
}

fn sniff(file_name: &str, bytes: &[u8]) -> Container {
    if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
        return Container::Spreadsheet;
    }
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        Container::Spreadsheet
    } else {
        // csv, tsv, txt and unknown extensions
        Container::Text
    }
}

pub fn load_first_sheet(file_name: &str, bytes: &[u8]) -> Result<Sheet, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyInput {
            file: file_name.to_string(),
        });
    }
    match sniff(file_name, bytes) {
        Container::Spreadsheet => read_spreadsheet(file_name, bytes),
        Container::Text => read_text_table(file_name, bytes),
    }
}

fn read_spreadsheet(file_name: &str, bytes: &[u8]) -> Result<Sheet, IngestError> {
    let workbook_err = |source| IngestError::Workbook {
        file: file_name.to_string(),
        source,
    };

    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(workbook_err)?;
    let names = workbook.sheet_names();
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::NoSheets {
            file: file_name.to_string(),
        })?
        .map_err(workbook_err)?;

    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
    for data_row in range.rows() {
        let mut cells = vec![CellValue::Empty; col_offset];
        cells.extend(data_row.iter().map(convert_cell));
        rows.push(cells);
    }

    debug!(
        file = file_name,
        sheet = names.first().map(String::as_str).unwrap_or_default(),
        rows = rows.len(),
        "loaded workbook sheet"
    );

    Ok(Sheet {
        name: names.first().cloned().unwrap_or_default(),
        rows,
        ignored_sheets: names.len().saturating_sub(1),
    })
}

fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => CellValue::DateValue(ndt),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso(s)
            .map(CellValue::DateValue)
            .unwrap_or_else(|| CellValue::from(s.as_str())),
        _ => CellValue::Empty,
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Most frequent of `, \t ; |` over the first few non-empty lines; comma by default
fn sniff_delimiter(text: &[u8]) -> u8 {
    let sample: Vec<&[u8]> = text
        .split(|b| *b == b'\n')
        .filter(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
        .take(SNIFF_LINES)
        .collect();

    [b',', b'\t', b';', b'|']
        .into_iter()
        .map(|d| {
            let count: usize = sample
                .iter()
                .map(|line| line.iter().filter(|b| **b == d).count())
                .sum();
            (d, count)
        })
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

fn read_text_table(file_name: &str, bytes: &[u8]) -> Result<Sheet, IngestError> {
    let csv_err = |source| IngestError::Csv {
        file: file_name.to_string(),
        source,
    };

    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(body))
        .from_reader(body);

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    let mut record = csv::StringRecord::new();
    // byte offset just past the previous record and its terminator
    let mut record_end = 0usize;
    while reader.read_record(&mut record).map_err(csv_err)? {
        // the reader drops blank lines; put them back so row numbers match the file
        let rest = body.get(record_end..).unwrap_or_default();
        let gap = rest.iter().take_while(|b| matches!(b, b'\r' | b'\n')).count();
        let split_crlf = record_end > 0 && body[record_end - 1] == b'\r' && rest.first() == Some(&b'\n');
        let blanks = count_terminators(&rest[..gap]).saturating_sub(usize::from(split_crlf));
        rows.extend(std::iter::repeat_n(Vec::new(), blanks));

        rows.push(record.iter().map(|field| CellValue::from(field.trim())).collect());
        record_end = usize::try_from(reader.position().byte()).unwrap_or(body.len());
    }

    Ok(Sheet::from_rows(file_name, rows))
}

/// Line terminators in a run of `\r`/`\n` bytes; `\r\n` counts once.
fn count_terminators(run: &[u8]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < run.len() {
        i += if run[i..].starts_with(b"\r\n") { 2 } else { 1 };
        count += 1;
    }
    count
}
