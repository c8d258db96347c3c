//! Tabular reports written as CSV (UTF-8 with BOM, so Excel picks the
//! encoding up) or as a single-sheet XLSX workbook.

use crate::domain::model::Record;
use crate::utils::error::{AutomationError, Result};
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Xlsx,
}

impl ReportFormat {
    /// `.xlsx` selects a workbook; every other extension gets CSV.
    pub fn from_path(path: &str) -> Self {
        let is_xlsx = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("xlsx"))
            .unwrap_or(false);
        if is_xlsx {
            ReportFormat::Xlsx
        } else {
            ReportFormat::Csv
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Report {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Adds `column` at the end unless already present.
    pub fn ensure_column(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
    }

    fn cells(&self, record: &Record) -> Vec<String> {
        self.columns.iter().map(|c| record.cell(c)).collect()
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = UTF8_BOM.to_vec();
        {
            let mut writer = csv::Writer::from_writer(&mut buffer);
            writer.write_record(&self.columns)?;
            for record in &self.rows {
                writer.write_record(self.cells(record))?;
            }
            writer.flush()?;
        }
        Ok(buffer)
    }

    pub fn to_xlsx_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        zip.start_file("[Content_Types].xml", SimpleFileOptions::default())?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;

        zip.start_file("_rels/.rels", SimpleFileOptions::default())?;
        zip.write_all(ROOT_RELS.as_bytes())?;

        zip.start_file("xl/workbook.xml", SimpleFileOptions::default())?;
        zip.write_all(WORKBOOK.as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", SimpleFileOptions::default())?;
        zip.write_all(WORKBOOK_RELS.as_bytes())?;

        zip.start_file("xl/worksheets/sheet1.xml", SimpleFileOptions::default())?;
        zip.write_all(self.sheet_xml().as_bytes())?;

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    fn sheet_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );

        let header = self.columns.clone();
        let body = self.rows.iter().map(|r| self.cells(r));
        for (row_idx, cells) in std::iter::once(header).chain(body).enumerate() {
            let row_number = row_idx + 1;
            xml.push_str(&format!(r#"<row r="{}">"#, row_number));
            for (col_idx, value) in cells.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                xml.push_str(&format!(
                    r#"<c r="{}{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    column_letter(col_idx),
                    row_number,
                    escape_xml(value)
                ));
            }
            xml.push_str("</row>");
        }

        xml.push_str("</sheetData></worksheet>");
        xml
    }

    pub fn to_bytes(&self, format: ReportFormat) -> Result<Vec<u8>> {
        match format {
            ReportFormat::Csv => self.to_csv_bytes(),
            ReportFormat::Xlsx => self.to_xlsx_bytes(),
        }
    }

    /// Reads a CSV with headers (BOM tolerated) into a report of string cells.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut reader = csv::Reader::from_reader(bytes);
        let columns: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

        let mut report = Report::new(columns.clone());
        for row in reader.records() {
            let row = row?;
            let mut record = Record::new();
            for (column, value) in columns.iter().zip(row.iter()) {
                record = record.with(column, value);
            }
            report.push(record);
        }
        Ok(report)
    }
}

/// Spreadsheet column name: 0 -> A, 25 -> Z, 26 -> AA.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // control characters are not allowed in XML 1.0
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

pub fn ensure_supported_output(path: &str) -> Result<()> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    if ext.as_deref() == Some("xls") {
        return Err(AutomationError::InvalidConfigValueError {
            field: "output".to_string(),
            value: path.to_string(),
            reason: "Legacy .xls is not supported; use .xlsx or .csv".to_string(),
        });
    }
    Ok(())
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Relatorio" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
