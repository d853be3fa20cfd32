// ============================================================
// CSV PARSER
// ============================================================
// Parse uploaded CSV bytes into a CsvTable

use crate::domain::csv::CsvTable;
use crate::domain::error::{AppError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use encoding_rs::{Encoding, UTF_8};

/// CSV parser for uploaded equipment files
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        Self
    }

    /// Decode raw upload bytes as UTF-8 and parse them
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<CsvTable> {
        let content = decode_utf8(bytes)?;
        self.parse_content(&content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<CsvTable> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b',')
            .trim(Trim::None)
            // Short rows are padded below; long rows are rejected explicitly
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .clone();

        if headers.is_empty() || (headers.len() == 1 && headers[0].trim().is_empty()) {
            return Err(AppError::ParseError(
                "No columns to parse from file".to_string(),
            ));
        }

        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();

        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            rows.push(self.parse_row(index, headers.len(), &record)?);
        }

        Ok(CsvTable::new(headers, rows))
    }

    /// Parse a single CSV row into exactly `width` cells
    fn parse_row(
        &self,
        index: usize,
        width: usize,
        record: &StringRecord,
    ) -> Result<Vec<Option<String>>> {
        if record.len() > width {
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(index as u64 + 2);
            return Err(AppError::ParseError(format!(
                "Expected {} fields in line {}, saw {}",
                width,
                line,
                record.len()
            )));
        }

        let mut cells: Vec<Option<String>> = record
            .iter()
            .map(|value| {
                if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            })
            .collect();
        cells.resize(width, None);

        Ok(cells)
    }
}

/// Decode bytes as strict UTF-8, dropping a UTF-8 byte order mark
fn decode_utf8(bytes: &[u8]) -> Result<String> {
    let body = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) if encoding == UTF_8 => &bytes[bom_len..],
        Some((encoding, _)) => {
            return Err(AppError::ParseError(format!(
                "Unsupported file encoding {}; please upload UTF-8",
                encoding.name()
            )))
        }
        None => bytes,
    };

    UTF_8
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|content| content.into_owned())
        .ok_or_else(|| {
            AppError::ParseError("File is not valid UTF-8 text".to_string())
        })
}
