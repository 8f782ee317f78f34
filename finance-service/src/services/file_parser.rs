//! Statement file to raw text.
//!
//! PDFs go through a text-layer reader; CSVs are passed through as text with
//! no structural parsing, since the extraction model reads tabular text
//! directly.

use crate::services::error::IngestError;
use bytes::Bytes;

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const CSV_MIME_TYPE: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    Pdf,
    Csv,
}

impl StatementFormat {
    /// Match a declared content type, ignoring parameters and case.
    pub fn from_mime(mime_type: &str) -> Result<Self, IngestError> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            PDF_MIME_TYPE => Ok(StatementFormat::Pdf),
            CSV_MIME_TYPE => Ok(StatementFormat::Csv),
            _ => Err(IngestError::UnsupportedFileType(mime_type.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementFormat::Pdf => "pdf",
            StatementFormat::Csv => "csv",
        }
    }
}

/// Extract the statement's text. PDF parsing runs on the blocking pool; a
/// parser panic on a malformed document is reported as unreadable.
pub async fn parse_statement(format: StatementFormat, data: Bytes) -> Result<String, IngestError> {
    match format {
        StatementFormat::Csv => Ok(decode_text(&data)),
        StatementFormat::Pdf => tokio::task::spawn_blocking(move || extract_pdf_text(&data))
            .await
            .map_err(|e| IngestError::UnreadableFile(format!("PDF parser aborted: {}", e)))?,
    }
}

fn extract_pdf_text(data: &[u8]) -> Result<String, IngestError> {
    let text = pdf_extract::extract_text_from_mem(data)
        .map_err(|e| IngestError::UnreadableFile(e.to_string()))?;

    tracing::debug!(
        text_length = text.len(),
        pages = text.matches('\u{000C}').count() + 1,
        "PDF text extracted"
    );

    Ok(text)
}

fn decode_text(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}
