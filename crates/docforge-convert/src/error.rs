//! Error types for format conversion

use docforge_core::DocumentError;
use thiserror::Error;

/// Human-readable list of the conversion pairs that have a strategy.
pub const SUPPORTED_CONVERSIONS: &str = "DOCX↔PDF, XLSX→PDF, PDF→XLSX, PPTX→PDF, PDF→PPTX";

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Unsupported conversion: {extension} to {format}. Supported conversions: {SUPPORTED_CONVERSIONS}")]
    Unsupported { extension: String, format: String },

    #[error("ZIP error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(String),

    #[error("Missing required part: {0}")]
    MissingPart(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("PDF text extraction failed: {0}")]
    PdfText(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// True when the request itself is at fault rather than the input file.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ConvertError::Unsupported { .. })
    }
}

impl From<quick_xml::Error> for ConvertError {
    fn from(err: quick_xml::Error) -> Self {
        ConvertError::Xml(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
