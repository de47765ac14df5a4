//! Input/output formats and the conversion dispatch table

use crate::spreadsheet::WorkbookKind;
use std::path::Path;

/// Formats recognised from an uploaded file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Pdf,
    Docx,
    Xlsx,
    Xls,
    Pptx,
}

impl InputFormat {
    /// Match a lower-cased extension such as `.docx`.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            ".pdf" => Some(InputFormat::Pdf),
            ".docx" => Some(InputFormat::Docx),
            ".xlsx" => Some(InputFormat::Xlsx),
            ".xls" => Some(InputFormat::Xls),
            ".pptx" => Some(InputFormat::Pptx),
            _ => None,
        }
    }
}

/// Lower-cased extension of `file_name` including the dot, or `""`.
pub fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Formats a client can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pdf,
    Docx,
    Xlsx,
    Pptx,
}

impl OutputFormat {
    pub fn parse(format: &str) -> Option<Self> {
        match format.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(OutputFormat::Pdf),
            "docx" => Some(OutputFormat::Docx),
            "xlsx" => Some(OutputFormat::Xlsx),
            "pptx" => Some(OutputFormat::Pptx),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Pptx => "pptx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            OutputFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            OutputFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }
}

/// A supported conversion pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    DocxToPdf,
    SpreadsheetToPdf(WorkbookKind),
    /// Delivered as `.docx`, rendered as PDF
    PdfToDocx,
    PdfToXlsx,
    PptxToPdf,
    /// Delivered as `.pptx`, rendered as slide-like PDF pages
    PdfToPptx,
}

impl Conversion {
    pub fn resolve(input: InputFormat, output: OutputFormat) -> Option<Self> {
        use InputFormat as In;
        use OutputFormat as Out;

        match (input, output) {
            (In::Docx, Out::Pdf) => Some(Conversion::DocxToPdf),
            (In::Xlsx, Out::Pdf) => Some(Conversion::SpreadsheetToPdf(WorkbookKind::Xlsx)),
            (In::Xls, Out::Pdf) => Some(Conversion::SpreadsheetToPdf(WorkbookKind::Xls)),
            (In::Pdf, Out::Docx) => Some(Conversion::PdfToDocx),
            (In::Pdf, Out::Xlsx) => Some(Conversion::PdfToXlsx),
            (In::Pptx, Out::Pdf) => Some(Conversion::PptxToPdf),
            (In::Pdf, Out::Pptx) => Some(Conversion::PdfToPptx),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("Report.DOCX"), ".docx");
        assert_eq!(file_extension("archive.tar.xls"), ".xls");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension(""), "");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("pdf"), Some(OutputFormat::Pdf));
        assert_eq!(OutputFormat::parse(" PPTX "), Some(OutputFormat::Pptx));
        assert_eq!(OutputFormat::parse("odt"), None);
        assert_eq!(OutputFormat::parse(""), None);
    }

    #[test]
    fn test_supported_pairs() {
        let pairs = [
            (InputFormat::Docx, OutputFormat::Pdf),
            (InputFormat::Xlsx, OutputFormat::Pdf),
            (InputFormat::Xls, OutputFormat::Pdf),
            (InputFormat::Pdf, OutputFormat::Docx),
            (InputFormat::Pdf, OutputFormat::Xlsx),
            (InputFormat::Pptx, OutputFormat::Pdf),
            (InputFormat::Pdf, OutputFormat::Pptx),
        ];
        for (input, output) in pairs {
            assert!(Conversion::resolve(input, output).is_some(), "{:?} → {:?}", input, output);
        }
    }

    #[test]
    fn test_unsupported_pairs() {
        assert_eq!(Conversion::resolve(InputFormat::Pdf, OutputFormat::Pdf), None);
        assert_eq!(Conversion::resolve(InputFormat::Docx, OutputFormat::Xlsx), None);
        assert_eq!(Conversion::resolve(InputFormat::Pptx, OutputFormat::Docx), None);
        assert_eq!(InputFormat::from_extension(".ppt"), None);
        assert_eq!(InputFormat::from_extension(".doc"), None);
    }
}
