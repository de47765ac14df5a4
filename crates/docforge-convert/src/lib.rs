//! Best-effort office format conversion
//!
//! Content is pulled out of the input with a format-specific reader and
//! re-rendered, never translated structurally. Where no writer exists for
//! the requested format (DOCX, PPTX) the bytes are a PDF stand-in; the
//! reported extension and content type still follow the request.

pub mod docx;
pub mod error;
pub mod format;
pub mod package;
pub mod pdf_text;
pub mod pptx;
pub mod render;
pub mod spreadsheet;
pub mod xlsx;

pub use error::{ConvertError, Result, SUPPORTED_CONVERSIONS};
pub use format::{file_extension, Conversion, InputFormat, OutputFormat};
pub use render::{render_pdf, Block, PageSetup};

use tracing::info;
use xlsx::CellValue;

const PDF_CONTENT_SHEET: &str = "PDF Content";

/// Output of a successful conversion.
#[derive(Debug)]
pub struct Converted {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
}

impl Converted {
    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Convert an uploaded file to the requested format.
///
/// `file_name` only supplies the input extension. Pairs outside the
/// dispatch table fail with [`ConvertError::Unsupported`] before the input
/// is read.
pub fn convert(bytes: &[u8], file_name: &str, output_format: &str) -> Result<Converted> {
    let extension = file_extension(file_name);
    let output = OutputFormat::parse(output_format);
    let conversion = InputFormat::from_extension(&extension)
        .zip(output)
        .and_then(|(input, output)| Conversion::resolve(input, output));

    let (Some(conversion), Some(format)) = (conversion, output) else {
        return Err(ConvertError::Unsupported {
            extension,
            format: output_format.to_string(),
        });
    };

    let bytes = run(conversion, bytes)?;
    info!(?conversion, output_size = bytes.len(), "conversion finished");
    Ok(Converted { bytes, format })
}

fn run(conversion: Conversion, bytes: &[u8]) -> Result<Vec<u8>> {
    match conversion {
        Conversion::DocxToPdf => {
            let blocks = docx::read_blocks(bytes)?;
            render_pdf(&blocks, &PageSetup::a4_portrait(20.0, 20.0))
        }
        Conversion::SpreadsheetToPdf(kind) => {
            let sheets = spreadsheet::read_workbook(bytes, kind)?;
            let blocks = spreadsheet::sheets_to_blocks(sheets);
            render_pdf(&blocks, &PageSetup::a4_portrait(15.0, 20.0))
        }
        Conversion::PdfToDocx => {
            let text = pdf_text::extract_text(bytes)?;
            let mut blocks = vec![Block::heading(1, "Converted from PDF")];
            blocks.extend(pdf_text::text_lines(&text).into_iter().map(Block::Paragraph));
            render_pdf(&blocks, &PageSetup::a4_portrait(25.0, 25.0))
        }
        Conversion::PdfToXlsx => {
            let text = pdf_text::extract_text(bytes)?;
            let mut rows = vec![vec![CellValue::text("Line"), CellValue::text("Content")]];
            rows.extend(
                pdf_text::text_lines(&text)
                    .into_iter()
                    .enumerate()
                    .map(|(i, line)| vec![CellValue::Number((i + 1) as f64), CellValue::Text(line)]),
            );
            xlsx::write_workbook(PDF_CONTENT_SHEET, &rows)
        }
        Conversion::PptxToPdf => {
            let slides = pptx::read_slides(bytes)?;
            render_pdf(&slides, &PageSetup::a4_landscape(0.0))
        }
        Conversion::PdfToPptx => {
            let text = pdf_text::extract_text(bytes)?;
            let slides = pdf_text::text_slides(&text);
            render_pdf(&slides, &PageSetup::a4_landscape(0.0))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::content::Content;
    use lopdf::{Document, Object};

    /// Decoded `Tj` strings on a page, in drawing order.
    pub fn shown_text(pdf: &[u8], page_number: u32) -> Vec<String> {
        let mut doc = Document::load_mem(pdf).unwrap();
        doc.decompress();
        let page_id = doc.get_pages()[&page_number];
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match &op.operands[0] {
                Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            })
            .collect()
    }
}
