//! Plain text out of PDFs, and the line/slide splits built on it

use crate::error::{ConvertError, Result};
use crate::render::Block;
use pdf_extract::extract_text_from_mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// Extract the text layer of a PDF.
///
/// Scanned documents come back empty rather than failing; there is no OCR.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed inputs instead of returning Err
    let extracted = catch_unwind(AssertUnwindSafe(|| extract_text_from_mem(bytes)))
        .map_err(|_| {
            warn!("pdf-extract panicked while reading document");
            ConvertError::PdfText("text extraction aborted on malformed PDF".to_string())
        })?;

    let text = extracted.map_err(|e| ConvertError::PdfText(e.to_string()))?;
    debug!(chars = text.len(), "extracted PDF text");
    Ok(text)
}

/// Non-blank lines, trimmed.
pub fn text_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// One slide per blank-line separated chunk of text.
///
/// The chunk's first line is the title; a chunk starting with a blank line
/// is titled "Slide N" instead.
pub fn text_slides(text: &str) -> Vec<Block> {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .filter(|chunk| !chunk.trim().is_empty())
        .enumerate()
        .map(|(index, chunk)| {
            let mut lines = chunk.split('\n');
            let title = lines
                .next()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Slide {}", index + 1));
            let body = lines
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            Block::Slide { title, body }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{render_pdf, PageSetup};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extracts_rendered_text() {
        let pdf = render_pdf(
            &[Block::paragraph("Hello extraction")],
            &PageSetup::a4_portrait(20.0, 20.0),
        )
        .unwrap();
        let text = extract_text(&pdf).unwrap();
        assert!(text.contains("Hello"), "got {:?}", text);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(matches!(
            extract_text(b"this is not a pdf"),
            Err(ConvertError::PdfText(_))
        ));
    }

    #[test]
    fn test_text_lines() {
        assert_eq!(
            text_lines("  first  \n\n\u{c}\nsecond\r\n   \nthird"),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_text_slides() {
        let slides = text_slides("Intro\nwelcome all\n\nAgenda\none\ntwo\n\n   \n\n\nlate start");
        assert_eq!(
            slides,
            vec![
                Block::Slide {
                    title: "Intro".into(),
                    body: vec!["welcome all".into()],
                },
                Block::Slide {
                    title: "Agenda".into(),
                    body: vec!["one".into(), "two".into()],
                },
                Block::Slide {
                    title: "Slide 3".into(),
                    body: vec!["late start".into()],
                },
            ]
        );
    }
}
