//! Text stamps drawn over page content

use crate::error::Result;
use crate::fonts::{encode_win_ansi, StandardFont};
use crate::pages;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, StringFormat};

/// Where a stamp is placed on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Horizontally and vertically centred
    Center,
    /// Anchored near the top-right corner, inset by the given offsets
    TopRight { inset_x: f32, inset_y: f32 },
}

/// Appearance of a text stamp.
#[derive(Debug, Clone, PartialEq)]
pub struct StampStyle {
    pub font: StandardFont,
    pub font_size: f32,
    pub opacity: f32,
    /// Grey level, 0.0 black to 1.0 white
    pub gray: f32,
    pub placement: Placement,
}

impl Default for StampStyle {
    fn default() -> Self {
        Self {
            font: StandardFont::HelveticaBold,
            font_size: 50.0,
            opacity: 0.3,
            gray: 0.5,
            placement: Placement::Center,
        }
    }
}

/// Overlay `text` on every page with the default watermark style.
pub fn watermark_document(bytes: &[u8], text: &str) -> Result<Vec<u8>> {
    let mut doc = pages::load(bytes)?;
    stamp_pages(&mut doc, text, &StampStyle::default())?;
    pages::save(&mut doc)
}

/// Draw `text` on every page of an already loaded document.
pub fn stamp_pages(doc: &mut Document, text: &str, style: &StampStyle) -> Result<()> {
    let font_id = pages::add_standard_font(doc, style.font.base_font());
    let state_id = pages::add_opacity_state(doc, style.opacity);
    let text_width = style.font.text_width(text, style.font_size);

    for page_id in pages::page_ids(doc) {
        let [x0, y0, x1, y1] = pages::media_box(doc, page_id);
        let (width, height) = (x1 - x0, y1 - y0);

        let (x, y) = match style.placement {
            Placement::Center => (
                x0 + width / 2.0 - text_width / 2.0,
                y0 + height / 2.0 - style.font_size / 2.0,
            ),
            Placement::TopRight { inset_x, inset_y } => (x1 - inset_x, y1 - inset_y),
        };

        pages::add_resource(doc, page_id, "Font", "DFStamp", font_id)?;
        pages::add_resource(doc, page_id, "ExtGState", "DFStampGS", state_id)?;

        let content = Content {
            operations: stamp_operations(text, style, x, y),
        };
        let encoded = content
            .encode()
            .map_err(|e| crate::DocumentError::OperationError(e.to_string()))?;
        pages::append_overlay(doc, page_id, encoded)?;
    }

    Ok(())
}

fn stamp_operations(text: &str, style: &StampStyle, x: f32, y: f32) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(b"DFStampGS".to_vec())]),
        Operation::new("g", vec![Object::Real(style.gray)]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(b"DFStamp".to_vec()),
                Object::Real(style.font_size),
            ],
        ),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Hexadecimal)],
        ),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]
}
