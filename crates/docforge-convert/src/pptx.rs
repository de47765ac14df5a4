//! PPTX slide text extraction

use crate::error::Result;
use crate::package::{xml_reader, OfficePackage};
use crate::render::Block;
use quick_xml::events::Event;
use tracing::debug;

const SLIDE_PREFIX: &str = "ppt/slides/slide";
const SLIDE_SUFFIX: &str = ".xml";

/// Read every slide as a [`Block::Slide`], in slide-number order.
///
/// The first non-empty paragraph on a slide becomes its title; a slide
/// without text is titled "Slide N".
pub fn read_slides(bytes: &[u8]) -> Result<Vec<Block>> {
    let mut package = OfficePackage::open(bytes)?;

    let mut parts: Vec<(u32, String)> = package
        .part_names()
        .into_iter()
        .filter_map(|name| slide_number(&name).map(|n| (n, name)))
        .collect();
    parts.sort_by_key(|(number, _)| *number);

    let mut slides = Vec::with_capacity(parts.len());
    for (index, (_, part)) in parts.iter().enumerate() {
        let xml = package.read_part(part)?;
        let mut paragraphs = slide_paragraphs(&xml)?.into_iter();
        let title = paragraphs
            .next()
            .unwrap_or_else(|| format!("Slide {}", index + 1));
        slides.push(Block::Slide {
            title,
            body: paragraphs.collect(),
        });
    }

    debug!(slides = slides.len(), "read PPTX slides");
    Ok(slides)
}

/// `ppt/slides/slide7.xml` → 7. Layouts, masters and rels parts are skipped.
fn slide_number(part: &str) -> Option<u32> {
    part.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(SLIDE_SUFFIX)?
        .parse()
        .ok()
}

/// Non-empty DrawingML paragraphs of one slide.
fn slide_paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = xml_reader(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = current.trim();
                    if !text.is_empty() {
                        paragraphs.push(text.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"br" => current.push('\n'),
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
