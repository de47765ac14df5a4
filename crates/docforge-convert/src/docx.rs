//! DOCX body extraction
//!
//! Walks `word/document.xml` and keeps what the layout renderer can show:
//! paragraph text, heading levels from paragraph styles, and table cells.
//! Run formatting, images and numbering are dropped.

use crate::error::Result;
use crate::package::{attribute, xml_reader, OfficePackage};
use crate::render::Block;
use quick_xml::events::Event;
use tracing::debug;

const DOCUMENT_PART: &str = "word/document.xml";

/// Read the body of a DOCX file as layout blocks.
pub fn read_blocks(bytes: &[u8]) -> Result<Vec<Block>> {
    let mut package = OfficePackage::open(bytes)?;
    let xml = package.read_part(DOCUMENT_PART)?;
    let blocks = parse_document(&xml)?;
    debug!(blocks = blocks.len(), "read DOCX body");
    Ok(blocks)
}

#[derive(Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

#[derive(Default)]
struct BodyParser {
    blocks: Vec<Block>,
    text: String,
    heading: Option<u8>,
    in_text: bool,
    /// Nesting depth of `w:tbl`; only the outermost table is kept as a grid
    table_depth: usize,
    table: TableState,
}

impl BodyParser {
    fn start(&mut self, name: &[u8]) {
        match name {
            b"p" => {
                self.text.clear();
                self.heading = None;
            }
            b"t" => self.in_text = true,
            b"tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.table = TableState::default();
                }
            }
            b"tr" if self.table_depth == 1 => self.table.row.clear(),
            b"tc" if self.table_depth == 1 => self.table.cell.clear(),
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_text = false,
            b"p" => self.finish_paragraph(),
            b"tc" if self.table_depth == 1 => {
                let cell = std::mem::take(&mut self.table.cell);
                self.table.row.push(cell.trim().to_string());
            }
            b"tr" if self.table_depth == 1 => {
                let row = std::mem::take(&mut self.table.row);
                self.table.rows.push(row);
            }
            b"tbl" => {
                self.table_depth = self.table_depth.saturating_sub(1);
                if self.table_depth == 0 {
                    let rows = std::mem::take(&mut self.table.rows);
                    if !rows.is_empty() {
                        self.blocks.push(Block::Table {
                            rows,
                            header: false,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    fn empty(&mut self, name: &[u8]) {
        match name {
            b"tab" => self.text.push('\t'),
            b"br" | b"cr" => self.text.push('\n'),
            _ => {}
        }
    }

    fn finish_paragraph(&mut self) {
        let text = std::mem::take(&mut self.text);

        if self.table_depth > 0 {
            let text = text.trim();
            if !text.is_empty() {
                if !self.table.cell.is_empty() {
                    self.table.cell.push('\n');
                }
                self.table.cell.push_str(text);
            }
            return;
        }

        if text.trim().is_empty() {
            return;
        }
        let text = text.replace('\t', " ");
        self.blocks.push(match self.heading.take() {
            Some(level) => Block::heading(level, text.trim()),
            None => Block::paragraph(text.trim_end()),
        });
    }
}

/// Heading level encoded in a paragraph style id (`Title`, `Heading1`...).
fn heading_level(style: &str) -> Option<u8> {
    let lower = style.to_ascii_lowercase();
    if lower == "title" {
        return Some(0);
    }
    let digits = lower.strip_prefix("heading")?;
    digits.trim().parse::<u8>().ok().filter(|level| *level > 0)
}

fn parse_document(xml: &str) -> Result<Vec<Block>> {
    let mut reader = xml_reader(xml);
    let mut parser = BodyParser::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => parser.start(e.local_name().as_ref()),
            Event::End(e) => parser.end(e.local_name().as_ref()),
            Event::Empty(e) => {
                let local = e.local_name();
                if local.as_ref() == b"pStyle" {
                    parser.heading = attribute(&e, b"val").as_deref().and_then(heading_level);
                } else {
                    parser.empty(local.as_ref());
                }
            }
            Event::Text(t) if parser.in_text => {
                parser.text.push_str(&t.unescape()?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(parser.blocks)
}
