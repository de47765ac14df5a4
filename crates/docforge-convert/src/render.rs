//! Block layout onto PDF pages
//!
//! Readers turn their input into a flat list of [`Block`]s; this module
//! flows them onto fixed-size pages with Helvetica metrics, wrapping long
//! lines and starting a new page when the cursor reaches the bottom margin.

use crate::error::Result;
use docforge_core::fonts::{encode_win_ansi, StandardFont};
use docforge_core::pages;
use docforge_core::DocumentError;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat};

const POINTS_PER_MM: f32 = 72.0 / 25.4;
const A4_WIDTH: f32 = 595.28;
const A4_HEIGHT: f32 = 841.89;

const BODY_SIZE: f32 = 11.0;
const TABLE_SIZE: f32 = 9.0;
const LINE_HEIGHT: f32 = 1.6;
const TEXT_GRAY: f32 = 0.2;
const CELL_PADDING: f32 = 4.0;

const SLIDE_TITLE_SIZE: f32 = 32.0;
const SLIDE_BODY_SIZE: f32 = 18.0;
const SLIDE_TITLE_STEP: f32 = SLIDE_TITLE_SIZE * 1.3;
const SLIDE_BODY_STEP: f32 = SLIDE_BODY_SIZE * LINE_HEIGHT;
const SLIDE_GAP: f32 = 30.0;
const SLIDE_MARGIN: f32 = 40.0;
const SLIDE_BACKGROUND: [f32; 3] = [0.4, 0.49, 0.92];

/// Page size and margins, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin_x: f32,
    pub margin_y: f32,
}

impl PageSetup {
    pub fn a4_portrait(margin_x_mm: f32, margin_y_mm: f32) -> Self {
        Self {
            width: A4_WIDTH,
            height: A4_HEIGHT,
            margin_x: margin_x_mm * POINTS_PER_MM,
            margin_y: margin_y_mm * POINTS_PER_MM,
        }
    }

    pub fn a4_landscape(margin_mm: f32) -> Self {
        Self {
            width: A4_HEIGHT,
            height: A4_WIDTH,
            margin_x: margin_mm * POINTS_PER_MM,
            margin_y: margin_mm * POINTS_PER_MM,
        }
    }

    fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin_x
    }

    fn top(&self) -> f32 {
        self.height - self.margin_y
    }
}

/// A unit of document content, independent of the source format.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Level 0 is a document title
    Heading { level: u8, text: String },
    Paragraph(String),
    Table { rows: Vec<Vec<String>>, header: bool },
    /// Always occupies a page of its own
    Slide { title: String, body: Vec<String> },
}

impl Block {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level,
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph(text.into())
    }
}

/// Lay out `blocks` and serialize the resulting PDF.
///
/// An empty block list still produces a single blank page.
pub fn render_pdf(blocks: &[Block], setup: &PageSetup) -> Result<Vec<u8>> {
    let mut layout = Layout::new(setup);
    for block in blocks {
        layout.place(block);
    }
    let page_operations = layout.into_pages();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = pages::add_standard_font(&mut doc, StandardFont::Helvetica.base_font());
    let bold = pages::add_standard_font(&mut doc, StandardFont::HelveticaBold.base_font());
    let mut fonts = Dictionary::new();
    fonts.set(font_resource(StandardFont::Helvetica), Object::Reference(regular));
    fonts.set(font_resource(StandardFont::HelveticaBold), Object::Reference(bold));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    let resources_id = doc.add_object(Object::Dictionary(resources));

    let mut kids = Vec::with_capacity(page_operations.len());
    for operations in page_operations {
        let encoded = Content { operations }
            .encode()
            .map_err(|e| DocumentError::OperationError(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(kids.len() as i64));
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(setup.width),
            Object::Real(setup.height),
        ]),
    );
    pages_dict.set("Resources", Object::Reference(resources_id));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.compress();
    Ok(pages::save(&mut doc)?)
}

fn font_resource(font: StandardFont) -> &'static str {
    match font {
        StandardFont::Helvetica => "F1",
        StandardFont::HelveticaBold => "F2",
    }
}

/// Break `text` into lines no wider than `max_width`.
///
/// Explicit newlines are kept, words longer than a whole line are broken
/// between characters.
pub fn wrap_text(text: &str, font: StandardFont, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.split('\n') {
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if font.text_width(&candidate, size) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if font.text_width(word, size) <= max_width {
                current = word.to_string();
                continue;
            }
            for ch in word.chars() {
                current.push(ch);
                if current.chars().count() > 1 && font.text_width(&current, size) > max_width {
                    current.pop();
                    lines.push(std::mem::replace(&mut current, ch.to_string()));
                }
            }
        }
        lines.push(current);
    }

    lines
}

/// Shorten `text` with an ellipsis until it fits in `max_width`.
fn fit_text(text: &str, font: StandardFont, size: f32, max_width: f32) -> String {
    if font.text_width(text, size) <= max_width {
        return text.to_string();
    }
    let mut fitted: String = text.to_string();
    while !fitted.is_empty() {
        fitted.pop();
        let candidate = format!("{}…", fitted.trim_end());
        if font.text_width(&candidate, size) <= max_width {
            return candidate;
        }
    }
    String::new()
}

struct Layout<'a> {
    setup: &'a PageSetup,
    pages: Vec<Vec<Operation>>,
    operations: Vec<Operation>,
    cursor_y: f32,
}

impl<'a> Layout<'a> {
    fn new(setup: &'a PageSetup) -> Self {
        Self {
            setup,
            pages: Vec::new(),
            operations: Vec::new(),
            cursor_y: setup.top(),
        }
    }

    fn into_pages(mut self) -> Vec<Vec<Operation>> {
        if !self.operations.is_empty() || self.pages.is_empty() {
            self.finish_page();
        }
        self.pages
    }

    fn finish_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.operations));
        self.cursor_y = self.setup.top();
    }

    /// Start a new page unless `needed` points still fit on this one.
    fn ensure_space(&mut self, needed: f32) {
        if !self.operations.is_empty() && self.cursor_y - needed < self.setup.margin_y {
            self.finish_page();
        }
    }

    fn place(&mut self, block: &Block) {
        match block {
            Block::Heading { level, text } => {
                let size = match level {
                    0 => 28.0,
                    1 => 24.0,
                    2 => 20.0,
                    3 => 16.0,
                    _ => 14.0,
                };
                if !self.operations.is_empty() {
                    self.cursor_y -= size * 0.6;
                }
                self.lines(text, StandardFont::HelveticaBold, size, size * 0.5);
            }
            Block::Paragraph(text) => {
                self.lines(text, StandardFont::Helvetica, BODY_SIZE, BODY_SIZE * 0.8);
            }
            Block::Table { rows, header } => self.table(rows, *header),
            Block::Slide { title, body } => self.slide(title, body),
        }
    }

    fn lines(&mut self, text: &str, font: StandardFont, size: f32, space_after: f32) {
        let line_height = size * LINE_HEIGHT;
        for line in wrap_text(text, font, size, self.setup.content_width()) {
            self.ensure_space(line_height);
            self.cursor_y -= line_height;
            let baseline = self.cursor_y + (line_height - size) / 2.0;
            self.text(font, size, self.setup.margin_x, baseline, TEXT_GRAY, &line);
        }
        self.cursor_y -= space_after;
    }

    fn table(&mut self, rows: &[Vec<String>], header: bool) {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return;
        }
        let column_width = self.setup.content_width() / columns as f32;
        let row_height = TABLE_SIZE * LINE_HEIGHT + CELL_PADDING;

        for (index, row) in rows.iter().enumerate() {
            self.ensure_space(row_height);
            let top = self.cursor_y;
            let bottom = top - row_height;
            let emphasize = header && index == 0;
            let font = if emphasize {
                StandardFont::HelveticaBold
            } else {
                StandardFont::Helvetica
            };

            if emphasize {
                self.rectangle(
                    self.setup.margin_x,
                    bottom,
                    column_width * columns as f32,
                    row_height,
                    Paint::Fill([0.96; 3]),
                );
            }

            for column in 0..columns {
                let x = self.setup.margin_x + column as f32 * column_width;
                self.rectangle(x, bottom, column_width, row_height, Paint::Stroke(0.87));

                let Some(cell) = row.get(column) else {
                    continue;
                };
                let flattened = cell.split_whitespace().collect::<Vec<_>>().join(" ");
                let shown = fit_text(
                    &flattened,
                    font,
                    TABLE_SIZE,
                    column_width - 2.0 * CELL_PADDING,
                );
                if !shown.is_empty() {
                    let baseline = top - row_height / 2.0 - TABLE_SIZE * 0.35;
                    self.text(font, TABLE_SIZE, x + CELL_PADDING, baseline, TEXT_GRAY, &shown);
                }
            }

            self.cursor_y = bottom;
        }
        self.cursor_y -= BODY_SIZE;
    }

    /// One page per slide; a body too long for the page continues on
    /// further pages under the same title.
    fn slide(&mut self, title: &str, body: &[String]) {
        if !self.operations.is_empty() {
            self.finish_page();
        }

        let max_width = self.setup.width * 0.8;
        let title_lines = wrap_text(title, StandardFont::HelveticaBold, SLIDE_TITLE_SIZE, max_width);
        let body_lines: Vec<String> = body
            .iter()
            .flat_map(|line| wrap_text(line, StandardFont::Helvetica, SLIDE_BODY_SIZE, max_width))
            .collect();

        let room = self.setup.height
            - 2.0 * SLIDE_MARGIN
            - title_lines.len() as f32 * SLIDE_TITLE_STEP
            - SLIDE_GAP;
        let per_page = ((room / SLIDE_BODY_STEP).floor() as usize).max(1);

        if body_lines.is_empty() {
            self.slide_page(&title_lines, &[]);
        } else {
            for chunk in body_lines.chunks(per_page) {
                self.slide_page(&title_lines, chunk);
            }
        }
    }

    fn slide_page(&mut self, title_lines: &[String], body_lines: &[String]) {
        let (width, height) = (self.setup.width, self.setup.height);
        self.rectangle(0.0, 0.0, width, height, Paint::Fill(SLIDE_BACKGROUND));

        let gap = if body_lines.is_empty() { 0.0 } else { SLIDE_GAP };
        let total = title_lines.len() as f32 * SLIDE_TITLE_STEP
            + gap
            + body_lines.len() as f32 * SLIDE_BODY_STEP;

        let mut y = height / 2.0 + total / 2.0;
        for line in title_lines {
            y -= SLIDE_TITLE_STEP;
            self.centered(StandardFont::HelveticaBold, SLIDE_TITLE_SIZE, y, line);
        }
        y -= gap;
        for line in body_lines {
            y -= SLIDE_BODY_STEP;
            self.centered(StandardFont::Helvetica, SLIDE_BODY_SIZE, y, line);
        }

        self.finish_page();
    }

    fn centered(&mut self, font: StandardFont, size: f32, y: f32, text: &str) {
        let x = (self.setup.width - font.text_width(text, size)) / 2.0;
        self.text(font, size, x, y, 1.0, text);
    }

    fn text(&mut self, font: StandardFont, size: f32, x: f32, y: f32, gray: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(font_resource(font).as_bytes().to_vec()),
                    Object::Real(size),
                ],
            ),
            Operation::new("g", vec![Object::Real(gray)]),
            Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Hexadecimal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    fn rectangle(&mut self, x: f32, y: f32, width: f32, height: f32, paint: Paint) {
        let rect = Operation::new(
            "re",
            vec![
                Object::Real(x),
                Object::Real(y),
                Object::Real(width),
                Object::Real(height),
            ],
        );
        let (color, painter) = match paint {
            Paint::Fill([r, g, b]) => (
                Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
                Operation::new("f", vec![]),
            ),
            Paint::Stroke(gray) => (
                Operation::new("G", vec![Object::Real(gray)]),
                Operation::new("S", vec![]),
            ),
        };
        self.operations.extend([
            Operation::new("q", vec![]),
            color,
            Operation::new("w", vec![Object::Real(0.5)]),
            rect,
            painter,
            Operation::new("Q", vec![]),
        ]);
    }
}

#[derive(Debug, Clone, Copy)]
enum Paint {
    Fill([f32; 3]),
    Stroke(f32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::shown_text;
    use pretty_assertions::assert_eq;

    fn page_count(pdf: &[u8]) -> usize {
        Document::load_mem(pdf).unwrap().get_pages().len()
    }

    #[test]
    fn test_empty_input_gives_one_blank_page() {
        let pdf = render_pdf(&[], &PageSetup::a4_portrait(20.0, 20.0)).unwrap();
        assert_eq!(page_count(&pdf), 1);
    }

    #[test]
    fn test_heading_and_paragraph_text() {
        let blocks = vec![
            Block::heading(1, "Report"),
            Block::paragraph("First paragraph."),
            Block::paragraph("Second paragraph."),
        ];
        let pdf = render_pdf(&blocks, &PageSetup::a4_portrait(20.0, 20.0)).unwrap();
        assert_eq!(
            shown_text(&pdf, 1),
            vec!["Report", "First paragraph.", "Second paragraph."]
        );
    }

    #[test]
    fn test_long_content_paginates() {
        let blocks: Vec<Block> = (0..200)
            .map(|i| Block::paragraph(format!("Line number {}", i)))
            .collect();
        let pdf = render_pdf(&blocks, &PageSetup::a4_portrait(20.0, 20.0)).unwrap();
        assert!(page_count(&pdf) > 1);

        let doc = Document::load_mem(&pdf).unwrap();
        let total: usize = (1..=doc.get_pages().len() as u32)
            .map(|p| shown_text(&pdf, p).len())
            .sum();
        assert_eq!(total, 200);
    }

    #[test]
    fn test_slides_get_their_own_pages() {
        let blocks = vec![
            Block::paragraph("Preamble"),
            Block::Slide {
                title: "One".into(),
                body: vec!["alpha".into()],
            },
            Block::Slide {
                title: "Two".into(),
                body: vec![],
            },
        ];
        let pdf = render_pdf(&blocks, &PageSetup::a4_landscape(0.0)).unwrap();
        assert_eq!(page_count(&pdf), 3);
        assert_eq!(shown_text(&pdf, 2), vec!["One", "alpha"]);
        assert_eq!(shown_text(&pdf, 3), vec!["Two"]);
    }

    #[test]
    fn test_long_slide_body_continues_on_next_page() {
        let body: Vec<String> = (1..=40).map(|i| format!("point {}", i)).collect();
        let blocks = vec![Block::Slide {
            title: "Agenda".into(),
            body,
        }];
        let pdf = render_pdf(&blocks, &PageSetup::a4_landscape(0.0)).unwrap();
        let pages = page_count(&pdf) as u32;
        assert!(pages > 1);

        let mut shown = Vec::new();
        for page in 1..=pages {
            let text = shown_text(&pdf, page);
            assert_eq!(text[0], "Agenda");
            shown.extend(text.into_iter().skip(1));
        }
        let expected: Vec<String> = (1..=40).map(|i| format!("point {}", i)).collect();
        assert_eq!(shown, expected);

        // Every baseline stays on the page
        let mut doc = Document::load_mem(&pdf).unwrap();
        doc.decompress();
        for (_, page_id) in doc.get_pages() {
            let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
            for op in content.operations.iter().filter(|op| op.operator == "Td") {
                let y = pages::number(&op.operands[1]).unwrap();
                assert!(y >= SLIDE_MARGIN, "baseline {} below the margin", y);
            }
        }
    }

    #[test]
    fn test_landscape_media_box() {
        let pdf = render_pdf(&[], &PageSetup::a4_landscape(0.0)).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let page_id = doc.get_pages()[&1];
        let [_, _, w, h] = pages::media_box(&doc, page_id);
        assert!(w > h);
    }

    #[test]
    fn test_table_cells_are_drawn() {
        let blocks = vec![Block::Table {
            rows: vec![
                vec!["Name".into(), "Qty".into()],
                vec!["Apples".into(), "3".into()],
                vec!["Pears".into()],
            ],
            header: true,
        }];
        let pdf = render_pdf(&blocks, &PageSetup::a4_portrait(15.0, 20.0)).unwrap();
        assert_eq!(shown_text(&pdf, 1), vec!["Name", "Qty", "Apples", "3", "Pears"]);
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(10);
        let lines = wrap_text(&text, StandardFont::Helvetica, 11.0, 200.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(StandardFont::Helvetica.text_width(line, 11.0) <= 200.0);
        }
        assert_eq!(
            lines.join(" ").split_whitespace().count(),
            text.split_whitespace().count()
        );
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let word = "x".repeat(300);
        let lines = wrap_text(&word, StandardFont::Helvetica, 11.0, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_wrap_keeps_explicit_newlines() {
        let lines = wrap_text("a\n\nb", StandardFont::Helvetica, 11.0, 500.0);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn test_fit_text_adds_ellipsis() {
        let fitted = fit_text("a very long cell value indeed", StandardFont::Helvetica, 9.0, 40.0);
        assert!(fitted.ends_with('…'));
        assert!(StandardFont::Helvetica.text_width(&fitted, 9.0) <= 40.0);
    }
}
