//! PDF Split algorithm
//!
//! Extracts a subset of pages into a new document.

use crate::error::{DocumentError, Result};
use crate::pages;
use crate::ranges::parse_page_ranges;
use std::collections::HashSet;
use tracing::debug;

/// Extract the pages at the given zero-based indices.
///
/// Pages keep their original relative order. Works on a copy of the
/// document:
/// 1. Delete every page that is not selected
/// 2. Prune objects no longer reachable from the trailer
/// 3. Compress and serialize
pub fn extract_pages(bytes: &[u8], indices: &[u32]) -> Result<Vec<u8>> {
    if indices.is_empty() {
        return Err(DocumentError::InvalidSelection("No pages specified".into()));
    }

    let mut doc = pages::load(bytes)?;
    let page_count = doc.get_pages().len() as u32;

    if let Some(&index) = indices.iter().find(|&&i| i >= page_count) {
        return Err(DocumentError::InvalidSelection(format!(
            "Page {} does not exist (document has {} pages)",
            index + 1,
            page_count
        )));
    }

    // lopdf numbers pages from 1
    let pages_to_keep: HashSet<u32> = indices.iter().map(|i| i + 1).collect();
    let mut pages_to_delete: Vec<u32> = (1..=page_count)
        .filter(|p| !pages_to_keep.contains(p))
        .collect();

    // Delete in reverse order so remaining page numbers stay valid
    pages_to_delete.reverse();
    for page_num in pages_to_delete {
        doc.delete_pages(&[page_num]);
    }

    doc.prune_objects();
    doc.compress();

    debug!(kept = pages_to_keep.len(), of = page_count, "split document");
    pages::save(&mut doc)
}

/// Split by a page-range expression such as `"1-3, 5"`.
///
/// The expression is resolved against the document's own page count; an
/// expression that selects nothing is an `InvalidSelection`.
pub fn split_document(bytes: &[u8], ranges: &str) -> Result<Vec<u8>> {
    let page_count = pages::page_count(bytes)?;
    let indices = parse_page_ranges(ranges, page_count);
    if indices.is_empty() {
        return Err(DocumentError::InvalidSelection(format!(
            "'{}' selects no pages of a {}-page document",
            ranges, page_count
        )));
    }
    extract_pages(bytes, &indices)
}
