//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document, pages in input order.

use crate::error::{DocumentError, Result};
use crate::pages;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use tracing::debug;

/// Merge multiple PDFs into one
///
/// The algorithm:
/// 1. If empty, return error
/// 2. Load every document, pinning inherited page attributes onto the pages
/// 3. Take the first document as the destination
/// 4. For each remaining source document:
///    a. Calculate ID offset to avoid conflicts
///    b. Import all objects with remapped IDs
///    c. Append pages to the destination
/// 5. Rebuild the destination page tree, prune orphans, compress
pub fn merge_documents<B: AsRef<[u8]>>(documents: &[B]) -> Result<Vec<u8>> {
    if documents.is_empty() {
        return Err(DocumentError::OperationError(
            "No documents to merge".into(),
        ));
    }

    let mut loaded_docs = Vec::with_capacity(documents.len());
    for (i, doc_bytes) in documents.iter().enumerate() {
        let mut doc = Document::load_mem(doc_bytes.as_ref()).map_err(|e| {
            DocumentError::ParseError(format!("Failed to load document {}: {}", i, e))
        })?;
        for page_id in pages::page_ids(&doc) {
            pages::materialize_inherited(&mut doc, page_id)?;
        }
        loaded_docs.push(doc);
    }

    let mut dest = loaded_docs.remove(0);
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = pages::page_ids(&dest);

    for source in loaded_docs.into_iter() {
        let source_pages = pages::page_ids(&source);
        let id_offset = dest_max_id;

        let mut remapped_objects = BTreeMap::new();
        for (old_id, object) in source.objects.into_iter() {
            let new_id = (old_id.0 + id_offset, old_id.1);
            remapped_objects.insert(new_id, remap_object_refs(object, id_offset));
        }
        dest.objects.extend(remapped_objects);

        dest_page_refs.extend(
            source_pages
                .into_iter()
                .map(|(num, generation)| (num + id_offset, generation)),
        );

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    dest.max_id = dest_max_id;
    update_page_tree(&mut dest, &dest_page_refs)?;

    // Source catalogs and page trees are now unreachable
    let pruned = dest.prune_objects();
    debug!(
        documents = documents.len(),
        pages = dest_page_refs.len(),
        pruned = pruned.len(),
        "merged documents"
    );

    dest.compress();
    pages::save(&mut dest)
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Point the destination page tree at `page_refs` and re-parent every page
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<()> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| DocumentError::OperationError("No Root in trailer".into()))?;

    let pages_id = doc
        .get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| DocumentError::OperationError("No Pages in catalog".into()))?;

    if let Some(Object::Dictionary(ref mut pages_dict)) = doc.objects.get_mut(&pages_id) {
        let kids = page_refs
            .iter()
            .map(|&id| Object::Reference(id))
            .collect::<Vec<_>>();
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
    } else {
        return Err(DocumentError::OperationError(
            "Invalid pages dictionary".into(),
        ));
    }

    for &page_id in page_refs {
        if let Some(Object::Dictionary(ref mut page)) = doc.objects.get_mut(&page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(())
}
