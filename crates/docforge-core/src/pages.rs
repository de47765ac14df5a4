//! Page-tree helpers shared by the document operations
//!
//! lopdf exposes the raw object graph; these helpers cover the few
//! page-level concerns every operation needs: inherited attributes, page
//! geometry, per-page resources, and appending drawing instructions.

use crate::error::{DocumentError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Attributes a page may inherit from its ancestors in the page tree.
pub const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// US Letter, used when a page declares no usable MediaBox anywhere.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Load a PDF from memory.
pub fn load(bytes: &[u8]) -> Result<Document> {
    Document::load_mem(bytes).map_err(|e| DocumentError::ParseError(e.to_string()))
}

/// Serialize a document to bytes.
pub fn save(doc: &mut Document) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| DocumentError::SaveError(e.to_string()))?;
    Ok(buffer)
}

/// Parse PDF bytes and return page count
pub fn page_count(bytes: &[u8]) -> Result<u32> {
    let doc = load(bytes)?;
    Ok(doc.get_pages().len() as u32)
}

/// Page object ids in document order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Resolve an attribute on a page, walking up `Parent` links when the page
/// itself does not define it. References are followed once.
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // Page trees are shallow; the bound only guards against Parent cycles
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value).clone());
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Copy inherited attributes onto the page dictionary itself so the page
/// survives being moved to a different page tree.
pub fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut found = Vec::new();
    {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| DocumentError::OperationError(e.to_string()))?;
        for key in INHERITABLE_ATTRIBUTES {
            if !page.has(key) {
                if let Some(value) = inherited_attribute(doc, page_id, key) {
                    found.push((key.to_vec(), value));
                }
            }
        }
    }

    let page = page_dict_mut(doc, page_id)?;
    for (key, value) in found {
        page.set(key, value);
    }
    Ok(())
}

/// Effective page rotation in degrees, as declared (possibly inherited).
pub fn rotation(doc: &Document, page_id: ObjectId) -> i64 {
    inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|value| number(&value))
        .map(|degrees| degrees as i64)
        .unwrap_or(0)
}

/// `[x0, y0, x1, y1]` of the page's MediaBox.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let Some(Object::Array(values)) = inherited_attribute(doc, page_id, b"MediaBox") else {
        return DEFAULT_MEDIA_BOX;
    };
    if values.len() != 4 {
        return DEFAULT_MEDIA_BOX;
    }

    let mut rect = [0.0f32; 4];
    for (slot, value) in rect.iter_mut().zip(values.iter()) {
        match number(resolve(doc, value)) {
            Some(n) => *slot = n,
            None => return DEFAULT_MEDIA_BOX,
        }
    }
    rect
}

/// Numeric value of an Integer or Real object.
pub fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(v) => Some(*v as f32),
        Object::Real(v) => Some(*v),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| DocumentError::OperationError(format!("Page {:?}: {}", page_id, e)))
}

/// Give the page its own direct `Resources` dictionary.
///
/// Inherited or shared (referenced) resources are copied so additions made
/// for one page never leak into pages that shared the original dictionary.
fn own_resources(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let resources = match inherited_attribute(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict,
        _ => Dictionary::new(),
    };
    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Register a named entry (font, graphics state, ...) in a page resource
/// category such as `Font` or `ExtGState`.
pub fn add_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    name: &str,
    target: ObjectId,
) -> Result<()> {
    own_resources(doc, page_id)?;

    // Categories may themselves be references to shared dictionaries
    let existing = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Resources").ok())
        .and_then(|res| res.as_dict().ok())
        .and_then(|res| res.get(category.as_bytes()).ok())
        .map(|entry| resolve(doc, entry).clone());
    let mut entries = match existing {
        Some(Object::Dictionary(dict)) => dict,
        _ => Dictionary::new(),
    };
    entries.set(name, Object::Reference(target));

    let page = page_dict_mut(doc, page_id)?;
    let resources = page
        .get_mut(b"Resources")
        .and_then(Object::as_dict_mut)
        .map_err(|e| DocumentError::OperationError(e.to_string()))?;
    resources.set(category, Object::Dictionary(entries));
    Ok(())
}

/// Append drawing instructions on top of the page's existing content.
///
/// The existing content is bracketed by `q`/`Q` so whatever graphics state
/// it leaves behind cannot affect the overlay.
pub fn append_overlay(doc: &mut Document, page_id: ObjectId, overlay: Vec<u8>) -> Result<()> {
    let existing: Vec<Object> = match doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Contents").ok())
    {
        Some(Object::Array(items)) => items.clone(),
        Some(Object::Reference(id)) => match doc.get_object(*id) {
            // A reference may point to an array of streams
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        _ => Vec::new(),
    };

    let mut contents = Vec::with_capacity(existing.len() + 2);
    if !existing.is_empty() {
        let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        contents.push(Object::Reference(open));
        contents.extend(existing);
        let close = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        contents.push(Object::Reference(close));
    }
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));
    contents.push(Object::Reference(overlay_id));

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

/// Add a Type1 standard font object and return its id.
pub fn add_standard_font(doc: &mut Document, base_font: &str) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(base_font.as_bytes().to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    doc.add_object(Object::Dictionary(font))
}

/// Add an `ExtGState` with the given fill and stroke opacity.
pub fn add_opacity_state(doc: &mut Document, opacity: f32) -> ObjectId {
    let mut state = Dictionary::new();
    state.set("Type", Object::Name(b"ExtGState".to_vec()));
    state.set("ca", Object::Real(opacity));
    state.set("CA", Object::Real(opacity));
    doc.add_object(Object::Dictionary(state))
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_page_count() {
        let pdf = create_test_pdf(4, "Count");
        assert_eq!(page_count(&pdf).unwrap(), 4);
    }

    #[test]
    fn test_page_count_rejects_garbage() {
        let result = page_count(b"definitely not a pdf");
        assert!(matches!(result, Err(DocumentError::ParseError(_))));
    }

    #[test]
    fn test_inherited_media_box() {
        let doc = build_test_document(1, "Box");
        let page_id = page_ids(&doc)[0];
        assert_eq!(media_box(&doc, page_id), [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn test_materialize_copies_inherited_attributes() {
        let mut doc = build_test_document(1, "Inherit");
        let page_id = page_ids(&doc)[0];
        materialize_inherited(&mut doc, page_id).unwrap();

        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
        assert!(!page.has(b"Rotate"));
    }

    #[test]
    fn test_rotation_defaults_to_zero() {
        let doc = build_test_document(1, "Rot");
        assert_eq!(rotation(&doc, page_ids(&doc)[0]), 0);
    }

    #[test]
    fn test_add_resource_does_not_touch_shared_dictionary() {
        let mut doc = build_test_document(2, "Shared");
        let ids = page_ids(&doc);
        let gs = add_opacity_state(&mut doc, 0.5);
        add_resource(&mut doc, ids[0], "ExtGState", "GS1", gs).unwrap();

        let first = doc.get_dictionary(ids[0]).unwrap();
        let resources = first.get(b"Resources").unwrap().as_dict().unwrap();
        assert!(resources.has(b"ExtGState"));
        // The inherited font survives the copy
        assert!(resources.has(b"Font"));

        let second = inherited_attribute(&doc, ids[1], b"Resources").unwrap();
        assert!(!second.as_dict().unwrap().has(b"ExtGState"));
    }

    #[test]
    fn test_append_overlay_wraps_existing_content() {
        let mut doc = build_test_document(1, "Overlay");
        let page_id = page_ids(&doc)[0];
        append_overlay(&mut doc, page_id, b"0 0 m 10 10 l S".to_vec()).unwrap();

        let text = page_text(&doc, 1);
        let open = text.find('q').unwrap();
        let original = text.find("Overlay-Page-1").unwrap();
        let overlay = text.find("10 10 l").unwrap();
        assert!(open < original && original < overlay);
    }
}
