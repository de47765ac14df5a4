//! Relative page rotation

use crate::error::Result;
use crate::pages;
use lopdf::Object;

/// Combine a current rotation with a relative delta, normalized to `0..360`.
///
/// Any integer delta is accepted; negative results wrap around.
pub fn normalize_rotation(current: i64, delta: i64) -> i64 {
    (current + delta).rem_euclid(360)
}

/// Rotate every page by `delta` degrees relative to its current rotation.
pub fn rotate_document(bytes: &[u8], delta: i64) -> Result<Vec<u8>> {
    let mut doc = pages::load(bytes)?;

    for page_id in pages::page_ids(&doc) {
        let current = pages::rotation(&doc, page_id);
        let rotated = normalize_rotation(current, delta);
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            page.set("Rotate", Object::Integer(rotated));
        }
    }

    pages::save(&mut doc)
}
