//! PDF page operations
//!
//! Single-shot transformations over PDF bytes using lopdf: each operation
//! loads a document, mutates it, and serializes a new one. Nothing is
//! shared between calls.
//!
//! - `parse_page_ranges`: "1-3, 5" → sorted zero-based indices
//! - `merge_documents` / `split_document` / `rotate_document`
//! - `watermark_document`: centred translucent text on every page
//! - `protect_document` / `unlock_document`: best-effort password handling
//! - `compress_document`: re-serialization with size-reduction passes

pub mod compress;
pub mod error;
pub mod fonts;
pub mod merge;
pub mod pages;
pub mod protect;
pub mod ranges;
pub mod rotate;
pub mod split;
pub mod unlock;
pub mod watermark;

pub use compress::{compress_document, CompressionReport};
pub use error::{DocumentError, Result};
pub use fonts::StandardFont;
pub use merge::merge_documents;
pub use pages::page_count;
pub use protect::{
    protect_document, EncryptionRequest, PdfEncryptor, Permissions, ProtectOutcome,
    UnsupportedEncryption,
};
pub use ranges::parse_page_ranges;
pub use rotate::{normalize_rotation, rotate_document};
pub use split::{extract_pages, split_document};
pub use unlock::{unlock_document, UnlockOutcome};
pub use watermark::{watermark_document, StampStyle};
