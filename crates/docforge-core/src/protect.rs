//! Password protection
//!
//! lopdf can read encrypted files but cannot write them, so encryption is
//! requested through the [`PdfEncryptor`] seam. Whether encryption actually
//! happened is reported back in [`ProtectOutcome`] instead of being assumed.

use crate::error::{DocumentError, Result};
use crate::fonts::StandardFont;
use crate::pages;
use crate::watermark::{stamp_pages, Placement, StampStyle};
use chrono::Utc;
use lopdf::{Dictionary, Document, Object, StringFormat};
use tracing::{info, warn};

/// Access permissions granted to holders of the user password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub print_high_resolution: bool,
    pub modify: bool,
    pub copy: bool,
    pub annotate: bool,
    pub fill_forms: bool,
    pub content_accessibility: bool,
    pub assemble: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            print_high_resolution: true,
            modify: false,
            copy: false,
            annotate: false,
            fill_forms: false,
            content_accessibility: true,
            assemble: false,
        }
    }
}

impl Permissions {
    /// The `/P` value of a standard security handler (revision 3+).
    ///
    /// Bits 1-2 must be clear, bits 7-8 and 13-32 must be set.
    pub fn to_p_value(self) -> i32 {
        let mut p: u32 = 0xFFFF_F0C0;
        let mut grant = |allowed: bool, bit: u32| {
            if allowed {
                p |= 1 << (bit - 1);
            }
        };
        grant(self.print_high_resolution, 3);
        grant(self.modify, 4);
        grant(self.copy, 5);
        grant(self.annotate, 6);
        grant(self.fill_forms, 9);
        grant(self.content_accessibility, 10);
        grant(self.assemble, 11);
        grant(self.print_high_resolution, 12);
        p as i32
    }
}

/// Everything an encryptor needs to secure a document.
#[derive(Debug, Clone)]
pub struct EncryptionRequest {
    pub user_password: String,
    pub owner_password: String,
    pub permissions: Permissions,
}

impl EncryptionRequest {
    /// User password as given, owner password derived from it.
    pub fn for_password(password: &str) -> Self {
        Self {
            user_password: password.to_string(),
            owner_password: format!("{}_owner", password),
            permissions: Permissions::default(),
        }
    }
}

/// Applies encryption to a document in place, or reports why it cannot.
pub trait PdfEncryptor: Send + Sync {
    fn encrypt(&self, doc: &mut Document, request: &EncryptionRequest) -> Result<()>;
}

/// Encryptor for builds without an encryption backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedEncryption;

impl PdfEncryptor for UnsupportedEncryption {
    fn encrypt(&self, _doc: &mut Document, _request: &EncryptionRequest) -> Result<()> {
        Err(DocumentError::EncryptionUnsupported)
    }
}

/// Result of a protect request.
#[derive(Debug)]
pub enum ProtectOutcome {
    /// The encryptor accepted the document
    Protected(Vec<u8>),
    /// Encryption was rejected; the document carries protection markings only
    ProtectedWithoutEncryption { bytes: Vec<u8>, reason: String },
}

impl ProtectOutcome {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, ProtectOutcome::Protected(_))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            ProtectOutcome::Protected(bytes) => bytes,
            ProtectOutcome::ProtectedWithoutEncryption { bytes, .. } => bytes,
        }
    }
}

/// Mark a document as protected and attempt to encrypt it.
///
/// The document gains protection metadata and a small "PROTECTED" label on
/// every page either way. If the encryptor rejects the request the marked
/// but unencrypted document is returned as `ProtectedWithoutEncryption`;
/// any other failure is an error.
pub fn protect_document(
    bytes: &[u8],
    password: &str,
    encryptor: &dyn PdfEncryptor,
) -> Result<ProtectOutcome> {
    let mut doc = pages::load(bytes)?;

    set_protection_info(&mut doc, password);
    stamp_pages(
        &mut doc,
        "PROTECTED",
        &StampStyle {
            font: StandardFont::Helvetica,
            font_size: 10.0,
            opacity: 0.3,
            gray: 0.7,
            placement: Placement::TopRight {
                inset_x: 100.0,
                inset_y: 20.0,
            },
        },
    )?;

    let request = EncryptionRequest::for_password(password);
    // Encrypt a copy so a half-applied attempt never leaks into the fallback
    let mut encrypted = doc.clone();
    match encryptor.encrypt(&mut encrypted, &request) {
        Ok(()) => {
            info!("PDF protected with encryption");
            Ok(ProtectOutcome::Protected(pages::save(&mut encrypted)?))
        }
        Err(err) => {
            warn!(error = %err, "encryption unavailable, saving with protection markings only");
            Ok(ProtectOutcome::ProtectedWithoutEncryption {
                bytes: pages::save(&mut doc)?,
                reason: err.to_string(),
            })
        }
    }
}

fn set_protection_info(doc: &mut Document, password: &str) {
    let now = pdf_date(Utc::now());
    let text = |s: &str| Object::String(s.as_bytes().to_vec(), StringFormat::Literal);

    let mut info = Dictionary::new();
    info.set("Title", text("Protected Document"));
    info.set(
        "Subject",
        text(&format!("Password Protected - {} chars", password.chars().count())),
    );
    info.set("Creator", text("PDF Protection Tool"));
    info.set("Producer", text("PDF Management System"));
    info.set("CreationDate", text(&now));
    info.set("ModDate", text(&now));

    let info_id = doc.add_object(Object::Dictionary(info));
    doc.trailer.set("Info", Object::Reference(info_id));
}

fn pdf_date(at: chrono::DateTime<Utc>) -> String {
    at.format("D:%Y%m%d%H%M%S+00'00'").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::fixtures::{create_test_pdf, page_text};

    /// Records the request and tags the trailer instead of encrypting.
    struct MarkingEncryptor;

    impl PdfEncryptor for MarkingEncryptor {
        fn encrypt(&self, doc: &mut Document, request: &EncryptionRequest) -> Result<()> {
            doc.trailer.set(
                "DFTestOwner",
                Object::String(request.owner_password.clone().into_bytes(), StringFormat::Literal),
            );
            Ok(())
        }
    }

    fn info_string(doc: &Document, key: &[u8]) -> String {
        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let value = doc.get_dictionary(info_id).unwrap().get(key).unwrap();
        match value {
            Object::String(bytes, _) => String::from_utf8_lossy(bytes).into_owned(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_encryption_falls_back() {
        let pdf = create_test_pdf(2, "Fallback");
        let outcome = protect_document(&pdf, "s3cret", &UnsupportedEncryption).unwrap();

        assert!(!outcome.is_encrypted());
        let bytes = outcome.into_bytes();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        assert!(!doc.is_encrypted());
    }

    #[test]
    fn test_protection_metadata() {
        let pdf = create_test_pdf(1, "Meta");
        let bytes = protect_document(&pdf, "hunter2", &UnsupportedEncryption)
            .unwrap()
            .into_bytes();
        let doc = Document::load_mem(&bytes).unwrap();

        assert_eq!(info_string(&doc, b"Title"), "Protected Document");
        assert_eq!(info_string(&doc, b"Subject"), "Password Protected - 7 chars");
        assert!(info_string(&doc, b"CreationDate").starts_with("D:"));
    }

    #[test]
    fn test_protection_label_on_every_page() {
        let pdf = create_test_pdf(2, "Label");
        let bytes = protect_document(&pdf, "pw", &UnsupportedEncryption)
            .unwrap()
            .into_bytes();
        let mut doc = Document::load_mem(&bytes).unwrap();
        doc.decompress();

        for page in 1..=2 {
            assert!(page_text(&doc, page).contains("/DFStamp"));
        }
    }

    #[test]
    fn test_accepting_encryptor_reports_protected() {
        let pdf = create_test_pdf(1, "Accepted");
        let outcome = protect_document(&pdf, "pw", &MarkingEncryptor).unwrap();
        assert!(outcome.is_encrypted());

        let doc = Document::load_mem(&outcome.into_bytes()).unwrap();
        assert!(doc.trailer.has(b"DFTestOwner"));
    }

    #[test]
    fn test_corrupt_input_is_an_error() {
        let result = protect_document(b"nope", "pw", &UnsupportedEncryption);
        assert!(matches!(result, Err(DocumentError::ParseError(_))));
    }

    #[test]
    fn test_default_permission_bits() {
        let p = Permissions::default().to_p_value() as u32;
        assert_eq!(p & 0b11, 0);
        assert_ne!(p & (1 << 2), 0, "print allowed");
        assert_eq!(p & (1 << 3), 0, "modify denied");
        assert_eq!(p & (1 << 4), 0, "copy denied");
        assert_ne!(p & (1 << 9), 0, "accessibility allowed");
        assert_ne!(p & (1 << 11), 0, "high quality print allowed");
        assert_eq!(p & 0xFFFF_F000 & !(1 << 11), 0xFFFF_F000 & !(1 << 11));
    }
}
