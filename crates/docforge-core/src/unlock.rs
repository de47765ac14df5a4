//! Removing password protection

use crate::error::{DocumentError, Result};
use crate::pages;
use lopdf::encryption::DecryptionError;
use lopdf::Document;
use tracing::debug;

/// How far from the end of the file the trailer is looked for.
const TRAILER_WINDOW: usize = 4096;

/// Result of an unlock request.
#[derive(Debug)]
pub enum UnlockOutcome {
    /// The document was encrypted and the password opened it
    Decrypted(Vec<u8>),
    /// The document was never encrypted; it is re-saved unchanged
    NotEncrypted(Vec<u8>),
}

impl UnlockOutcome {
    pub fn was_encrypted(&self) -> bool {
        matches!(self, UnlockOutcome::Decrypted(_))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            UnlockOutcome::Decrypted(bytes) | UnlockOutcome::NotEncrypted(bytes) => bytes,
        }
    }
}

/// Open a possibly encrypted PDF and save it without encryption.
///
/// Without a password the empty user password is tried, which opens
/// documents that restrict permissions but not viewing. A password that
/// does not match is an `Authentication` error. An encryption scheme lopdf
/// cannot handle is an `OperationError`, and so is a malformed security
/// handler. Failing to parse an unencrypted file is a `ParseError`.
pub fn unlock_document(bytes: &[u8], password: Option<&str>) -> Result<UnlockOutcome> {
    let password = password.unwrap_or("");

    let mut doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) if declares_encryption(bytes) => {
            return Err(DocumentError::Authentication(format!(
                "encrypted document could not be opened: {}",
                e
            )));
        }
        Err(e) => return Err(DocumentError::ParseError(e.to_string())),
    };

    if !doc.is_encrypted() {
        debug!("unlock requested for an unencrypted document");
        return Ok(UnlockOutcome::NotEncrypted(pages::save(&mut doc)?));
    }

    doc.decrypt(password).map_err(|e| match e {
        lopdf::Error::Decryption(DecryptionError::IncorrectPassword) => {
            DocumentError::Authentication(e.to_string())
        }
        other => DocumentError::OperationError(format!("cannot decrypt document: {}", other)),
    })?;

    // Drop the security handler so the saved file is read as plain text
    doc.trailer.remove(b"Encrypt");
    doc.prune_objects();

    Ok(UnlockOutcome::Decrypted(pages::save(&mut doc)?))
}

/// Whether the file's trailer area names a security handler.
fn declares_encryption(bytes: &[u8]) -> bool {
    let tail = &bytes[bytes.len().saturating_sub(TRAILER_WINDOW)..];
    tail.windows(b"/Encrypt".len()).any(|w| w == b"/Encrypt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::fixtures::{build_test_document, create_test_pdf, page_text};
    use lopdf::encryption::{decrypt_object, get_encryption_key};
    use lopdf::{Dictionary, Object, ObjectId, StringFormat};

    /// Padding string of the standard security handler.
    const PASSWORD_PAD: [u8; 32] = [
        0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
        0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
        0x69, 0x7A,
    ];

    fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut state: [u8; 256] = std::array::from_fn(|i| i as u8);
        let mut j = 0u8;
        for i in 0..256 {
            j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
            state.swap(i, j as usize);
        }

        let (mut i, mut j) = (0u8, 0u8);
        data.iter()
            .map(|byte| {
                i = i.wrapping_add(1);
                j = j.wrapping_add(state[i as usize]);
                state.swap(i as usize, j as usize);
                let k = state[state[i as usize].wrapping_add(state[j as usize]) as usize];
                byte ^ k
            })
            .collect()
    }

    /// Attach a standard security handler with the given parameters.
    fn attach_security_handler(
        doc: &mut Document,
        v: i64,
        r: i64,
        length: i64,
        u: Vec<u8>,
    ) -> ObjectId {
        let mut encrypt = Dictionary::new();
        encrypt.set("Filter", Object::Name(b"Standard".to_vec()));
        encrypt.set("V", Object::Integer(v));
        encrypt.set("R", Object::Integer(r));
        encrypt.set("Length", Object::Integer(length));
        encrypt.set("P", Object::Integer(-44));
        encrypt.set("O", Object::String(vec![0x11; 32], StringFormat::Hexadecimal));
        encrypt.set("U", Object::String(u, StringFormat::Hexadecimal));
        let encrypt_id = doc.add_object(Object::Dictionary(encrypt));

        doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
        doc.trailer.set(
            "ID",
            Object::Array(vec![
                Object::String(vec![0x33; 16], StringFormat::Hexadecimal),
                Object::String(vec![0x33; 16], StringFormat::Hexadecimal),
            ]),
        );
        encrypt_id
    }

    fn to_bytes(doc: &mut Document) -> Vec<u8> {
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// A document whose trailer declares RC4 encryption with verifier
    /// values no password can satisfy.
    fn create_locked_pdf() -> Vec<u8> {
        let mut doc = build_test_document(1, "Locked");
        attach_security_handler(&mut doc, 1, 2, 40, vec![0x22; 32]);
        to_bytes(&mut doc)
    }

    /// A 40-bit RC4 (revision 2) document that opens with `user_password`.
    fn create_encrypted_pdf(pages: u32, prefix: &str, user_password: &str) -> Vec<u8> {
        let mut doc = build_test_document(pages, prefix);
        let encrypt_id = attach_security_handler(&mut doc, 1, 2, 40, vec![0; 32]);

        let key = get_encryption_key(&doc, user_password, false).unwrap();
        if let Ok(Object::Dictionary(encrypt)) = doc.get_object_mut(encrypt_id) {
            encrypt.set("U", Object::String(rc4(&key, &PASSWORD_PAD), StringFormat::Hexadecimal));
        }

        // RC4 is symmetric, so running the decryptor over plain objects encrypts them
        let ids: Vec<ObjectId> = doc
            .objects
            .keys()
            .copied()
            .filter(|id| *id != encrypt_id)
            .collect();
        for id in ids {
            let Ok(sealed) = decrypt_object(&key, id, &doc.objects[&id]) else {
                continue;
            };
            match doc.objects.get_mut(&id) {
                Some(Object::String(content, _)) => *content = sealed,
                Some(Object::Stream(stream)) => stream.set_content(sealed),
                _ => {}
            }
        }

        to_bytes(&mut doc)
    }

    #[test]
    fn test_unencrypted_document_passes_through() {
        let pdf = create_test_pdf(3, "Plain");
        let outcome = unlock_document(&pdf, None).unwrap();
        assert!(!outcome.was_encrypted());

        let original = Document::load_mem(&pdf).unwrap();
        let unlocked = Document::load_mem(&outcome.into_bytes()).unwrap();
        assert_eq!(unlocked.get_pages().len(), 3);
        for page in 1..=3 {
            assert_eq!(page_text(&original, page), page_text(&unlocked, page));
        }
    }

    #[test]
    fn test_password_on_unencrypted_document_is_ignored() {
        let pdf = create_test_pdf(1, "Ignored");
        let outcome = unlock_document(&pdf, Some("whatever")).unwrap();
        assert!(matches!(outcome, UnlockOutcome::NotEncrypted(_)));
    }

    #[test]
    fn test_wrong_password_is_authentication_error() {
        let pdf = create_locked_pdf();
        let result = unlock_document(&pdf, Some("wrong"));
        assert!(matches!(result, Err(DocumentError::Authentication(_))));
    }

    #[test]
    fn test_missing_password_on_encrypted_document_fails() {
        let pdf = create_locked_pdf();
        let result = unlock_document(&pdf, None);
        assert!(matches!(result, Err(DocumentError::Authentication(_))));
    }

    #[test]
    fn test_correct_password_decrypts() {
        let plain = build_test_document(2, "Secret");
        let pdf = create_encrypted_pdf(2, "Secret", "opensesame");
        assert!(Document::load_mem(&pdf).unwrap().is_encrypted());

        let outcome = unlock_document(&pdf, Some("opensesame")).unwrap();
        assert!(outcome.was_encrypted());

        let unlocked = Document::load_mem(&outcome.into_bytes()).unwrap();
        assert!(!unlocked.is_encrypted());
        assert!(unlocked.trailer.get(b"Encrypt").is_err());
        assert_eq!(unlocked.get_pages().len(), 2);
        for page in 1..=2 {
            assert_eq!(page_text(&plain, page), page_text(&unlocked, page));
        }
    }

    #[test]
    fn test_empty_user_password_opens_without_password() {
        let pdf = create_encrypted_pdf(1, "Open", "");
        let outcome = unlock_document(&pdf, None).unwrap();
        assert!(matches!(outcome, UnlockOutcome::Decrypted(_)));
    }

    #[test]
    fn test_wrong_password_on_real_encryption_is_rejected() {
        let pdf = create_encrypted_pdf(1, "Secret", "opensesame");
        let result = unlock_document(&pdf, Some("guess"));
        assert!(matches!(result, Err(DocumentError::Authentication(_))));
    }

    #[test]
    fn test_unsupported_scheme_is_not_an_authentication_error() {
        let mut doc = build_test_document(1, "Aes");
        attach_security_handler(&mut doc, 4, 4, 128, vec![0x22; 32]);
        let pdf = to_bytes(&mut doc);

        let result = unlock_document(&pdf, Some("correct horse"));
        assert!(matches!(result, Err(DocumentError::OperationError(_))));
    }

    #[test]
    fn test_encrypt_marker_outside_trailer_is_parse_error() {
        let mut bytes = b"%PDF-1.7\n1 0 obj << /Encrypt 2 0 R >> stream\n".to_vec();
        bytes.extend(std::iter::repeat(b'x').take(TRAILER_WINDOW * 2));
        let result = unlock_document(&bytes, Some("pw"));
        assert!(matches!(result, Err(DocumentError::ParseError(_))));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let result = unlock_document(b"%PDF-1.7 garbage", None);
        assert!(matches!(result, Err(DocumentError::ParseError(_))));
    }
}
