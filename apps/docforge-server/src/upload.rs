//! Multipart upload parsing
//!
//! Forms are read fully into memory; the body limit layer bounds their size.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;
use tracing::debug;

use crate::error::ServerError;

/// A file part of an upload form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub bytes: Bytes,
}

/// Files and text fields of one multipart request.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    form.files.push(UploadedFile {
                        field: name,
                        file_name,
                        bytes,
                    });
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        debug!(
            files = form.files.len(),
            fields = form.fields.len(),
            "read upload form"
        );
        Ok(form)
    }

    /// Every file uploaded under `field`, in upload order.
    pub fn files(&self, field: &str) -> Vec<&UploadedFile> {
        self.files.iter().filter(|f| f.field == field).collect()
    }

    /// The first file uploaded under `field`.
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }

    /// A text field, treating an empty value as absent.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// The single `file` upload, or the standard 400.
    pub fn require_file(&self) -> Result<&UploadedFile, ServerError> {
        self.file("file")
            .ok_or_else(|| ServerError::invalid("No file uploaded."))
    }
}
