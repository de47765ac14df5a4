//! Scratch files for streamed responses
//!
//! Results are written to a uniquely named file in the scratch directory and
//! streamed back from disk. The file is removed when the response body is
//! dropped, whether the client read it to the end or went away early.

use std::io;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures::StreamExt;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

/// Suffixes tried when two results land on the same millisecond.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// The directory results are staged in.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Create the directory if it does not exist yet.
    pub fn init(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        info!("Scratch directory ready at {}", root.display());
        Ok(Self { root })
    }

    /// Write `bytes` to `<prefix>-<unix millis>.<extension>`.
    ///
    /// Names are claimed with `create_new`, so concurrent requests never
    /// share a file.
    pub async fn persist(
        &self,
        prefix: &str,
        extension: &str,
        bytes: &[u8],
    ) -> io::Result<ScratchFile> {
        let stamp = Utc::now().timestamp_millis();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                format!("{}-{}.{}", prefix, stamp, extension)
            } else {
                format!("{}-{}-{}.{}", prefix, stamp, attempt, extension)
            };
            let path = self.root.join(&file_name);

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };

            // Guard first: a failed write still removes the file
            let scratch = ScratchFile { path, file_name };
            file.write_all(bytes).await?;
            file.flush().await?;
            debug!(file = %scratch.file_name, size = bytes.len(), "staged result");
            return Ok(scratch);
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free scratch name for prefix {}", prefix),
        ))
    }
}

/// A staged result file, deleted on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    file_name: String,
}

impl ScratchFile {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream the file as an attachment named after it.
    pub async fn into_response(
        self,
        content_type: &'static str,
        extra_headers: HeaderMap,
    ) -> io::Result<Response> {
        let file = tokio::fs::File::open(&self.path).await?;
        let disposition = HeaderValue::from_str(&format!(
            "attachment; filename=\"{}\"",
            self.file_name
        ))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let guard = self;
        let stream = ReaderStream::new(file).map(move |chunk| {
            // Holds the scratch file until the body is dropped
            let _guard = &guard;
            chunk
        });

        let mut response = Body::from_stream(stream).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers.insert(header::CONTENT_DISPOSITION, disposition);
        headers.extend(extra_headers);
        Ok(response)
    }
}

impl Drop for ScratchFile {
    // Unlink only touches directory metadata, so it runs inline; the file is
    // gone by the time the response body has been dropped.
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(file = %self.file_name, "removed scratch file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(file = %self.file_name, error = %e, "failed to remove scratch file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "docforge-scratch-{}-{}-{}",
            name,
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    #[test]
    fn test_init_is_idempotent() {
        let root = temp_root("init");
        ScratchDir::init(&root).unwrap();
        ScratchDir::init(&root).unwrap();
        assert!(root.is_dir());
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_persist_names_and_cleanup() {
        let root = temp_root("persist");
        let scratch = ScratchDir::init(&root).unwrap();

        let first = scratch.persist("merged", "pdf", b"one").await.unwrap();
        let second = scratch.persist("merged", "pdf", b"two").await.unwrap();

        assert!(first.file_name().starts_with("merged-"));
        assert!(first.file_name().ends_with(".pdf"));
        assert_ne!(first.file_name(), second.file_name());
        assert_eq!(std::fs::read(first.path()).unwrap(), b"one");

        let path = first.path().to_path_buf();
        drop(first);
        assert!(!path.exists());

        drop(second);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_response_streams_then_removes_file() {
        let root = temp_root("stream");
        let scratch = ScratchDir::init(&root).unwrap();
        let file = scratch.persist("split", "pdf", b"%PDF-body").await.unwrap();
        let path = file.path().to_path_buf();
        let name = file.file_name().to_string();

        let mut extra = HeaderMap::new();
        extra.insert("x-test", HeaderValue::from_static("yes"));
        let response = file.into_response("application/pdf", extra).await.unwrap();

        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            format!("attachment; filename=\"{}\"", name).as_str()
        );
        assert_eq!(response.headers()["x-test"], "yes");
        assert!(path.exists());

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"%PDF-body");
        assert!(!path.exists());

        std::fs::remove_dir_all(&root).unwrap();
    }
}
