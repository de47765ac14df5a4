//! API handlers for the docforge server
//!
//! Each handler validates its form up front, runs the document operation on
//! the blocking pool, stages the result in the scratch directory and
//! streams it back.

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    response::Response,
    Json,
};
use serde::Serialize;
use tracing::{debug, info};

use docforge_convert::ConvertError;
use docforge_core::{DocumentError, ProtectOutcome, UnlockOutcome};

use crate::error::ServerError;
use crate::upload::UploadForm;
use crate::AppState;

const PDF: &str = "application/pdf";

const MERGE_FAILED: &str = "An error occurred while merging the PDFs.";
const SPLIT_FAILED: &str = "An error occurred while splitting the PDF.";
const ROTATE_FAILED: &str = "An error occurred while rotating the PDF.";
const PROTECT_FAILED: &str = "An error occurred while protecting the PDF.";
const UNLOCK_FAILED: &str = "An error occurred while unlocking the PDF.";
const WATERMARK_FAILED: &str = "An error occurred while adding the watermark.";
const COMPRESS_FAILED: &str = "An error occurred while compressing the PDF.";
const CONVERT_FAILED: &str = "An error occurred during office conversion.";

const UNLOCK_REJECTED: &str =
    "Failed to unlock PDF. Incorrect password or file is not encrypted.";

/// Handler: GET /
pub async fn handle_root() -> &'static str {
    "Backend server is running!"
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "docforge-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: POST /api/merge
pub async fn handle_merge(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let inputs: Vec<_> = form.files("files").into_iter().map(|f| f.bytes.clone()).collect();
    if inputs.is_empty() {
        return Err(ServerError::invalid("No files uploaded."));
    }

    info!(files = inputs.len(), "merging PDFs");
    let merged = blocking(MERGE_FAILED, move || docforge_core::merge_documents(inputs.as_slice()))
        .await?
        .map_err(|e| ServerError::internal(MERGE_FAILED, e))?;

    deliver(&state, "merged", "pdf", PDF, merged, HeaderMap::new(), MERGE_FAILED).await
}

/// Handler: POST /api/split
pub async fn handle_split(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let file = form.require_file()?.bytes.clone();
    let ranges = form
        .text("ranges")
        .ok_or_else(|| ServerError::invalid("No page ranges provided."))?
        .to_string();

    debug!(%ranges, "splitting PDF");
    let split = blocking(SPLIT_FAILED, move || {
        docforge_core::split_document(&file, &ranges)
    })
    .await?
    .map_err(|e: DocumentError| {
        if e.is_client_error() {
            ServerError::invalid("Invalid page ranges provided.")
        } else {
            ServerError::internal(SPLIT_FAILED, e)
        }
    })?;

    deliver(&state, "split", "pdf", PDF, split, HeaderMap::new(), SPLIT_FAILED).await
}

/// Handler: POST /api/rotate
pub async fn handle_rotate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let file = form.require_file()?.bytes.clone();
    let angle = form
        .text("angle")
        .ok_or_else(|| ServerError::invalid("No rotation angle provided."))?;
    let angle: i64 = angle
        .trim()
        .parse()
        .map_err(|_| ServerError::invalid("Invalid rotation angle."))?;

    debug!(angle, "rotating PDF");
    let rotated = blocking(ROTATE_FAILED, move || {
        docforge_core::rotate_document(&file, angle)
    })
    .await?
    .map_err(|e| ServerError::internal(ROTATE_FAILED, e))?;

    deliver(&state, "rotated", "pdf", PDF, rotated, HeaderMap::new(), ROTATE_FAILED).await
}

/// Handler: POST /api/protect
///
/// Responds with the marked document even when no encryption backend is
/// available; `X-Encryption-Applied` says which case the client got.
pub async fn handle_protect(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let file = form.require_file()?.bytes.clone();
    let password = form
        .text("password")
        .ok_or_else(|| ServerError::invalid("No password provided."))?
        .to_string();

    let encryptor = state.encryptor.clone();
    let outcome = blocking(PROTECT_FAILED, move || {
        docforge_core::protect_document(&file, &password, encryptor.as_ref())
    })
    .await?
    .map_err(|e| ServerError::internal(PROTECT_FAILED, e))?;

    if let ProtectOutcome::ProtectedWithoutEncryption { reason, .. } = &outcome {
        info!(%reason, "delivering protected PDF without encryption");
    }
    let headers = outcome_headers(&[(
        "x-encryption-applied",
        if outcome.is_encrypted() { "true" } else { "false" },
    )]);

    deliver(&state, "protected", "pdf", PDF, outcome.into_bytes(), headers, PROTECT_FAILED).await
}

/// Handler: POST /api/unlock
pub async fn handle_unlock(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let file = form.require_file()?.bytes.clone();
    let password = form.text("password").map(str::to_string);

    let outcome = blocking(UNLOCK_FAILED, move || {
        docforge_core::unlock_document(&file, password.as_deref())
    })
    .await?
    .map_err(|e| match e {
        DocumentError::Authentication(reason) => {
            info!(%reason, "unlock rejected");
            ServerError::Unauthorized(UNLOCK_REJECTED.to_string())
        }
        other => ServerError::internal(UNLOCK_FAILED, other),
    })?;

    let status = match &outcome {
        UnlockOutcome::Decrypted(_) => "decrypted",
        UnlockOutcome::NotEncrypted(_) => "not-encrypted",
    };
    let headers = outcome_headers(&[("x-unlock-status", status)]);

    deliver(&state, "unlocked", "pdf", PDF, outcome.into_bytes(), headers, UNLOCK_FAILED).await
}

/// Handler: POST /api/watermark
pub async fn handle_watermark(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let file = form.require_file()?.bytes.clone();
    let text = form
        .text("text")
        .ok_or_else(|| ServerError::invalid("No watermark text provided."))?
        .to_string();

    let marked = blocking(WATERMARK_FAILED, move || {
        docforge_core::watermark_document(&file, &text)
    })
    .await?
    .map_err(|e| ServerError::internal(WATERMARK_FAILED, e))?;

    deliver(&state, "watermarked", "pdf", PDF, marked, HeaderMap::new(), WATERMARK_FAILED).await
}

/// Handler: POST /api/compress
pub async fn handle_compress(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let file = form.require_file()?.bytes.clone();

    let report = blocking(COMPRESS_FAILED, move || {
        docforge_core::compress_document(&file)
    })
    .await?
    .map_err(|e| ServerError::internal(COMPRESS_FAILED, e))?;

    info!(
        original = report.original_size,
        compressed = report.output_size(),
        reduced = report.reduced(),
        "compressed PDF"
    );
    let original = report.original_size.to_string();
    let compressed = report.output_size().to_string();
    let headers = outcome_headers(&[
        ("x-original-size", original.as_str()),
        ("x-compressed-size", compressed.as_str()),
    ]);

    deliver(&state, "compressed", "pdf", PDF, report.bytes, headers, COMPRESS_FAILED).await
}

/// Handler: POST /api/convert-office
pub async fn handle_convert(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = UploadForm::read(multipart).await?;
    let upload = form.require_file()?;
    let output_format = form
        .text("outputFormat")
        .ok_or_else(|| ServerError::invalid("No output format specified."))?
        .to_string();

    let bytes = upload.bytes.clone();
    let file_name = upload.file_name.clone();
    info!(file = %file_name, format = %output_format, "converting document");

    let converted = blocking(CONVERT_FAILED, move || {
        docforge_convert::convert(&bytes, &file_name, &output_format)
    })
    .await?
    .map_err(|e: ConvertError| {
        if e.is_client_error() {
            ServerError::invalid(e.to_string())
        } else {
            ServerError::internal(CONVERT_FAILED, e)
        }
    })?;

    let extension = converted.extension();
    let content_type = converted.content_type();
    deliver(
        &state,
        "converted",
        extension,
        content_type,
        converted.bytes,
        HeaderMap::new(),
        CONVERT_FAILED,
    )
    .await
}

/// Run CPU-bound document work off the async runtime.
async fn blocking<T, F>(failure: &'static str, work: F) -> Result<T, ServerError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::internal(failure, e))
}

fn outcome_headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for &(name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
    headers
}

async fn deliver(
    state: &AppState,
    prefix: &str,
    extension: &str,
    content_type: &'static str,
    bytes: Vec<u8>,
    headers: HeaderMap,
    failure: &'static str,
) -> Result<Response, ServerError> {
    let file = state
        .scratch
        .persist(prefix, extension, &bytes)
        .await
        .map_err(|e| ServerError::internal(failure, e))?;
    debug!(
        file = file.file_name(),
        path = %file.path().display(),
        size = bytes.len(),
        "delivering result"
    );

    file.into_response(content_type, headers)
        .await
        .map_err(|e| ServerError::internal(failure, e))
}
