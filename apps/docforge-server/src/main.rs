//! docforge server
//!
//! HTTP front end for the PDF page operations in `docforge-core` and the
//! office conversions in `docforge-convert`. Every endpoint takes a
//! multipart upload and answers with the resulting file as an attachment:
//!
//! - `POST /api/merge`, `/api/split`, `/api/rotate`
//! - `POST /api/watermark`, `/api/protect`, `/api/unlock`, `/api/compress`
//! - `POST /api/convert-office`
//!
//! Results are staged in a scratch directory and streamed back; the staged
//! file is removed once the response body is finished or dropped.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docforge_core::{PdfEncryptor, UnsupportedEncryption};

mod api;
mod error;
mod scratch;
mod upload;

use api::{
    handle_compress, handle_convert, handle_health, handle_merge, handle_protect, handle_root,
    handle_rotate, handle_split, handle_unlock, handle_watermark,
};
use scratch::ScratchDir;

/// Command-line arguments for the docforge server
#[derive(Parser, Debug)]
#[command(name = "docforge-server")]
#[command(about = "HTTP service for PDF page operations and office conversion")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "DOCFORGE_PORT", default_value = "5000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "DOCFORGE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Directory results are staged in before streaming
    #[arg(long, env = "DOCFORGE_SCRATCH_DIR", default_value = "uploads")]
    scratch_dir: PathBuf,

    /// Largest accepted request body, in MiB
    #[arg(long, env = "DOCFORGE_MAX_UPLOAD_MB", default_value = "50")]
    max_upload_mb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scratch: ScratchDir,
    pub encryptor: Arc<dyn PdfEncryptor>,
}

impl AppState {
    pub fn new(scratch: ScratchDir) -> Self {
        Self {
            scratch,
            encryptor: Arc::new(UnsupportedEncryption),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/merge", post(handle_merge))
        .route("/api/split", post(handle_split))
        .route("/api/rotate", post(handle_rotate))
        .route("/api/protect", post(handle_protect))
        .route("/api/unlock", post(handle_unlock))
        .route("/api/watermark", post(handle_watermark))
        .route("/api/compress", post(handle_compress))
        .route("/api/convert-office", post(handle_convert))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let scratch = ScratchDir::init(&args.scratch_dir)?;
    let state = AppState::new(scratch);
    let app = router(state, args.max_upload_mb * 1024 * 1024);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Upload limit: {} MiB", args.max_upload_mb);

    axum::serve(listener, app).await?;

    Ok(())
}
