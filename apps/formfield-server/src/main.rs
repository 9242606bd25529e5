//! Form Field Server
//!
//! Serves the browser field designer and the PDF endpoints it calls:
//!
//! - `POST /fill-pdf`: write values into existing text fields
//! - `POST /add-fillable-fields`: add new text fields at drawn rectangles
//! - `POST /list-fields`: describe the fields of an uploaded PDF
//!
//! Everything else falls through to the static asset directory.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderName,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
#[cfg(test)]
mod tests;

use api::{
    handle_add_fillable_fields, handle_fill_pdf, handle_health, handle_list_fields,
    FIELD_REPORT_HEADER,
};

/// Command-line arguments for the form field server
#[derive(Parser, Debug)]
#[command(name = "formfield-server")]
#[command(about = "Fill PDF form fields and add new fillable fields over HTTP")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory holding the browser UI
    #[arg(long, default_value = "apps/formfield-web/www")]
    static_dir: PathBuf,

    /// Maximum upload size in megabytes
    #[arg(long, default_value = "25")]
    max_upload_mb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    /// Upload limit in megabytes
    pub max_upload_mb: usize,
    /// Static asset root
    pub static_dir: PathBuf,
}

impl AppState {
    fn body_limit(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    // The report header must be readable from browser JS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(FIELD_REPORT_HEADER)]);

    let static_files = ServeDir::new(&state.static_dir);
    let body_limit = state.body_limit();

    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // PDF endpoints
        .route("/fill-pdf", post(handle_fill_pdf))
        .route("/add-fillable-fields", post(handle_add_fillable_fields))
        .route("/list-fields", post(handle_list_fields))
        // Browser UI
        .fallback_service(static_files)
        // Apply middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting form field server on {}:{}", args.host, args.port);

    if !args.static_dir.is_dir() {
        tracing::warn!(
            "Static directory {} does not exist; only the API will be served",
            args.static_dir.display()
        );
    }

    let state = AppState {
        max_upload_mb: args.max_upload_mb,
        static_dir: args.static_dir,
    };
    let app = build_router(state.clone());

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Serving UI from {}", state.static_dir.display());
    info!("Upload limit: {} MB", state.max_upload_mb);

    axum::serve(listener, app).await?;

    Ok(())
}
