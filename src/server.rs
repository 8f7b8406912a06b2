//! HTTP server implementation using axum

use crate::error::{Error, Result};
use crate::staging::{ArtifactStream, StagingArea};
use crate::watermark::{
    CliWatermarkEngine, Upload, WatermarkEngine, WatermarkForm, WatermarkRequest,
    WatermarkService, WatermarkedPdf, DEFAULT_PROGRAM,
};
use axum::{
    body::Body,
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Configuration
// ============================================================================

/// Runtime configuration for the watermark server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (default: 127.0.0.1:5000)
    pub bind_addr: SocketAddr,
    /// Watermark executable name or path (default: "watermark")
    pub program: String,
    /// Directory for staged files (default: system temp dir)
    pub staging_dir: Option<PathBuf>,
    /// Maximum request body size in bytes (default: 100MB)
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            program: DEFAULT_PROGRAM.to_string(),
            staging_dir: None,
            max_upload_bytes: 100 * 1024 * 1024, // 100MB
        }
    }
}

impl ServerConfig {
    /// Build configuration from `WATERMARK_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("WATERMARK_BIND_ADDR") {
            config.bind_addr = addr.parse().map_err(|e| Error::Config {
                reason: format!("WATERMARK_BIND_ADDR={}: {}", addr, e),
            })?;
        }
        if let Some(program) = lookup("WATERMARK_PROGRAM") {
            if program.trim().is_empty() {
                return Err(Error::Config {
                    reason: "WATERMARK_PROGRAM is empty".to_string(),
                });
            }
            config.program = program;
        }
        if let Some(dir) = lookup("WATERMARK_STAGING_DIR") {
            config.staging_dir = Some(PathBuf::from(dir));
        }
        if let Some(limit) = lookup("WATERMARK_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = limit.parse().map_err(|e| Error::Config {
                reason: format!("WATERMARK_MAX_UPLOAD_BYTES={}: {}", limit, e),
            })?;
        }

        Ok(config)
    }
}

// ============================================================================
// State and router
// ============================================================================

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    service: WatermarkService,
    max_upload_bytes: usize,
}

impl AppState {
    pub fn new(service: WatermarkService, max_upload_bytes: usize) -> Self {
        Self {
            service,
            max_upload_bytes,
        }
    }

    /// State using the configured executable and staging directory
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let staging = match &config.staging_dir {
            Some(dir) => StagingArea::new(dir)?,
            None => StagingArea::system(),
        };
        let engine: Arc<dyn WatermarkEngine> = Arc::new(CliWatermarkEngine::new(&config.program));
        Ok(Self::new(
            WatermarkService::new(staging, engine),
            config.max_upload_bytes,
        ))
    }
}

/// Build the application router.
///
/// - `GET /` - API documentation
/// - `POST /watermark` - Apply a watermark to an uploaded PDF
pub fn router(state: AppState) -> Router {
    let limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(api_documentation))
        .route("/watermark", post(apply_watermark))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

// ============================================================================
// Responses
// ============================================================================

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.client_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// `attachment` disposition with an ASCII `filename` and, for non-ASCII
/// names, an RFC 5987 `filename*` carrying the UTF-8 name percent-encoded
fn content_disposition(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    let value = if filename.is_ascii() {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(filename)
        )
    };

    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"watermarked.pdf\""))
}

/// Stream the output artifact back; the file is deleted when the body ends
async fn pdf_response(pdf: WatermarkedPdf) -> Result<Response> {
    let stream = ArtifactStream::open(pdf.output).await?;
    let length = stream.content_length();

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, content_disposition(&pdf.download_name)),
            (header::CONTENT_LENGTH, HeaderValue::from(length)),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

// ============================================================================
// Handlers
// ============================================================================

async fn api_documentation() -> Json<Value> {
    Json(json!({
        "name": "API de Filigrane PDF",
        "description": "Cette API permet d'appliquer un filigrane (watermark) à un document PDF et de récupérer le document modifié.",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            {
                "path": "/",
                "method": "GET",
                "description": "Affiche cette documentation"
            },
            {
                "path": "/watermark",
                "method": "POST",
                "description": "Applique un filigrane à un PDF",
                "parameters": {
                    "file": "Le fichier PDF à traiter (multipart/form-data)",
                    "text": "Le texte à utiliser comme filigrane (obligatoire si 'image' n'est pas fourni)",
                    "image": "L'image à utiliser comme filigrane (obligatoire si 'text' n'est pas fourni)",
                    "pattern": "Le motif à utiliser: 'grid' ou 'insert'. Défaut: 'grid'"
                },
                "options_communes": {
                    "opacity": "Opacité du filigrane entre 0 et 1",
                    "angle": "Angle d'inclinaison en degrés",
                    "text_color": "Couleur du texte au format hexadécimal, ex: #000000",
                    "text_font": "Police du texte",
                    "text_size": "Taille de la police",
                    "unselectable": "Rendre le texte non sélectionnable (true/false)",
                    "image_scale": "Facteur d'échelle pour l'image",
                    "save_as_image": "Convertir chaque page PDF en image (true/false)",
                    "dpi": "DPI à utiliser lors de la sauvegarde du PDF en image"
                },
                "options_grid": {
                    "horizontal_boxes": "Nombre de répétitions du filigrane horizontalement",
                    "vertical_boxes": "Nombre de répétitions du filigrane verticalement",
                    "margin": "Laisser une marge autour de la page (true/false)"
                },
                "options_insert": {
                    "x": "Position horizontale du filigrane (entre 0 et 1)",
                    "y": "Position verticale du filigrane (entre 0 et 1)",
                    "horizontal_alignment": "Alignement horizontal ('left', 'right', 'center')"
                }
            }
        ]
    }))
}

#[tracing::instrument(name = "watermark", skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
async fn apply_watermark(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    match process_watermark(&state, multipart).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, kind = ?e.kind(), "watermark failed");
            e.into_response()
        }
    }
}

async fn process_watermark(
    state: &AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let multipart = multipart.map_err(|e| Error::Multipart {
        reason: e.body_text(),
    })?;
    let form = read_form(multipart, state.max_upload_bytes).await?;
    let request = WatermarkRequest::from_form(form)?;

    tracing::info!(
        filename = %request.document.filename,
        pattern = %request.pattern,
        bytes = request.document.data.len(),
        "applying watermark"
    );

    let service = state.service.clone();
    let pdf = tokio::task::spawn_blocking(move || service.apply(&request))
        .await
        .map_err(|e| Error::TaskJoin {
            reason: e.to_string(),
        })??;

    tracing::info!(download_name = %pdf.download_name, "watermark applied");
    pdf_response(pdf).await
}

fn map_multipart_error(e: MultipartError, limit: usize) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { limit }
    } else {
        Error::Multipart {
            reason: e.body_text(),
        }
    }
}

async fn read_upload(field: Field<'_>, filename: String, limit: usize) -> Result<Upload> {
    let data = field
        .bytes()
        .await
        .map_err(|e| map_multipart_error(e, limit))?;
    Ok(Upload { filename, data })
}

async fn read_text(field: Field<'_>, limit: usize) -> Result<String> {
    field.text().await.map_err(|e| map_multipart_error(e, limit))
}

/// Collect multipart parts into a form.
///
/// `file` and `image` only count when sent as file parts; `text`, `pattern`
/// and every other name only count when sent as plain fields. Anything that
/// is neither becomes a translator option. A repeated name keeps its first
/// value.
async fn read_form(mut multipart: Multipart, limit: usize) -> Result<WatermarkForm> {
    let mut form = WatermarkForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| map_multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);

        match (name.as_str(), filename) {
            ("file", Some(filename)) if form.file.is_none() => {
                form.file = Some(read_upload(field, filename, limit).await?)
            }
            ("image", Some(filename)) if form.image.is_none() => {
                form.image = Some(read_upload(field, filename, limit).await?)
            }
            (_, Some(_)) => {}
            ("text", None) if form.text.is_none() => {
                form.text = Some(read_text(field, limit).await?)
            }
            ("pattern", None) if form.pattern.is_none() => {
                form.pattern = Some(read_text(field, limit).await?)
            }
            ("file" | "text" | "pattern", None) => {}
            (_, None) => {
                if !form.options.contains_key(&name) {
                    let value = read_text(field, limit).await?;
                    form.options.insert(name.clone(), value);
                }
            }
        }
    }

    Ok(form)
}

// ============================================================================
// Entry points
// ============================================================================

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Run the server with configuration taken from the environment
pub async fn run_server() -> anyhow::Result<()> {
    run_server_with_config(ServerConfig::from_env()?).await
}

/// Run the server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    tracing::info!(
        addr = %listener.local_addr()?,
        program = %config.program,
        "PDF watermark server listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
