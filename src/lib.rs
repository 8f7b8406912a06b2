//! PDF Watermark Server Library
//!
//! HTTP service that applies text or image watermarks to PDFs by delegating
//! to the external `watermark` command-line tool:
//! - `watermark`: request validation, option translation, tool execution
//! - `staging`: temporary files with guaranteed cleanup
//! - `server`: axum router, multipart handling and response streaming

pub mod error;
pub mod server;
pub mod staging;
pub mod watermark;

pub use error::{Error, ErrorKind, Result};
pub use server::{
    router, run_server, run_server_with_config, AppState, ErrorResponse, ServerConfig,
};
pub use staging::{ArtifactKind, StagedArtifact, StagingArea};
pub use watermark::{
    CliWatermarkEngine, Pattern, WatermarkEngine, WatermarkInvocation, WatermarkRequest,
    WatermarkService,
};
