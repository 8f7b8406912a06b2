//! Watermark request orchestration
//!
//! Stages the upload, builds the invocation, runs the engine and hands back
//! the output artifact. Input and image artifacts never outlive
//! [`WatermarkService::apply`]; the output artifact does on success and is
//! deleted by whoever finally drops it.

use super::options::{MarkArg, WatermarkInvocation};
use super::request::{WatermarkMark, WatermarkRequest};
use super::runner::WatermarkEngine;
use crate::error::Result;
use crate::staging::{ArtifactKind, StagedArtifact, StagingArea};
use std::io::Cursor;
use std::sync::Arc;

/// Watermark source once any file it needs is on disk
enum StagedMark<'a> {
    Text(&'a str),
    Image(StagedArtifact),
}

/// Result of a successful watermark run
#[derive(Debug)]
pub struct WatermarkedPdf {
    /// Staged file holding the watermarked PDF
    pub output: StagedArtifact,
    /// Name to offer the caller
    pub download_name: String,
    /// The output must be deleted once consumed; dropping `output` does that
    pub is_temporary: bool,
}

/// Runs validated watermark requests against an engine
#[derive(Clone)]
pub struct WatermarkService {
    staging: StagingArea,
    engine: Arc<dyn WatermarkEngine>,
}

impl WatermarkService {
    pub fn new(staging: StagingArea, engine: Arc<dyn WatermarkEngine>) -> Self {
        Self { staging, engine }
    }

    /// Apply the watermark described by `request`.
    ///
    /// Blocks until the engine finishes. Every artifact staged here is
    /// released before an error is returned, including a partially written
    /// output.
    pub fn apply(&self, request: &WatermarkRequest) -> Result<WatermarkedPdf> {
        let mut input = self.staging.stage(
            &mut Cursor::new(&request.document.data[..]),
            ArtifactKind::Input,
            ".pdf",
        )?;

        let mut staged_mark = match &request.mark {
            WatermarkMark::Text(text) => StagedMark::Text(text),
            WatermarkMark::Image(upload) => StagedMark::Image(self.staging.stage(
                &mut Cursor::new(&upload.data[..]),
                ArtifactKind::WatermarkImage,
                &upload.suffix(),
            )?),
        };

        let output = self.staging.reserve(ArtifactKind::Output, ".pdf")?;

        let mark = match &staged_mark {
            StagedMark::Text(text) => MarkArg::Text(text),
            StagedMark::Image(image) => MarkArg::Image(image.path()),
        };

        let invocation = WatermarkInvocation::build(
            request.pattern,
            input.path(),
            mark,
            output.path(),
            &request.options,
        );

        let tool_output = self.engine.apply(&invocation)?;
        if !tool_output.stdout.is_empty() {
            tracing::debug!(stdout = %tool_output.stdout.trim_end(), "watermark tool output");
        }

        input.release();
        if let StagedMark::Image(image) = &mut staged_mark {
            image.release();
        }

        Ok(WatermarkedPdf {
            output,
            download_name: request.download_name(),
            is_temporary: true,
        })
    }
}
