//! Owning handle for a staged temporary file

use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// What a staged file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Uploaded PDF handed to the tool
    Input,
    /// Uploaded watermark image handed to the tool
    WatermarkImage,
    /// File the tool writes the watermarked PDF into
    Output,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Input => "input",
            ArtifactKind::WatermarkImage => "watermark_image",
            ArtifactKind::Output => "output",
        }
    }
}

/// A file created for one request and deleted exactly once.
///
/// Deletion happens on [`StagedArtifact::release`] or when the handle is
/// dropped, whichever comes first. The handle is not `Clone`, so only the
/// request that staged the file can release it.
#[derive(Debug)]
pub struct StagedArtifact {
    path: PathBuf,
    kind: ArtifactKind,
    temp: Option<TempPath>,
}

impl StagedArtifact {
    pub(crate) fn new(temp: TempPath, kind: ArtifactKind) -> Self {
        Self {
            path: temp.to_path_buf(),
            kind,
            temp: Some(temp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Whether the file has already been deleted through this handle
    pub fn is_released(&self) -> bool {
        self.temp.is_none()
    }

    /// Delete the staged file.
    ///
    /// Safe to call more than once. A file that was already removed by
    /// someone else is not an error.
    pub fn release(&mut self) {
        let Some(temp) = self.temp.take() else {
            return;
        };

        match temp.close() {
            Ok(()) => {
                tracing::debug!(kind = self.kind.as_str(), path = %self.path.display(), "released artifact");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    kind = self.kind.as_str(),
                    path = %self.path.display(),
                    error = %e,
                    "failed to release artifact"
                );
            }
        }
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        self.release();
    }
}
