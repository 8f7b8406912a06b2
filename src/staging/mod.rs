//! Temporary storage for request artifacts
//!
//! The watermark tool only works on file paths, so uploads are written to a
//! staging directory first. Every file created here is owned by a
//! [`StagedArtifact`] and removed when that handle is released or dropped.

mod artifact;
mod stream;

pub use artifact::{ArtifactKind, StagedArtifact};
pub use stream::ArtifactStream;

use crate::error::Result;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

const NAME_PREFIX: &str = "watermark-";

/// Directory where request artifacts are created
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Use `root` for staged files, creating it if needed
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Stage into the process-wide temporary directory
    pub fn system() -> Self {
        Self {
            root: std::env::temp_dir(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `source` into a new file ending in `suffix`.
    ///
    /// The source is rewound before copying so a reader that was already
    /// consumed is still staged in full. On error no file is left behind.
    pub fn stage<R: Read + Seek>(
        &self,
        source: &mut R,
        kind: ArtifactKind,
        suffix: &str,
    ) -> Result<StagedArtifact> {
        let mut file = self.create(suffix)?;

        source.rewind()?;
        let bytes = std::io::copy(source, file.as_file_mut())?;
        file.as_file_mut().flush()?;

        let artifact = StagedArtifact::new(file.into_temp_path(), kind);
        tracing::debug!(
            kind = kind.as_str(),
            path = %artifact.path().display(),
            bytes,
            "staged artifact"
        );
        Ok(artifact)
    }

    /// Create an empty file ending in `suffix` for a process to write into
    pub fn reserve(&self, kind: ArtifactKind, suffix: &str) -> Result<StagedArtifact> {
        let file = self.create(suffix)?;
        let artifact = StagedArtifact::new(file.into_temp_path(), kind);
        tracing::debug!(kind = kind.as_str(), path = %artifact.path().display(), "reserved artifact");
        Ok(artifact)
    }

    fn create(&self, suffix: &str) -> Result<tempfile::NamedTempFile> {
        let file = tempfile::Builder::new()
            .prefix(NAME_PREFIX)
            .suffix(suffix)
            .tempfile_in(&self.root)?;
        Ok(file)
    }
}

impl Default for StagingArea {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::{Cursor, SeekFrom};

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_stage_copies_content_and_keeps_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path()).unwrap();

        let mut source = Cursor::new(b"\x89PNG fake image".to_vec());
        let artifact = staging
            .stage(&mut source, ArtifactKind::WatermarkImage, ".png")
            .unwrap();

        assert!(artifact.path().starts_with(dir.path()));
        assert_eq!(
            artifact.path().extension().and_then(|e| e.to_str()),
            Some("png")
        );
        assert_eq!(std::fs::read(artifact.path()).unwrap(), b"\x89PNG fake image");
    }

    #[test]
    fn test_stage_rewinds_consumed_source() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path()).unwrap();

        let mut source = Cursor::new(b"%PDF-1.7 body".to_vec());
        source.seek(SeekFrom::End(0)).unwrap();

        let artifact = staging
            .stage(&mut source, ArtifactKind::Input, ".pdf")
            .unwrap();
        assert_eq!(std::fs::read(artifact.path()).unwrap(), b"%PDF-1.7 body");
    }

    #[test]
    fn test_reserve_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path()).unwrap();

        let artifact = staging.reserve(ArtifactKind::Output, ".pdf").unwrap();
        assert!(artifact.path().exists());
        assert_eq!(std::fs::metadata(artifact.path()).unwrap().len(), 0);
        assert_eq!(artifact.kind(), ArtifactKind::Output);
    }

    #[test]
    fn test_paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path()).unwrap();

        let artifacts: Vec<_> = (0..50)
            .map(|_| staging.reserve(ArtifactKind::Output, ".pdf").unwrap())
            .collect();
        let paths: HashSet<_> = artifacts.iter().map(|a| a.path().to_path_buf()).collect();
        assert_eq!(paths.len(), 50);
    }

    #[test]
    fn test_concurrent_staging_never_collides() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let staging = staging.clone();
                std::thread::spawn(move || {
                    let mut source = Cursor::new(vec![i as u8; 64]);
                    let artifact = staging
                        .stage(&mut source, ArtifactKind::Input, ".pdf")
                        .unwrap();
                    assert_eq!(std::fs::read(artifact.path()).unwrap(), vec![i as u8; 64]);
                    artifact
                })
            })
            .collect();

        let artifacts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let paths: HashSet<_> = artifacts.iter().map(|a| a.path().to_path_buf()).collect();
        assert_eq!(paths.len(), 8);
    }

    #[test]
    fn test_dropping_artifacts_empties_staging_dir() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path()).unwrap();

        {
            let mut source = Cursor::new(b"data".to_vec());
            let _input = staging
                .stage(&mut source, ArtifactKind::Input, ".pdf")
                .unwrap();
            let _output = staging.reserve(ArtifactKind::Output, ".pdf").unwrap();
            assert_eq!(file_count(dir.path()), 2);
        }
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_stage_failure_leaves_nothing_behind() {
        struct FailingReader;

        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("stream broke"))
            }
        }

        impl Seek for FailingReader {
            fn seek(&mut self, _pos: SeekFrom) -> std::io::Result<u64> {
                Ok(0)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path()).unwrap();

        let result = staging.stage(&mut FailingReader, ArtifactKind::Input, ".pdf");
        assert!(matches!(result, Err(crate::Error::Staging(_))));
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_new_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("staging");
        let staging = StagingArea::new(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(staging.root(), root.as_path());
    }
}
