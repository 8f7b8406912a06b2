//! Byte stream over a staged file that deletes it when finished

use super::StagedArtifact;
use axum::body::Bytes;
use futures_util::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::io::ReaderStream;

/// Streams the contents of a staged artifact.
///
/// The artifact is owned by the stream, so the file is deleted once the
/// stream is exhausted or dropped (for example when a client disconnects
/// mid-download).
pub struct ArtifactStream {
    reader: ReaderStream<tokio::fs::File>,
    artifact: StagedArtifact,
    len: u64,
}

impl ArtifactStream {
    /// Open `artifact` for streaming. Takes ownership so the file outlives
    /// the caller until the last chunk has been read.
    pub async fn open(artifact: StagedArtifact) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(artifact.path()).await?;
        let len = file.metadata().await?.len();
        Ok(Self {
            reader: ReaderStream::new(file),
            artifact,
            len,
        })
    }

    /// Size of the file when it was opened
    pub fn content_length(&self) -> u64 {
        self.len
    }
}

impl Stream for ArtifactStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let next = Pin::new(&mut this.reader).poll_next(cx);
        if let Poll::Ready(None) = next {
            this.artifact.release();
        }
        next
    }
}
