use std::fmt::Display;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};

use super::StreamError;

/// A readable byte source with a single primitive: hand over the next chunk,
/// or `None` once the body is exhausted.
#[async_trait]
pub trait ByteSource: Send {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, StreamError>;

    /// Gives up the underlying handle. Called once when decoding stops.
    fn release(&mut self) {}
}

/// Adapts any `futures` byte stream, such as
/// `reqwest::Response::bytes_stream()`, into a [`ByteSource`].
pub struct BodyStream<St> {
    inner: Option<St>,
}

impl<St> BodyStream<St> {
    pub fn new(stream: St) -> Self {
        Self {
            inner: Some(stream),
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }
}

#[async_trait]
impl<St, B, E> ByteSource for BodyStream<St>
where
    St: Stream<Item = Result<B, E>> + Unpin + Send,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        let Some(stream) = self.inner.as_mut() else {
            return Ok(None);
        };
        match stream.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk.as_ref().to_vec())),
            Some(Err(err)) => Err(StreamError::Read(err.to_string())),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        self.inner = None;
    }
}

/// Owns a source and releases it exactly once: explicitly through
/// [`SourceGuard::release`], or on drop.
pub(super) struct SourceGuard<S: ByteSource> {
    source: S,
    released: bool,
}

impl<S: ByteSource> SourceGuard<S> {
    pub(super) fn new(source: S) -> Self {
        Self {
            source,
            released: false,
        }
    }

    pub(super) async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        if self.released {
            return Ok(None);
        }
        self.source.next_chunk().await
    }

    pub(super) fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
        }
    }

    pub(super) fn is_released(&self) -> bool {
        self.released
    }
}

impl<S: ByteSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}
