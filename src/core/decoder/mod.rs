//! Incremental decoding of streamed chat responses.
//!
//! A [`StreamDecoder`] wraps a [`ByteSource`] (normally an HTTP response body)
//! and turns it into an ordered, finite sequence of [`DeltaEvent`]s. It never
//! needs the whole body: bytes are decoded as UTF-8 incrementally, split into
//! lines, and every line is classified by its framing before being parsed.
//!
//! Individually corrupt frames are skipped and logged; they never abort the
//! stream. The source is released as soon as decoding stops, whether that is
//! because of a terminal marker, the end of the body, an error, cancellation,
//! or the decoder being dropped.

mod lines;
mod source;
mod utf8;

#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use futures_util::Stream;
use tokio_util::sync::CancellationToken;

pub use lines::{
    classify, error_summary, text_fragment, LineBuffer, LineDecoder, LineKind, LineOutcome,
};
pub use source::{BodyStream, ByteSource};
pub use utf8::Utf8Decoder;

use source::SourceGuard;

/// A decoded unit of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaEvent {
    /// Text to append to the reply.
    Text(String),
    /// The terminal marker; nothing follows it.
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The request was aborted by the user.
    #[error("stream cancelled")]
    Cancelled,
    /// Reading the body failed.
    #[error("failed to read response body: {0}")]
    Read(String),
    /// The server reported an error inside the stream.
    #[error("{0}")]
    Remote(String),
}

pub struct StreamDecoder<S: ByteSource> {
    source: SourceGuard<S>,
    utf8: Utf8Decoder,
    lines: LineBuffer,
    framing: LineDecoder,
    ready: VecDeque<String>,
    cancel: Option<CancellationToken>,
    exhausted: bool,
    finished: bool,
}

impl<S: ByteSource> StreamDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: SourceGuard::new(source),
            utf8: Utf8Decoder::default(),
            lines: LineBuffer::default(),
            framing: LineDecoder::default(),
            ready: VecDeque::new(),
            cancel: None,
            exhausted: false,
            finished: false,
        }
    }

    /// Ties the decoder to a cancellation token. Once the token fires, the
    /// pending read is abandoned and [`StreamError::Cancelled`] is returned.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Declares the body a server-sent event stream up front, so `event:`,
    /// `id:`, `retry:` and `:` comment lines are skipped from the first line.
    /// Otherwise they are only skipped once a `data:` line has been seen.
    pub fn with_event_stream(mut self) -> Self {
        self.framing = LineDecoder::event_stream();
        self
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_source_released(&self) -> bool {
        self.source.is_released()
    }

    /// Produces the next event, or `None` once the sequence has ended.
    pub async fn next_event(&mut self) -> Result<Option<DeltaEvent>, StreamError> {
        loop {
            if self.finished {
                return Ok(None);
            }
            if self.is_cancelled() {
                self.finish();
                return Err(StreamError::Cancelled);
            }

            while let Some(line) = self.ready.pop_front() {
                match self.framing.decode(&line) {
                    LineOutcome::Event(DeltaEvent::Done) => {
                        self.finish();
                        return Ok(Some(DeltaEvent::Done));
                    }
                    LineOutcome::Event(event) => return Ok(Some(event)),
                    LineOutcome::Skip => continue,
                    LineOutcome::Failed(err) => {
                        self.finish();
                        return Err(err);
                    }
                }
            }

            if self.exhausted {
                self.finish();
                return Ok(None);
            }

            match self.read_chunk().await {
                Ok(Some(chunk)) => {
                    let text = self.utf8.decode(&chunk);
                    self.ready.extend(self.lines.push(&text));
                }
                Ok(None) => {
                    let tail = self.utf8.finish();
                    self.ready.extend(self.lines.push(&tail));
                    self.ready.extend(self.lines.finish());
                    self.exhausted = true;
                    self.source.release();
                }
                Err(err) => {
                    self.finish();
                    return Err(err);
                }
            }
        }
    }

    /// Exposes the decoder as a `futures` stream. An error is yielded once
    /// and ends the stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<DeltaEvent, StreamError>> + Send
    where
        S: 'static,
    {
        futures_util::stream::unfold(self, |mut decoder| async move {
            match decoder.next_event().await {
                Ok(Some(event)) => Some((Ok(event), decoder)),
                Ok(None) => None,
                Err(err) => Some((Err(err), decoder)),
            }
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        match self.cancel.clone() {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(StreamError::Cancelled),
                    chunk = self.source.next_chunk() => chunk,
                }
            }
            None => self.source.next_chunk().await,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.ready.clear();
        self.source.release();
    }
}
