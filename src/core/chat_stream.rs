use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::ChatMessage;
use crate::core::backend::Backend;
use crate::core::decoder::{error_summary, BodyStream, DeltaEvent, StreamDecoder, StreamError};
use crate::core::error::ChatError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    /// A text fragment for the in-flight reply.
    Chunk(String),
    /// The server sent its terminal marker.
    Done,
    Error(ChatError),
    /// The body ended without a terminal marker.
    End,
}

impl From<DeltaEvent> for StreamMessage {
    fn from(event: DeltaEvent) -> Self {
        match event {
            DeltaEvent::Text(text) => StreamMessage::Chunk(text),
            DeltaEvent::Done => StreamMessage::Done,
        }
    }
}

const MAX_ERROR_BODY_CHARS: usize = 300;
const EVENT_STREAM_MIME: &str = "text/event-stream";

/// Turns a non-2xx response into the reason shown to the user: the server's
/// `error` field verbatim when present, otherwise the status and body.
pub fn describe_http_error(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = error_summary(&value).filter(|s| !s.is_empty()) {
            return summary;
        }
    }

    let status_text = match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    };

    if trimmed.is_empty() {
        status_text
    } else {
        let excerpt: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{status_text}: {excerpt}")
    }
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub backend: Backend,
    pub api_messages: Vec<ChatMessage>,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

/// Runs chat requests in the background and reports every decoded event on
/// one channel, tagged with the id of the stream it came from.
#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let cancel_token = params.cancel_token.clone();
            let stream_id = params.stream_id;
            tokio::select! {
                _ = run_stream(&tx, params) => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "stream cancelled");
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn run_stream(tx: &mpsc::UnboundedSender<(StreamMessage, u64)>, params: StreamParams) {
    let StreamParams {
        client,
        backend,
        api_messages,
        cancel_token,
        stream_id,
    } = params;

    let send = |message: StreamMessage| {
        let _ = tx.send((message, stream_id));
    };
    let fail = |error: ChatError| {
        warn!(stream_id, kind = error.kind(), error = %error, "chat stream failed");
        send(StreamMessage::Error(error));
        send(StreamMessage::End);
    };

    let request = match backend.build_request(&client, api_messages) {
        Ok(request) => request,
        Err(err) => return fail(err),
    };

    debug!(stream_id, endpoint = %backend.endpoint(), "sending chat request");
    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => return fail(ChatError::Network(err.to_string())),
    };

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_default();
        return fail(ChatError::Network(describe_http_error(status, &body)));
    }

    let event_stream = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(EVENT_STREAM_MIME));
    let mut decoder = StreamDecoder::new(BodyStream::new(Box::pin(response.bytes_stream())))
        .with_cancellation(cancel_token);
    if event_stream {
        decoder = decoder.with_event_stream();
    }

    loop {
        match decoder.next_event().await {
            Ok(Some(DeltaEvent::Text(text))) => send(StreamMessage::Chunk(text)),
            Ok(Some(DeltaEvent::Done)) => {
                debug!(stream_id, "stream reached terminal marker");
                return send(StreamMessage::Done);
            }
            Ok(None) => {
                debug!(stream_id, "stream body exhausted");
                return send(StreamMessage::End);
            }
            Err(StreamError::Cancelled) => return,
            Err(err) => return fail(ChatError::Stream(err.to_string())),
        }
    }
}
