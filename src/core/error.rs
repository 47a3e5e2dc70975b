/// Failures that end a single exchange. Each one is surfaced on the assistant
/// message whose turn failed; none of them is retried.
///
/// User-initiated cancellation is deliberately absent: an aborted reply is
/// not a failure and produces no error state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// A required credential is missing; detected before any request is made.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The request could not be sent or the server answered with a non-2xx
    /// status. Holds the server's `error` text verbatim when it sent one.
    #[error("{0}")]
    Network(String),
    /// The body failed mid-stream, or the server reported an error in-band.
    #[error("{0}")]
    Stream(String),
    /// The stream ended without producing any text.
    #[error("the response stream ended without any text")]
    EmptyResponse,
}

impl ChatError {
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Configuration(_) => "configuration",
            ChatError::Network(_) => "network",
            ChatError::Stream(_) => "stream",
            ChatError::EmptyResponse => "empty_response",
        }
    }
}
