//! Request and response payloads exchanged with chat backends.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body for the proxy endpoint. Both shapes have been served by the same
/// `/api/chat` route over time, so the client can speak either one.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProxyRequest {
    History { messages: Vec<ChatMessage> },
    Single { message: String },
}

/// Body for an OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseDelta {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseChoice {
    pub delta: ChatResponseDelta,
}

/// One streamed `chat/completions` chunk.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatResponseChoice>,
}

impl ChatResponse {
    pub fn first_content(self) -> Option<String> {
        self.choices.into_iter().next()?.delta.content
    }
}
