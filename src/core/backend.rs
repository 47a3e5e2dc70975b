use serde::{Deserialize, Serialize};

use crate::api::{ChatMessage, ChatRequest, ProxyRequest};
use crate::core::config::data::API_KEY_ENV;
use crate::core::config::{BackendKind, Config};
use crate::core::error::ChatError;
use crate::utils::url::construct_api_url;

/// Shape of the body sent to the proxy route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RequestFormat {
    /// `{ "messages": [...] }` with every settled turn plus the new prompt.
    #[default]
    History,
    /// `{ "message": "..." }` with the new prompt only.
    Single,
}

impl RequestFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestFormat::History => "history",
            RequestFormat::Single => "single",
        }
    }
}

/// Where chat requests go and how they are shaped.
#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    Proxy {
        endpoint: String,
        format: RequestFormat,
    },
    Direct {
        api_url: String,
        api_key: Option<String>,
        model: String,
        temperature: Option<f32>,
    },
}

impl Backend {
    /// A direct backend without a key is still constructed; the missing
    /// credential is reported when a request is attempted.
    pub fn from_config(config: &Config) -> Self {
        match config.backend_kind() {
            BackendKind::Proxy => Backend::Proxy {
                endpoint: config.endpoint().to_string(),
                format: config.request_format(),
            },
            BackendKind::Direct => Backend::Direct {
                api_url: config.api_url().to_string(),
                api_key: config.api_key.clone(),
                model: config.model().to_string(),
                temperature: Some(config.temperature()),
            },
        }
    }

    pub fn endpoint(&self) -> String {
        match self {
            Backend::Proxy { endpoint, .. } => endpoint.clone(),
            Backend::Direct { api_url, .. } => construct_api_url(api_url, "v1/chat/completions"),
        }
    }

    /// Builds the streaming request for `history`, whose last entry is the
    /// prompt being sent.
    pub fn build_request(
        &self,
        client: &reqwest::Client,
        history: Vec<ChatMessage>,
    ) -> Result<reqwest::RequestBuilder, ChatError> {
        match self {
            Backend::Proxy { endpoint, format } => {
                let body = match format {
                    RequestFormat::History => ProxyRequest::History { messages: history },
                    RequestFormat::Single => ProxyRequest::Single {
                        message: history
                            .into_iter()
                            .next_back()
                            .map(|m| m.content)
                            .unwrap_or_default(),
                    },
                };
                Ok(client
                    .post(endpoint)
                    .header("Accept", "text/event-stream")
                    .json(&body))
            }
            Backend::Direct {
                api_key,
                model,
                temperature,
                ..
            } => {
                let api_key = api_key
                    .as_deref()
                    .ok_or_else(|| ChatError::Configuration(format!("{API_KEY_ENV} is not set")))?;
                let body = ChatRequest {
                    model: model.clone(),
                    messages: history,
                    stream: true,
                    temperature: *temperature,
                };
                Ok(client
                    .post(self.endpoint())
                    .header("Accept", "text/event-stream")
                    .bearer_auth(api_key)
                    .json(&body))
            }
        }
    }
}
