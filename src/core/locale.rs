use serde::{Deserialize, Serialize};

use super::error::ChatError;

/// Language for the fixed, user-facing strings the client substitutes into
/// failed messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
        }
    }

    pub fn missing_api_key(self) -> &'static str {
        match self {
            Locale::En => "The API key is not configured. Set DEEPSEEK_API_KEY and try again.",
            Locale::Zh => "未配置 API 密钥，请设置 DEEPSEEK_API_KEY 后重试。",
        }
    }

    pub fn empty_response(self) -> &'static str {
        match self {
            Locale::En => "The assistant returned an empty response. Please try again.",
            Locale::Zh => "助手没有返回任何内容，请重试。",
        }
    }

    pub fn request_failed(self, reason: &str) -> String {
        match self {
            Locale::En => format!("Sorry, the request failed: {reason}"),
            Locale::Zh => format!("抱歉，请求失败：{reason}"),
        }
    }

    pub fn stream_failed(self, reason: &str) -> String {
        match self {
            Locale::En => format!("Sorry, the response was interrupted: {reason}"),
            Locale::Zh => format!("抱歉，响应中断：{reason}"),
        }
    }

    /// Text that replaces the content of an assistant message that failed.
    pub fn error_text(self, error: &ChatError) -> String {
        match error {
            ChatError::Configuration(_) => self.missing_api_key().to_string(),
            ChatError::Network(reason) => self.request_failed(reason),
            ChatError::Stream(reason) => self.stream_failed(reason),
            ChatError::EmptyResponse => self.empty_response().to_string(),
        }
    }
}
