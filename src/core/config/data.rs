use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::backend::RequestFormat;
use crate::core::locale::Locale;

pub const DEFAULT_PROXY_ENDPOINT: &str = "http://localhost:3000/api/chat";
pub const DEFAULT_API_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";
pub const API_URL_ENV: &str = "DEEPSEEK_API_URL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// POST to a local proxy route that talks to the model provider.
    #[default]
    Proxy,
    /// Call the OpenAI-compatible provider API directly.
    Direct,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Proxy => "proxy",
            BackendKind::Direct => "direct",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    pub backend: Option<BackendKind>,
    /// Proxy route used by the proxy backend
    pub endpoint: Option<String>,
    pub request_format: Option<RequestFormat>,
    /// Base URL of the provider API used by the direct backend
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub locale: Option<Locale>,
    /// Connect timeout for chat requests, in seconds
    pub timeout_secs: Option<u64>,
    /// Only ever read from the environment; never written to disk.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Config {
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.unwrap_or_default()
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_PROXY_ENDPOINT)
    }

    pub fn request_format(&self) -> RequestFormat {
        self.request_format.unwrap_or_default()
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn locale(&self) -> Locale {
        self.locale.unwrap_or_default()
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    /// Overlays the provider credentials and URL from the environment.
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_ENV) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = non_empty(API_URL_ENV) {
            self.api_url = Some(url.trim().to_string());
        }
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
