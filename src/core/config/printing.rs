use std::fmt::Write as _;
use std::path::Path;

use crate::core::config::data::{path_display, BackendKind, Config};

impl Config {
    /// Human-readable dump of the effective settings. The API key itself is
    /// never shown, only whether one is present.
    pub fn describe(&self, path: &Path) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Configuration file: {}", path_display(path));
        let _ = writeln!(out, "  backend: {}", self.backend_kind().as_str());
        match self.backend_kind() {
            BackendKind::Proxy => {
                let _ = writeln!(out, "  endpoint: {}", self.endpoint());
                let _ = writeln!(out, "  request-format: {}", self.request_format().as_str());
            }
            BackendKind::Direct => {
                let _ = writeln!(out, "  api-url: {}", self.api_url());
                let _ = writeln!(out, "  model: {}", self.model());
                let _ = writeln!(out, "  temperature: {}", self.temperature());
                let key = if self.api_key.is_some() { "set" } else { "(unset)" };
                let _ = writeln!(out, "  api-key: {key}");
            }
        }
        let _ = writeln!(out, "  locale: {}", self.locale().as_str());
        let _ = writeln!(out, "  timeout-secs: {}", self.timeout_secs());
        out
    }

    pub fn print_all(&self, path: &Path) {
        print!("{}", self.describe(path));
    }
}
