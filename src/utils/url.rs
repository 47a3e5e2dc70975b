//! Joining configured base URLs with API paths.

/// Strips trailing slashes so a path can be appended without doubling them.
///
/// ```
/// use berrychat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.deepseek.com/"), "https://api.deepseek.com");
/// assert_eq!(normalize_base_url("http://localhost:3000//"), "http://localhost:3000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Appends `endpoint` to `base_url` with exactly one slash between them.
///
/// ```
/// use berrychat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.deepseek.com/", "/v1/chat/completions"),
///     "https://api.deepseek.com/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalize_base_url(base_url), endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_only_trailing_slashes() {
        assert_eq!(
            normalize_base_url("https://api.deepseek.com"),
            "https://api.deepseek.com"
        );
        assert_eq!(
            normalize_base_url("https://gateway.example/deepseek///"),
            "https://gateway.example/deepseek"
        );
        assert_eq!(
            normalize_base_url("  https://api.deepseek.com/ \n"),
            "https://api.deepseek.com"
        );
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn construct_joins_with_a_single_slash() {
        for base in [
            "https://api.deepseek.com",
            "https://api.deepseek.com/",
            "https://api.deepseek.com///",
        ] {
            for endpoint in ["v1/chat/completions", "/v1/chat/completions"] {
                assert_eq!(
                    construct_api_url(base, endpoint),
                    "https://api.deepseek.com/v1/chat/completions",
                    "{base} + {endpoint}"
                );
            }
        }
    }

    #[test]
    fn construct_keeps_a_base_path_prefix() {
        assert_eq!(
            construct_api_url("http://127.0.0.1:8080/proxy/", "v1/chat/completions"),
            "http://127.0.0.1:8080/proxy/v1/chat/completions"
        );
    }
}
