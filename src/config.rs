use std::path::PathBuf;

use crate::listing::parser::DEFAULT_MAX_HTML_BYTES;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Runtime configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub session_key: Option<String>,
    pub max_html_bytes: usize,
    pub max_upload_bytes: usize,
    pub demo_mode: bool,
    pub selector_profile: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            session_key: None,
            max_html_bytes: DEFAULT_MAX_HTML_BYTES,
            max_upload_bytes: DEFAULT_MAX_HTML_BYTES,
            demo_mode: true,
            selector_profile: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let size = |key: &str, default: usize| {
            non_empty(key)
                .and_then(|v| match v.parse::<usize>() {
                    Ok(n) if n > 0 => Some(n),
                    _ => {
                        log::warn!("Ignoring invalid {key}={v:?}");
                        None
                    }
                })
                .unwrap_or(default)
        };

        let database_url = non_empty("DATABASE_URL");
        let demo_flag = non_empty("DEMO_MODE")
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"));
        let max_html_bytes = size("MAX_HTML_BYTES", DEFAULT_MAX_HTML_BYTES);

        AppConfig {
            demo_mode: demo_flag || database_url.is_none(),
            database_url,
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            session_key: get("SESSION_KEY"),
            max_html_bytes,
            max_upload_bytes: size("MAX_UPLOAD_BYTES", max_html_bytes),
            selector_profile: non_empty("SELECTOR_PROFILE").map(PathBuf::from),
        }
    }

    /// Request body limit for JSON and form bodies. Editor requests carry
    /// the source HTML and the generated HTML, JSON-escaped.
    pub fn body_limit(&self) -> usize {
        self.max_html_bytes.saturating_mul(3).saturating_add(64 * 1024)
    }
}
