//! Runtime settings, read from the environment.
//!
//! Recognized variables (all optional):
//! - `LLM_BASE_URL`: OpenAI-compatible endpoint, default `http://localhost:1234/v1`
//! - `LLM_MODEL`: model identifier, default `qwen/qwen3-4b`
//! - `LLM_API_KEY`: bearer token, default `none`
//! - `DATA_SERVICE_URL`: order/trip service, default `http://localhost:8002`
//! - `HTTP_TIMEOUT_SECONDS`: per-call timeout for HTTP collaborators, default 15
//! - `FAQ_DATA_PATH`: JSON file of `{question, answer}` entries, default `faq_data.json`

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_api_key: String,
    pub data_service_url: String,
    pub http_timeout: Duration,
    pub faq_data_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_base_url: "http://localhost:1234/v1".into(),
            llm_model: "qwen/qwen3-4b".into(),
            llm_api_key: "none".into(),
            data_service_url: "http://localhost:8002".into(),
            http_timeout: Duration::from_secs(15),
            faq_data_path: PathBuf::from("faq_data.json"),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let timeout_secs = parse_or(lookup("HTTP_TIMEOUT_SECONDS"), defaults.http_timeout.as_secs_f64());
        let http_timeout = Duration::try_from_secs_f64(timeout_secs.max(0.1)).unwrap_or(defaults.http_timeout);

        Self {
            llm_base_url: lookup("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_model: lookup("LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_api_key: lookup("LLM_API_KEY").unwrap_or(defaults.llm_api_key),
            data_service_url: lookup("DATA_SERVICE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.data_service_url),
            http_timeout,
            faq_data_path: lookup("FAQ_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.faq_data_path),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}
