use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde_json::json;
use tracing::{info, warn};

use crate::core::schema::FieldMap;
use crate::error::FailureKind;
use crate::oracle::prompt::{system_prompt, user_prompt};
use crate::oracle::response::parse_completion;
use crate::oracle::ExtractionOracle;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Request-level timeout, independent of the per-page OCR deadline.
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(30),
            max_tokens: 1000,
        }
    }
}

impl OracleConfig {
    /// Defaults plus the credential from the environment. A missing key is
    /// not an error here; it surfaces on the first call.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct OpenAiOracle {
    client: Client,
    config: OracleConfig,
}

impl OpenAiOracle {
    pub fn new(config: OracleConfig) -> Result<Self, FailureKind> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(config.timeout)
            .build()
            .map_err(|err| FailureKind::engine(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    fn request_body(&self, payload: &str) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_prompt() },
                { "role": "user", "content": user_prompt(payload) }
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0,
            "max_tokens": self.config.max_tokens
        })
    }
}

impl ExtractionOracle for OpenAiOracle {
    fn extract(&self, payload: &str) -> Result<FieldMap, FailureKind> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| FailureKind::unavailable(format!("{API_KEY_ENV} is not set")))?;
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let started = Instant::now();
        info!(model = %self.config.model, chars = payload.len(), "sending extraction request");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.request_body(payload))
            .send()
            .map_err(map_transport_error)?;

        let status = resp.status();
        let body = resp.text().map_err(map_transport_error)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            warn!(%status, elapsed_ms, "extraction request rejected");
            return Err(FailureKind::engine(format!(
                "oracle returned {status}: {}",
                preview(&body)
            )));
        }

        let fields = parse_completion(&body)?;
        info!(elapsed_ms, fields = fields.len(), "extraction response received");
        Ok(fields)
    }
}

fn map_transport_error(err: reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::engine(format!("oracle HTTP error: {err}"))
    }
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((pos, _)) => &body[..pos],
        None => body,
    }
}
