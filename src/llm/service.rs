//! Server side of the generation backend: one chat-completion call per action

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use super::prompts::{Action, Prompt};
use crate::config::BackendConfig;
use crate::credentials;
use crate::error::ErrorKind;
use crate::extract::{HttpOutcome, ResponseExtractor};

const PROVIDER: &str = "OpenRouter";
const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 1000;

/// Reply of the backend call contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    /// Raw upstream body kept for diagnostics on a non-success status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl BackendResponse {
    #[must_use]
    pub fn ok(content: String, usage: Option<Value>) -> Self {
        Self {
            success: true,
            content: Some(content),
            error: None,
            usage,
            response: None,
        }
    }

    pub fn failure<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            content: None,
            error: Some(error.into()),
            usage: None,
            response: None,
        }
    }

    fn from_kind(kind: &ErrorKind, raw: Option<String>) -> Self {
        let mut response = Self::failure(kind.wire_message());
        if matches!(kind, ErrorKind::UpstreamStatus(_)) {
            response.response = raw;
        }
        response
    }
}

/// Calls the chat-completions endpoint and runs the answer through the
/// [`ResponseExtractor`]
#[derive(Debug)]
pub struct LlmService {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    extractor: ResponseExtractor,
}

impl LlmService {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        let api_key = credentials::configured(config.api_key.as_deref()).map(str::to_string);
        if api_key.is_none() {
            warn!("{} API key not configured, every action will fail", PROVIDER);
        }

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            extractor: ResponseExtractor::new(),
        })
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Dispatch one raw request body
    #[instrument(skip_all)]
    pub async fn handle(&self, request: &Value) -> BackendResponse {
        match Action::from_request(request) {
            Ok(action) => self.run(&action).await,
            Err(message) => BackendResponse::failure(message),
        }
    }

    #[instrument(skip(self), fields(action = action.name()))]
    pub async fn run(&self, action: &Action) -> BackendResponse {
        self.complete(&action.prompt()).await
    }

    /// Send one system/user prompt pair
    pub async fn complete(&self, prompt: &Prompt) -> BackendResponse {
        let Some(api_key) = self.api_key.as_deref() else {
            return BackendResponse::from_kind(&ErrorKind::credentials_missing(PROVIDER), None);
        };

        let outcome = self.send(api_key, prompt).await;
        let result = self.extractor.extract(outcome);

        if result.succeeded() {
            let usage = result.usage().cloned();
            if let Some(tokens) = usage.as_ref().and_then(|u| u.get("total_tokens")) {
                debug!("Completion used {} tokens", tokens);
            }
            let content = result.raw_text().unwrap_or_default().to_string();
            info!("Completion succeeded ({} chars)", content.len());
            return BackendResponse::ok(content, usage);
        }

        let raw = result.raw_text().map(str::to_string);
        let kind = result.failure_reason().cloned().unwrap_or(ErrorKind::EmptyContent);
        warn!("Completion failed: {}", kind);
        BackendResponse::from_kind(&kind, raw)
    }

    async fn send(&self, api_key: &str, prompt: &Prompt) -> HttpOutcome {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        debug!("POST {} with model {}", self.endpoint, self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("HTTP-Referer", "http://localhost")
            .header("X-Title", "CreaViaggi")
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => return HttpOutcome::TransportError(e.to_string()),
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => HttpOutcome::Response { status, body },
            Err(e) => HttpOutcome::TransportError(e.to_string()),
        }
    }
}
