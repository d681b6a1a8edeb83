//! Caller side of the generation backend
//!
//! Wraps the action contract in typed methods and validates the returned text
//! with [`decode_text`] before handing structures back.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::service::{BackendResponse, LlmService};
use crate::extract::{DEFAULT_MAX_NESTING, ExtractionError, decode_text};
use crate::models::{DestinationSuggestion, ItineraryDay, TripRequest};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The backend itself could not be reached
    #[error("backend request failed: {0}")]
    Transport(String),

    /// The backend answered `success: false`
    #[error("{0}")]
    Backend(String),

    /// The answer text did not have the requested shape
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Something that answers backend action requests
#[async_trait]
pub trait Backend: Send + Sync {
    async fn call(&self, request: Value) -> Result<BackendResponse, ClientError>;
}

/// Backend reached over HTTP at `POST {url}`
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpBackend {
    pub fn new<S: Into<String>>(url: S, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "Failed to create HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn call(&self, request: Value) -> Result<BackendResponse, ClientError> {
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!("HTTP {status}")));
        }

        response
            .json::<BackendResponse>()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }
}

/// Same-process backend, no HTTP hop
#[async_trait]
impl Backend for LlmService {
    async fn call(&self, request: Value) -> Result<BackendResponse, ClientError> {
        Ok(self.handle(&request).await)
    }
}

pub struct LlmClient<B> {
    backend: B,
    max_nesting: usize,
}

impl<B: Backend> LlmClient<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }

    #[must_use]
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting.max(1);
        self
    }

    async fn request(&self, action: &str, mut fields: Value) -> Result<String, ClientError> {
        if let Some(map) = fields.as_object_mut() {
            map.insert("action".to_string(), Value::String(action.to_string()));
        }

        let response = self.backend.call(fields).await?;
        match response {
            BackendResponse {
                success: true,
                content: Some(content),
                ..
            } => Ok(content),
            BackendResponse { error, .. } => {
                let message = error.unwrap_or_else(|| "Contenuto vuoto nella risposta".to_string());
                warn!("Backend action '{}' failed: {}", action, message);
                Err(ClientError::Backend(message))
            }
        }
    }

    async fn request_decoded<T: DeserializeOwned>(
        &self,
        action: &str,
        fields: Value,
    ) -> Result<T, ClientError> {
        let content = self.request(action, fields).await?;
        debug!("Decoding '{}' answer", action);
        Ok(decode_text(&content, self.max_nesting)?)
    }

    /// Example input: "Voglio andare a Parigi 5 giorni con 600€"
    #[instrument(skip(self))]
    pub async fn parse_trip(&self, text: &str) -> Result<TripRequest, ClientError> {
        self.request_decoded("parse", json!({ "text": text })).await
    }

    #[instrument(skip(self))]
    pub async fn suggest_destinations(
        &self,
        travelers: u32,
        nights: u32,
        budget: f64,
        preferences: &str,
    ) -> Result<Vec<DestinationSuggestion>, ClientError> {
        self.request_decoded(
            "suggest",
            json!({
                "travelers": travelers,
                "nights": nights,
                "budget": budget,
                "preferences": preferences,
            }),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn create_itinerary(
        &self,
        destination: &str,
        nights: u32,
        preferences: &str,
    ) -> Result<Vec<ItineraryDay>, ClientError> {
        self.request_decoded(
            "itinerary",
            json!({
                "destination": destination,
                "nights": nights,
                "preferences": preferences,
            }),
        )
        .await
    }

    pub async fn describe_package(
        &self,
        destination: &str,
        nights: u32,
        budget: f64,
        accommodation: &str,
    ) -> Result<String, ClientError> {
        self.request(
            "describe",
            json!({
                "destination": destination,
                "nights": nights,
                "budget": budget,
                "accommodation": accommodation,
            }),
        )
        .await
    }

    pub async fn ask_question(&self, question: &str, context: &str) -> Result<String, ClientError> {
        self.request("question", json!({ "question": question, "context": context }))
            .await
    }

    /// Whether a trivial question gets an answer
    pub async fn check_health(&self) -> bool {
        self.ask_question("test", "").await.is_ok()
    }
}
