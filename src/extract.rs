//! Free-text response extraction
//!
//! Turns a chat-completion response into usable text and, where the model
//! embedded one, a decoded JSON payload. Every path ends in either a success
//! or a tagged [`ErrorKind`] with the offending text attached:
//!
//! 1. transport failure → `ConnectionFailed`
//! 2. non-success status → `UpstreamStatus` (body kept, not parsed)
//! 3. no `choices[0].message` object → `MalformedResponse`
//! 4. content strategies tried in order; none yields text → `EmptyContent`
//! 5. text that is not JSON as a whole is replaced by its first balanced
//!    `{...}` span when that decodes
//!
//! [`decode_text`] is the caller-side final validation.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ErrorKind;

/// Outer object plus one nested level
pub const DEFAULT_MAX_NESTING: usize = 2;

/// Raw outcome of one HTTP exchange with the backend
#[derive(Debug, Clone, PartialEq)]
pub enum HttpOutcome {
    TransportError(String),
    Response { status: u16, body: String },
}

/// Picks the answer text out of a completion message
pub trait ContentStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Non-empty text from `message`, if this strategy applies
    fn select<'a>(&self, message: &'a Value) -> Option<&'a str>;
}

/// Reads a top-level string field of the message
#[derive(Debug, Clone)]
pub struct FieldStrategy {
    field: String,
}

impl FieldStrategy {
    pub fn new<S: Into<String>>(field: S) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl ContentStrategy for FieldStrategy {
    fn name(&self) -> &str {
        &self.field
    }

    fn select<'a>(&self, message: &'a Value) -> Option<&'a str> {
        message
            .get(&self.field)
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
    }
}

/// Result of processing one backend response. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    succeeded: bool,
    structured_payload: Option<Value>,
    raw_text: Option<String>,
    failure_reason: Option<ErrorKind>,
    usage: Option<Value>,
}

impl ExtractionResult {
    fn success(text: String, payload: Option<Value>, usage: Option<Value>) -> Self {
        Self {
            succeeded: true,
            structured_payload: payload,
            raw_text: Some(text),
            failure_reason: None,
            usage,
        }
    }

    fn failure(reason: ErrorKind, raw_text: Option<String>) -> Self {
        Self {
            succeeded: false,
            structured_payload: None,
            raw_text,
            failure_reason: Some(reason),
            usage: None,
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Decoded JSON found in the answer, if any
    #[must_use]
    pub fn structured_payload(&self) -> Option<&Value> {
        self.structured_payload.as_ref()
    }

    /// The answer text on success, or the diagnostic text on failure
    #[must_use]
    pub fn raw_text(&self) -> Option<&str> {
        self.raw_text.as_deref()
    }

    #[must_use]
    pub fn failure_reason(&self) -> Option<&ErrorKind> {
        self.failure_reason.as_ref()
    }

    /// Token usage reported by the upstream
    #[must_use]
    pub fn usage(&self) -> Option<&Value> {
        self.usage.as_ref()
    }

    /// The answer text, or the failure with its diagnostic text
    pub fn into_text(self) -> Result<String, ExtractionError> {
        match (self.succeeded, self.raw_text) {
            (true, Some(text)) => Ok(text),
            (_, raw_text) => Err(ExtractionError::new(
                self.failure_reason.unwrap_or(ErrorKind::EmptyContent),
                raw_text,
            )),
        }
    }
}

/// Caller-side failure: the reason plus the text that could not be used
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{reason}")]
pub struct ExtractionError {
    pub reason: ErrorKind,
    pub raw_text: Option<String>,
}

impl ExtractionError {
    #[must_use]
    pub fn new(reason: ErrorKind, raw_text: Option<String>) -> Self {
        Self { reason, raw_text }
    }
}

/// Ordered content strategies plus the brace-scanner nesting limit
pub struct ResponseExtractor {
    strategies: Vec<Box<dyn ContentStrategy>>,
    max_nesting: usize,
}

impl Default for ResponseExtractor {
    /// `content` first, then the `reasoning` trace some models fill instead
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(FieldStrategy::new("content")),
                Box::new(FieldStrategy::new("reasoning")),
            ],
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

impl std::fmt::Debug for ResponseExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseExtractor")
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("max_nesting", &self.max_nesting)
            .finish()
    }
}

impl ResponseExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy tried after the existing ones
    #[must_use]
    pub fn with_strategy(mut self, strategy: Box<dyn ContentStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    #[must_use]
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting.max(1);
        self
    }

    #[must_use]
    pub fn max_nesting(&self) -> usize {
        self.max_nesting
    }

    /// Run the full state machine over one HTTP exchange
    #[must_use]
    pub fn extract(&self, outcome: HttpOutcome) -> ExtractionResult {
        match outcome {
            HttpOutcome::TransportError(message) => {
                warn!("Backend transport failure: {}", message);
                ExtractionResult::failure(ErrorKind::ConnectionFailed(message), None)
            }
            HttpOutcome::Response { status, body } if !(200..300).contains(&status) => {
                warn!("Backend returned HTTP {}", status);
                ExtractionResult::failure(ErrorKind::UpstreamStatus(status), Some(body))
            }
            HttpOutcome::Response { body, .. } => self.extract_body(&body),
        }
    }

    /// Steps 3 to 5 on a successful response body
    #[must_use]
    pub fn extract_body(&self, body: &str) -> ExtractionResult {
        let Ok(document) = serde_json::from_str::<Value>(body) else {
            return ExtractionResult::failure(ErrorKind::MalformedResponse, Some(body.to_string()));
        };

        let Some(message) = document
            .pointer("/choices/0/message")
            .filter(|message| message.is_object())
        else {
            return ExtractionResult::failure(ErrorKind::MalformedResponse, Some(body.to_string()));
        };

        let Some((strategy, text)) = self
            .strategies
            .iter()
            .find_map(|strategy| strategy.select(message).map(|text| (strategy, text)))
        else {
            return ExtractionResult::failure(ErrorKind::EmptyContent, Some(message.to_string()));
        };
        debug!("Selected answer text from '{}'", strategy.name());

        let usage = document.get("usage").filter(|u| !u.is_null()).cloned();

        let trimmed = text.trim();
        if let Ok(whole) = serde_json::from_str::<Value>(trimmed)
            && (whole.is_object() || whole.is_array())
        {
            return ExtractionResult::success(trimmed.to_string(), Some(whole), usage);
        }

        match recover_embedded_json(text, self.max_nesting) {
            Some((json, payload)) => {
                ExtractionResult::success(json.to_string(), Some(payload), usage)
            }
            None => ExtractionResult::success(text.trim().to_string(), None, usage),
        }
    }
}

/// First balanced `open ... close` span in `text` whose nesting never exceeds
/// `max_depth`. Brackets inside JSON string literals are ignored. A candidate
/// that nests too deep is abandoned and scanning resumes at the next opener.
#[must_use]
pub fn find_balanced(text: &str, open: char, close: char, max_depth: usize) -> Option<&str> {
    let max_depth = max_depth.max(1);

    'candidates: for (start, _) in text.match_indices(open) {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (offset, c) in text[start..].char_indices() {
            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }

            if c == '"' {
                in_string = true;
            } else if c == open {
                depth += 1;
                if depth > max_depth {
                    continue 'candidates;
                }
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
        }
    }

    None
}

/// First balanced `{...}` object within the nesting limit
#[must_use]
pub fn find_json_object(text: &str, max_depth: usize) -> Option<&str> {
    find_balanced(text, '{', '}', max_depth)
}

/// Embedded JSON object that also decodes
fn recover_embedded_json(text: &str, max_depth: usize) -> Option<(&str, Value)> {
    let candidate = find_json_object(text, max_depth)?;
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => Some((candidate, value)),
        Err(e) => {
            debug!("Embedded JSON candidate did not decode: {}", e);
            None
        }
    }
}

/// Caller-side validation of answer text into `T`.
///
/// Tries a direct decode of the whole text, then the first embedded object,
/// then the first embedded array, before giving up with `InvalidFormat`.
pub fn decode_text<T: DeserializeOwned>(
    text: &str,
    max_depth: usize,
) -> Result<T, ExtractionError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Ok(value);
    }

    let embedded = [
        find_balanced(trimmed, '{', '}', max_depth),
        find_balanced(trimmed, '[', ']', max_depth),
    ];
    for candidate in embedded.into_iter().flatten() {
        if let Ok(value) = serde_json::from_str::<T>(candidate) {
            return Ok(value);
        }
        warn!("Extracted JSON is not valid for the expected shape: {}", candidate);
    }

    warn!("Response does not contain valid JSON: {}", trimmed);
    Err(ExtractionError::new(
        ErrorKind::InvalidFormat,
        Some(text.to_string()),
    ))
}
