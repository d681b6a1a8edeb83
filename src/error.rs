//! Error types and handling for the CreaViaggi integration core

use thiserror::Error;

/// Failure kinds reported by the external-data integrations.
///
/// Cache misses and throttle waits are not errors; these only describe
/// upstream calls and model output that could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport-level failure, nothing was received
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Upstream answered with a non-success HTTP status
    #[error("upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    /// Response body did not have the expected shape
    #[error("malformed upstream response")]
    MalformedResponse,

    /// Both content and reasoning fields were empty
    #[error("empty content in upstream response")]
    EmptyContent,

    /// Text could not be turned into the requested structure
    #[error("response is not in the expected format")]
    InvalidFormat,

    /// Provider credentials are absent or a placeholder
    #[error("credentials missing for {provider}")]
    CredentialsMissing { provider: String },

    /// Upstream rejected the call with HTTP 429
    #[error("rate limited by {provider}")]
    RateLimited { provider: String },
}

impl ErrorKind {
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::ConnectionFailed(message.into())
    }

    pub fn credentials_missing<S: Into<String>>(provider: S) -> Self {
        Self::CredentialsMissing {
            provider: provider.into(),
        }
    }

    pub fn rate_limited<S: Into<String>>(provider: S) -> Self {
        Self::RateLimited {
            provider: provider.into(),
        }
    }

    /// Classify a non-success HTTP status from `provider`
    #[must_use]
    pub fn from_status(provider: &str, status: u16) -> Self {
        if status == 429 {
            Self::rate_limited(provider)
        } else {
            Self::UpstreamStatus(status)
        }
    }

    /// Message sent back over the backend wire contract
    #[must_use]
    pub fn wire_message(&self) -> String {
        match self {
            ErrorKind::ConnectionFailed(detail) => format!("Errore connessione: {detail}"),
            ErrorKind::UpstreamStatus(code) => format!("Errore API (HTTP {code})"),
            ErrorKind::MalformedResponse => "Risposta API non valida".to_string(),
            ErrorKind::EmptyContent => "Contenuto vuoto nella risposta".to_string(),
            ErrorKind::InvalidFormat => "Formato risposta non valido".to_string(),
            ErrorKind::CredentialsMissing { provider } => {
                format!("API key {provider} non configurata")
            }
            ErrorKind::RateLimited { provider } => {
                format!("Limite richieste superato per {provider}")
            }
        }
    }
}

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum TravelError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// External integration errors
    #[error("Integration error: {0}")]
    Integration(#[from] ErrorKind),

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TravelError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// The integration failure kind, if this is one
    #[must_use]
    pub fn kind(&self) -> Option<&ErrorKind> {
        match self {
            TravelError::Integration(kind) => Some(kind),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TravelError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            TravelError::Validation { message } => format!("Invalid input: {message}"),
            TravelError::Integration(ErrorKind::RateLimited { .. }) => {
                "The service is busy right now. Please try again in a minute.".to_string()
            }
            TravelError::Integration(ErrorKind::CredentialsMissing { .. }) => {
                "This service is not configured. Showing approximate results instead.".to_string()
            }
            TravelError::Integration(ErrorKind::ConnectionFailed(_)) => {
                "Unable to connect to external services. Please check your internet connection."
                    .to_string()
            }
            TravelError::Integration(_) => {
                "The assistant returned an unexpected answer. Please try again.".to_string()
            }
            TravelError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for TravelError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            TravelError::Integration(ErrorKind::UpstreamStatus(status.as_u16()))
        } else if err.is_decode() {
            TravelError::Integration(ErrorKind::MalformedResponse)
        } else {
            TravelError::Integration(ErrorKind::ConnectionFailed(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = TravelError::config("missing API key");
        assert!(matches!(config_err, TravelError::Config { .. }));

        let validation_err = TravelError::validation("invalid coordinates");
        assert!(matches!(validation_err, TravelError::Validation { .. }));

        let integration: TravelError = ErrorKind::EmptyContent.into();
        assert_eq!(integration.kind(), Some(&ErrorKind::EmptyContent));
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            ErrorKind::from_status("nominatim", 429),
            ErrorKind::rate_limited("nominatim")
        );
        assert_eq!(
            ErrorKind::from_status("nominatim", 503),
            ErrorKind::UpstreamStatus(503)
        );
    }

    #[test]
    fn test_wire_messages() {
        assert_eq!(
            ErrorKind::credentials_missing("OpenRouter").wire_message(),
            "API key OpenRouter non configurata"
        );
        assert_eq!(
            ErrorKind::UpstreamStatus(502).wire_message(),
            "Errore API (HTTP 502)"
        );
        assert!(
            ErrorKind::connection("refused")
                .wire_message()
                .starts_with("Errore connessione")
        );
    }

    #[test]
    fn test_user_messages() {
        let config_err = TravelError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let rate_limited: TravelError = ErrorKind::rate_limited("nominatim").into();
        assert!(rate_limited.user_message().contains("try again"));

        let validation_err = TravelError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let travel_err: TravelError = io_err.into();
        assert!(matches!(travel_err, TravelError::Io { .. }));
    }
}
