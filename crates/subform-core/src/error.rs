//! Error types for the subscription form system
//!
//! Two families live here:
//! - [`Error`]: library and provider errors (configuration, HTTP, parsing)
//! - [`SubmitError`]: the user-facing outcome of a failed submission. Every
//!   variant is recovered inside the controller and surfaces as exactly one
//!   notification; its `Display` text is what the user reads.

use thiserror::Error;

/// Result type alias for subscription form operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown when the provider or the network fails without a usable reason
pub const GENERIC_NETWORK_ERROR: &str = "Network error. Please try again later.";

/// Core error type for the subscription form system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider answered with a non-success status
    #[error("Provider rejected request with status {status}: {}", .message.as_deref().unwrap_or("<no message>"))]
    Rejected {
        /// HTTP status code returned by the provider
        status: u16,
        /// Human-readable reason extracted from the response body, if any
        message: Option<String>,
    },

    /// Transport-level failure (connection refused/reset, malformed response)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider rejection
    pub fn rejected(status: u16, message: Option<String>) -> Self {
        Self::Rejected { status, message }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Why a submission did not result in a subscribed contact
///
/// The `Display` implementation yields the text shown in the notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Email is empty after trimming
    #[error("Please enter your email address.")]
    MissingEmail,

    /// Email does not look like `local@domain.tld`
    #[error("Please enter a valid email address.")]
    InvalidEmailFormat,

    /// No provider credential is configured
    #[error("The subscription service is not configured. Please try again later.")]
    ConfigurationError,

    /// The provider answered with a non-success status
    #[error("{}", .message.as_deref().unwrap_or(GENERIC_NETWORK_ERROR))]
    ProviderRejected {
        /// HTTP status code returned by the provider
        status: u16,
        /// Message from the provider's response body, used verbatim
        message: Option<String>,
    },

    /// Network or parse failure; `detail` is for logs only
    #[error("{}", GENERIC_NETWORK_ERROR)]
    TransportFailure {
        /// Diagnostic detail (never shown to the user)
        detail: String,
    },
}

impl SubmitError {
    /// Stable kind name, used in logs and events
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitError::MissingEmail => "missing_email",
            SubmitError::InvalidEmailFormat => "invalid_email_format",
            SubmitError::ConfigurationError => "configuration_error",
            SubmitError::ProviderRejected { .. } => "provider_rejected",
            SubmitError::TransportFailure { .. } => "transport_failure",
        }
    }

    /// Whether the failure happened before any request was sent
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SubmitError::MissingEmail
                | SubmitError::InvalidEmailFormat
                | SubmitError::ConfigurationError
        )
    }
}

impl From<Error> for SubmitError {
    fn from(err: Error) -> Self {
        match err {
            Error::Rejected { status, message } => SubmitError::ProviderRejected { status, message },
            Error::Config(_) => SubmitError::ConfigurationError,
            other => SubmitError::TransportFailure {
                detail: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_with_message_is_shown_verbatim() {
        let err = SubmitError::from(Error::rejected(400, Some("Contact already exists".into())));
        assert_eq!(err.to_string(), "Contact already exists");
        assert_eq!(err.kind(), "provider_rejected");
    }

    #[test]
    fn rejected_without_message_falls_back_to_generic_text() {
        let err = SubmitError::from(Error::rejected(502, None));
        assert_eq!(err.to_string(), GENERIC_NETWORK_ERROR);
    }

    #[test]
    fn transport_detail_is_not_user_visible() {
        let err = SubmitError::from(Error::transport("connection reset by peer"));
        assert_eq!(err.to_string(), GENERIC_NETWORK_ERROR);
        assert!(matches!(err, SubmitError::TransportFailure { ref detail } if detail.contains("reset")));
    }

    #[test]
    fn timeouts_and_json_errors_map_to_transport_failure() {
        assert_eq!(
            SubmitError::from(Error::timeout("after 30s")).kind(),
            "transport_failure"
        );
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(SubmitError::from(Error::from(json_err)).kind(), "transport_failure");
    }

    #[test]
    fn config_error_maps_to_configuration_error() {
        assert_eq!(
            SubmitError::from(Error::config("missing api key")),
            SubmitError::ConfigurationError
        );
        assert!(SubmitError::ConfigurationError.is_local());
        assert!(!SubmitError::from(Error::rejected(400, None)).is_local());
    }
}
