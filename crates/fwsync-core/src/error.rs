// ── Core error types ──
//
// Consumers never see HTTP status codes or JSON parse failures directly;
// the `From<fwsync_api::Error>` impl translates wire-layer errors into
// domain-appropriate variants. Drift is NOT an error -- it is the `failed`
// sync status, a queryable outcome.

use thiserror::Error;
use uuid::Uuid;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Required target resource id or credentials missing. Not retried;
    /// surfaces on mutation, degrades rules to `not_applicable` during
    /// reconciliation.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Failure returned by the enforcement surface. Not retried.
    #[error("Provider error: {message}")]
    Provider { message: String },

    /// Rule id absent in the store; independent of provider state.
    #[error("Rule not found: {id}")]
    NotFound { id: Uuid },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<fwsync_api::Error> for CoreError {
    fn from(err: fwsync_api::Error) -> Self {
        match err {
            fwsync_api::Error::InvalidApiKey => CoreError::Configuration {
                message: "provider rejected the API key".into(),
            },
            fwsync_api::Error::InvalidUrl(e) => CoreError::Configuration {
                message: format!("invalid endpoint URL: {e}"),
            },
            fwsync_api::Error::Tls(msg) => CoreError::Configuration {
                message: format!("TLS setup failed: {msg}"),
            },
            other => CoreError::Provider {
                message: other.to_string(),
            },
        }
    }
}
