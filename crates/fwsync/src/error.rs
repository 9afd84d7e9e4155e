//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help
//! text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use fwsync_core::CoreError;
use fwsync_core::store::StoreError;

/// Exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PROVIDER: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(dead_code)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(fwsync::not_found),
        help("Run: fwsync {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Provider ─────────────────────────────────────────────────────

    #[error("Provider operation failed: {message}")]
    #[diagnostic(
        code(fwsync::provider),
        help(
            "The enforcement surface rejected the call. The local store was\n\
             left in its prior state; re-run the command once the provider\n\
             recovers, or run: fwsync reconcile run"
        )
    )]
    Provider { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(fwsync::configuration),
        help(
            "Check the [provider] table in your config file.\n\
             Find it with: fwsync config path"
        )
    )]
    Configuration { message: String },

    #[error(transparent)]
    #[diagnostic(code(fwsync::config))]
    Config(#[from] fwsync_config::ConfigError),

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fwsync::validation))]
    Validation { field: String, reason: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(fwsync::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Store / IO ───────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(fwsync::store))]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(fwsync::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Provider { .. } => exit_code::PROVIDER,
            Self::Configuration { .. } | Self::Config(_) => exit_code::CONFIG,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { id } => CliError::NotFound {
                resource_type: "firewall rule".into(),
                identifier: id.to_string(),
                list_command: "rules list".into(),
            },

            CoreError::Configuration { message } => CliError::Configuration { message },

            CoreError::Provider { message } => CliError::Provider { message },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
