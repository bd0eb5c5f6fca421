//! CLI error types with exit code handling
//!
//! Library errors are mapped onto a small set of diagnostics, each with its
//! own exit code.

use edgectl_control::ControlError;
use edgectl_core::MapperError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// The distribution configuration is invalid
    #[error("Validation failed: {message}")]
    #[diagnostic(code(edgectl::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The control plane rejected a request
    #[error("{message}")]
    #[diagnostic(code(edgectl::cli::api))]
    Api {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(
        code(edgectl::cli::not_found),
        help("run `edgectl apply` to recreate it")
    )]
    NotFound { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(edgectl::cli::timeout),
        help("the change was accepted; check progress with `edgectl status`")
    )]
    Timeout { message: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(edgectl::cli::config))]
    Config { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(edgectl::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(edgectl::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Api { .. } => exit_codes::ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Timeout { .. } => exit_codes::TIMEOUT,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a validation error with help text
    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<MapperError> for CliError {
    fn from(err: MapperError) -> Self {
        match err {
            MapperError::Validation { violations } => CliError::Validation {
                message: format!("{} problem(s) in the distribution configuration", violations.len()),
                help: Some(
                    violations
                        .iter()
                        .map(|v| format!("- {v}"))
                        .collect::<Vec<_>>()
                        .join("\n"),
                ),
            },
            MapperError::Io(e) => CliError::from(e),
            other => CliError::Validation {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

impl From<ControlError> for CliError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::Validation(e) => CliError::from(e),
            ControlError::NotFound { .. } => CliError::not_found(err.to_string()),
            ControlError::DeploymentTimeout { .. } => CliError::Timeout {
                message: err.to_string(),
            },
            ControlError::InvalidConfig(message) => CliError::Config { message },
            ControlError::Io(e) => CliError::from(e),
            ControlError::Api { ref source, .. } => {
                let help = source
                    .status
                    .map(|status| format!("the control plane answered with HTTP {status}"));
                CliError::Api {
                    message: err.to_string(),
                    help,
                }
            }
            other => CliError::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<miette::Report> for CliError {
    fn from(err: miette::Report) -> Self {
        CliError::Other {
            message: format!("{:?}", err),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
