//! Error types for the agentready library.
//!
//! Structured error types that preserve context across the analysis
//! pipeline. Errors scoped to a single file or symbol are never raised;
//! they accumulate as warnings on the owning analyzer's result.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main result type for agentready operations.
pub type Result<T> = std::result::Result<T, ArsError>;

/// Comprehensive error type for all agentready operations.
#[derive(Error, Debug)]
pub enum ArsError {
    /// The scan root is missing, not a directory, or not a recognized project.
    #[error("invalid input at {path}: {message}")]
    InvalidInput {
        /// Offending path.
        path: PathBuf,
        /// Error description with a remediation hint.
        message: String,
    },

    /// A required parsing backend failed to initialize.
    #[error("toolchain unavailable for {language}: {message}")]
    ToolchainMissing {
        /// Language whose grammar could not be loaded.
        language: String,
        /// Error description.
        message: String,
    },

    /// Parsing and language processing errors.
    #[error("parse error in {language}: {message}")]
    Parse {
        /// Language being parsed.
        language: String,
        /// Error description.
        message: String,
        /// File where the error occurred, if known.
        file_path: Option<String>,
    },

    /// A category analyzer failed outright.
    #[error("analyzer {category} failed: {message}")]
    Analysis {
        /// Category id, e.g. `C1`.
        category: String,
        /// Error description.
        message: String,
    },

    /// Analysis pipeline errors.
    #[error("pipeline error at stage '{stage}': {message}")]
    Pipeline {
        /// Pipeline stage where the error occurred.
        stage: String,
        /// Error description.
        message: String,
    },

    /// The run was cancelled before completion.
    #[error("analysis cancelled")]
    Cancelled,

    /// I/O related errors.
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Error description.
        message: String,
        /// Configuration field that caused the error.
        field: Option<String>,
    },

    /// Serialization/deserialization errors.
    #[error("serialization error: {message}")]
    Serialization {
        /// Error description.
        message: String,
        /// Underlying serialization error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic internal errors.
    #[error("internal error: {message}")]
    Internal {
        /// Error description.
        message: String,
    },
}

impl ArsError {
    /// Create a new invalid-input error.
    pub fn invalid_input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new toolchain-missing error.
    pub fn toolchain(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolchainMissing {
            language: language.into(),
            message: message.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            language: language.into(),
            message: message.into(),
            file_path: None,
        }
    }

    /// Create a new parse error with file context.
    pub fn parse_in_file(
        language: impl Into<String>,
        message: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self::Parse {
            language: language.into(),
            message: message.into(),
            file_path: Some(file_path.into()),
        }
    }

    /// Create a new analyzer error.
    pub fn analysis(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analysis {
            category: category.into(),
            message: message.into(),
        }
    }

    /// Create a new pipeline error.
    pub fn pipeline(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error with context.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context.
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True when this error is the terminal cancellation condition.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<io::Error> for ArsError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for ArsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for ArsError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML serialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<git2::Error> for ArsError {
    fn from(err: git2::Error) -> Self {
        Self::Internal {
            message: format!("git operation failed: {err}"),
        }
    }
}
