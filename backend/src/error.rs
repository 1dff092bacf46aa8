//! Error types for the Fieldmap import pipeline.
//!
//! One enum per pipeline stage:
//!
//! - [`ImportError`] - reading and decoding the source file
//! - [`MappingError`] - editing the field mapping
//! - [`ValidationError`] - required mappings, email format, live column checks
//! - [`SubmitError`] - the outbound request
//! - [`ConfigError`] - environment configuration
//! - [`PipelineError`] - top-level orchestration
//! - [`ServerError`] - HTTP surface
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across stage boundaries.

use thiserror::Error;

use crate::validation::LiveIssue;

// =============================================================================
// Import Errors
// =============================================================================

/// Errors while reading a source file into a table.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Content could not be decoded as text.
    #[error("Failed to decode file: {0}")]
    Encoding(String),

    /// Multipart upload could not be received.
    #[error("Failed to receive upload: {0}")]
    Upload(String),

    /// File exceeds the configured size limit.
    #[error("File is too large ({size} bytes, limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    /// No parsable lines.
    #[error("The file contains no data")]
    EmptyInput,

    /// Another import is still being read.
    #[error("An import is already in progress")]
    ImportInProgress,
}

// =============================================================================
// Mapping Errors
// =============================================================================

/// Errors while editing the field mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// Not one of name, email, phone, address.
    #[error("Unknown field '{0}' (expected name, email, phone or address)")]
    UnknownField(String),

    /// Header not present in the current table.
    #[error("Column '{0}' does not exist in the imported file")]
    UnknownHeader(String),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors raised when turning candidate records into a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `name` or `email` is not mapped.
    #[error("'name' and 'email' fields must be mapped.")]
    MissingRequiredMapping,

    /// At least one record carries a malformed email.
    #[error("Some email addresses in the CSV are invalid (first at row {row}: \"{value}\").")]
    InvalidEmailFormat { row: usize, value: String },

    /// The live per-column check reported a blocking issue.
    #[error("{0}")]
    EmptyOrMalformedFieldLive(LiveIssue),
}

// =============================================================================
// Submission Errors
// =============================================================================

/// Errors from the submission step.
///
/// The `Display` text is the short reason carried by a failed outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Dataset is empty, nothing was sent.
    #[error("no data")]
    NoDataToSubmit,

    /// Endpoint answered outside 200-299.
    #[error("request rejected")]
    RequestRejected { status: u16 },

    /// Connection, timeout or other transport fault.
    #[error("transport error")]
    TransportError(String),

    /// A submission is already in flight.
    #[error("submission already in progress")]
    SubmissionInProgress,
}

impl SubmitError {
    /// Longer description including the status code or transport detail.
    pub fn detail(&self) -> String {
        match self {
            Self::RequestRejected { status } => format!("request rejected (HTTP {})", status),
            Self::TransportError(cause) => format!("transport error: {}", cause),
            other => other.to_string(),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Endpoint is not an absolute http(s) URL.
    #[error("Invalid endpoint URL '{url}': {message}")]
    InvalidEndpoint { url: String, message: String },

    /// A numeric variable did not parse.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    /// The outbound HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::map_file`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Import error.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Mapping error.
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Submission error.
    #[error("Submission failed: {}", .0.detail())]
    Submit(#[from] SubmitError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Failed to bind or serve.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
