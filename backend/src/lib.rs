//! # Fieldmap - CSV contact import with column mapping
//!
//! Fieldmap reads a comma-separated file, lets the user map its columns onto
//! four contact fields (name, email, phone, address), validates the mapped
//! records as a whole and posts them to a remote endpoint as one JSON array.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│   Mapping   │────▶│ Validation  │────▶│   Submit    │
//! │  (any enc)  │     │ (tokenizer) │     │ (+ project) │     │ (all or 0)  │     │ (JSON POST) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fieldmap::{map_file, Config, FieldMapping, Submitter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let mapping = FieldMapping { name: "name".into(), email: "email".into(), ..Default::default() };
//!     let result = map_file("contacts.csv", &mapping, config.max_file_size).await?;
//!     let outcome = Submitter::from_config(&config)?.submit(&result.dataset).await;
//!     println!("{}", outcome);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per pipeline stage
//! - [`models`] - Domain models (RawTable, FieldMapping, Record, Dataset)
//! - [`config`] - Environment configuration
//! - [`parser`] - Decoding and tokenizing
//! - [`mapping`] - Field mapping editor
//! - [`transform`] - Projection and the one-shot pipeline
//! - [`validation`] - Batch and live checks
//! - [`submit`] - Outbound HTTP submission
//! - [`session`] - Interactive session state
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Mapping and transformation
pub mod mapping;
pub mod transform;

// Validation
pub mod validation;

// Submission
pub mod submit;

// Session state
pub mod session;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    ImportError,
    MappingError,
    PipelineError,
    ServerError,
    SubmitError,
    ValidationError,
};

// =============================================================================
// Re-exports - Models and config
// =============================================================================

pub use config::Config;
pub use models::{
    Dataset,
    Feedback,
    FeedbackKind,
    FieldMapping,
    LogicalField,
    RawTable,
    Record,
    SubmissionOutcome,
};

// =============================================================================
// Re-exports - Pipeline stages
// =============================================================================

pub use mapping::{set_mapping, FieldMapper};
pub use parser::{decode_bytes, decode_content, detect_encoding, parse_bytes, parse_file, read_file, tokenize, ParseResult};
pub use transform::{bind_mapping, map_bytes, map_file, map_text, project, MappedImport, TableInfo};
pub use validation::{check_column, is_valid_email, validate, LiveIssue, LiveIssueKind};

// =============================================================================
// Re-exports - Submission and session
// =============================================================================

pub use session::{Session, SubmissionReport, SubmitTicket};
pub use submit::Submitter;

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, PreviewCard, SessionView};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
