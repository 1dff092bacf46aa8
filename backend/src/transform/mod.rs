//! Transformation module.
//!
//! This module turns parsed rows into target records:
//! - Projector: applies a field mapping to every row
//! - Pipeline: tokenize, project and validate in one call

pub mod pipeline;
pub mod projector;

pub use pipeline::*;
pub use projector::project;
