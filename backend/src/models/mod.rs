//! Domain models for the Fieldmap pipeline.
//!
//! This module contains the core data structures passed between stages:
//!
//! - [`RawTable`] - Headers and rows as read from the source file
//! - [`LogicalField`] - The closed set of target fields
//! - [`FieldMapping`] - Target field to source header association
//! - [`Record`] - One fixed-shape target record
//! - [`Dataset`] - Validated records, ready for submission
//! - [`SubmissionOutcome`] - State of the most recent submit attempt
//! - [`Feedback`] - The single-line user message

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MappingError, SubmitError};

// =============================================================================
// Raw Table
// =============================================================================

/// Headers and data rows of an imported file.
///
/// Rows are not padded: a row may be shorter or longer than `headers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    /// Source column names, trimmed, in file order (duplicates kept).
    pub headers: Vec<String>,
    /// Data rows, each cell trimmed.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// True when the source had no non-blank line at all.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Index of the first column named `header`.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell value, or `""` when the row is shorter than `index`.
    pub fn cell(row: &[String], index: usize) -> &str {
        row.get(index).map(String::as_str).unwrap_or("")
    }
}

// =============================================================================
// Logical Field
// =============================================================================

/// Target attribute that source columns are mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalField {
    Name,
    Email,
    Phone,
    Address,
}

impl LogicalField {
    /// All fields in editor order.
    pub const ALL: [LogicalField; 4] = [Self::Name, Self::Email, Self::Phone, Self::Address];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
        }
    }

    /// Name and email must be mapped before a dataset can be committed.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Name | Self::Email)
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalField {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "address" => Ok(Self::Address),
            _ => Err(MappingError::UnknownField(s.to_string())),
        }
    }
}

// =============================================================================
// Field Mapping
// =============================================================================

/// Source header chosen for each logical field.
///
/// An empty string means the field is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl FieldMapping {
    /// Mapped header, or `None` when unset.
    pub fn get(&self, field: LogicalField) -> Option<&str> {
        let header = self.slot(field);
        if header.is_empty() {
            None
        } else {
            Some(header.as_str())
        }
    }

    pub fn is_mapped(&self, field: LogicalField) -> bool {
        self.get(field).is_some()
    }

    /// Replace one entry; an empty `header` unmaps the field.
    pub fn set(&mut self, field: LogicalField, header: impl Into<String>) {
        *self.slot_mut(field) = header.into();
    }

    /// Required fields that are still unset.
    pub fn missing_required(&self) -> Vec<LogicalField> {
        LogicalField::ALL
            .into_iter()
            .filter(|f| f.is_required() && !self.is_mapped(*f))
            .collect()
    }

    fn slot(&self, field: LogicalField) -> &String {
        match field {
            LogicalField::Name => &self.name,
            LogicalField::Email => &self.email,
            LogicalField::Phone => &self.phone,
            LogicalField::Address => &self.address,
        }
    }

    fn slot_mut(&mut self, field: LogicalField) -> &mut String {
        match field {
            LogicalField::Name => &mut self.name,
            LogicalField::Email => &mut self.email,
            LogicalField::Phone => &mut self.phone,
            LogicalField::Address => &mut self.address,
        }
    }
}

// =============================================================================
// Record
// =============================================================================

/// One target entity, serialized with exactly four string keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl Record {
    pub fn get(&self, field: LogicalField) -> &str {
        match field {
            LogicalField::Name => &self.name,
            LogicalField::Email => &self.email,
            LogicalField::Phone => &self.phone,
            LogicalField::Address => &self.address,
        }
    }

    pub fn set(&mut self, field: LogicalField, value: impl Into<String>) {
        let value = value.into();
        match field {
            LogicalField::Name => self.name = value,
            LogicalField::Email => self.email = value,
            LogicalField::Phone => self.phone = value,
            LogicalField::Address => self.address = value,
        }
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// Records that passed validation together.
///
/// Only [`crate::validation::validate`] builds a non-empty dataset, so every
/// dataset in circulation satisfies validation as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Dataset(Vec<Record>);

impl Dataset {
    pub(crate) fn from_validated(records: Vec<Record>) -> Self {
        Self(records)
    }

    pub fn records(&self) -> &[Record] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// Submission Outcome
// =============================================================================

/// State of the most recent submit attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionOutcome {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed(SubmitError),
}

impl SubmissionOutcome {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    /// Succeeded or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }

    /// Short state label used by the API and CLI.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::InFlight => "in-flight",
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
        }
    }

    /// Failure reason (`"no data"`, `"request rejected"`, `"transport error"`).
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Failed(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(err) => write!(f, "failed({})", err),
            other => f.write_str(other.label()),
        }
    }
}

// =============================================================================
// Feedback
// =============================================================================

/// Kind of the feedback line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Success,
    Error,
}

/// Single-line message reflecting the latest validation or submission result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
}

impl Feedback {
    pub fn success(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: FeedbackKind::Success }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: FeedbackKind::Error }
    }

    pub fn is_error(&self) -> bool {
        self.kind == FeedbackKind::Error
    }
}

// =============================================================================
// Tests
// =============================================================================
