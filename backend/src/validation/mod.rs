//! Record validation.
//!
//! Two checks share the same email rule:
//!
//! ## Batch check ([`validate`])
//! Runs when the user confirms the mapping. `name` and `email` must be
//! mapped, and every non-empty email must be well formed. The batch is
//! accepted or rejected as a whole; no row is ever filtered out.
//!
//! ## Live check ([`check_column`])
//! Runs each time one field is bound to a column. It scans that column and
//! reports the first empty value (or malformed email). A live issue only
//! blocks the confirm action.
//!
//! # Example
//!
//! ```rust
//! use fieldmap::{project, tokenize, validate, FieldMapping, LogicalField};
//!
//! let table = tokenize("name,email\nAda,ada@x.com");
//! let mut mapping = FieldMapping::default();
//! mapping.set(LogicalField::Name, "name");
//! mapping.set(LogicalField::Email, "email");
//!
//! let dataset = validate(&mapping, project(&table, &mapping)).unwrap();
//! assert_eq!(dataset.len(), 1);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::error::{ValidationError, ValidationResult};
use crate::models::{Dataset, FieldMapping, LogicalField, RawTable, Record};

/// local-part@domain.tld, no whitespace and no extra `@` in any part.
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// True when `value` looks like an email address.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Report row number for the `index`-th data row (the header is row 1).
pub fn report_row(index: usize) -> usize {
    index + 2
}

/// Turn candidate records into a dataset.
///
/// Empty email cells are accepted: only present-but-malformed values fail.
pub fn validate(mapping: &FieldMapping, candidates: Vec<Record>) -> ValidationResult<Dataset> {
    if !mapping.missing_required().is_empty() {
        return Err(ValidationError::MissingRequiredMapping);
    }

    if let Some((index, record)) = candidates
        .iter()
        .enumerate()
        .find(|(_, r)| !r.email.is_empty() && !is_valid_email(&r.email))
    {
        return Err(ValidationError::InvalidEmailFormat {
            row: report_row(index),
            value: record.email.clone(),
        });
    }

    Ok(Dataset::from_validated(candidates))
}

// =============================================================================
// Live column check
// =============================================================================

/// What the live check found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LiveIssueKind {
    EmptyValue,
    InvalidEmail,
}

/// First offending cell of a freshly mapped column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveIssue {
    pub field: LogicalField,
    pub column: String,
    /// 1-based row number counting the header line.
    pub row: usize,
    pub value: String,
    pub kind: LiveIssueKind,
}

impl fmt::Display for LiveIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LiveIssueKind::InvalidEmail => write!(
                f,
                "The column \"{}\" mapped to \"{}\" has an invalid email at row {}: \"{}\"",
                self.column, self.field, self.row, self.value
            ),
            LiveIssueKind::EmptyValue => write!(
                f,
                "The column \"{}\" mapped to \"{}\" has an empty value at row {}",
                self.column, self.field, self.row
            ),
        }
    }
}

/// Scan the column named `header` for the first value that would be a
/// problem for `field`.
///
/// Email columns flag the first value that is not a valid email (an empty
/// cell included); other fields flag the first empty cell. Returns `None`
/// when the column is clean, `header` is empty, or no such column exists.
pub fn check_column(table: &RawTable, field: LogicalField, header: &str) -> Option<LiveIssue> {
    if header.is_empty() {
        return None;
    }
    let index = table.column_index(header)?;

    table.rows.iter().enumerate().find_map(|(i, row)| {
        let value = RawTable::cell(row, index);
        let kind = match field {
            LogicalField::Email if !is_valid_email(value) => LiveIssueKind::InvalidEmail,
            LogicalField::Email => return None,
            _ if value.is_empty() => LiveIssueKind::EmptyValue,
            _ => return None,
        };

        Some(LiveIssue {
            field,
            column: header.to_string(),
            row: report_row(i),
            value: value.to_string(),
            kind,
        })
    })
}
