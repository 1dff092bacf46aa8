//! High-level pipeline API: tokenize, map, validate.
//!
//! Non-interactive counterpart of [`crate::session::Session`], used by the
//! CLI. The requested mapping is checked against the file's headers before
//! any record is built.
//!
//! # Example
//!
//! ```rust,ignore
//! use fieldmap::{map_file, FieldMapping};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mapping = FieldMapping { name: "Full Name".into(), email: "Mail".into(), ..Default::default() };
//!     let result = map_file("contacts.csv", &mapping, 50 * 1024 * 1024).await?;
//!     println!("Mapped {} records", result.dataset.len());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::path::Path;

use super::projector::project;
use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::{ImportError, MappingError, PipelineError};
use crate::mapping::FieldMapper;
use crate::models::{Dataset, FieldMapping, LogicalField, RawTable};
use crate::parser::{parse_bytes, parse_file, ParseResult};
use crate::validation::validate;

/// Source file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub encoding: String,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl TableInfo {
    pub fn new(table: &RawTable, encoding: impl Into<String>) -> Self {
        Self {
            encoding: encoding.into(),
            headers: table.headers.clone(),
            row_count: table.rows.len(),
        }
    }
}

/// Result of a complete parse → map → validate run
#[derive(Debug, Clone, Serialize)]
pub struct MappedImport {
    pub table_info: TableInfo,
    /// Mapping actually applied
    pub mapping: FieldMapping,
    pub dataset: Dataset,
}

/// Check every entry of `requested` against the table headers.
pub fn bind_mapping(table: &RawTable, requested: &FieldMapping) -> Result<FieldMapping, MappingError> {
    let mut mapper = FieldMapper::new();
    mapper.rebind(&table.headers);
    for field in LogicalField::ALL {
        mapper.assign(field, requested.get(field).unwrap_or(""))?;
    }
    Ok(mapper.mapping().clone())
}

/// Map an already-decoded text.
pub fn map_text(
    text: &str,
    encoding: &str,
    mapping: &FieldMapping,
) -> Result<MappedImport, PipelineError> {
    let parsed = ParseResult {
        table: crate::parser::tokenize(text),
        encoding: encoding.to_string(),
    };
    map_parsed(parsed, mapping)
}

/// Decode, tokenize and map raw bytes.
pub fn map_bytes(bytes: &[u8], mapping: &FieldMapping) -> Result<MappedImport, PipelineError> {
    map_parsed(parse_bytes(bytes)?, mapping)
}

/// Read, tokenize and map a file.
pub async fn map_file(
    path: impl AsRef<Path>,
    mapping: &FieldMapping,
    max_size: u64,
) -> Result<MappedImport, PipelineError> {
    let path = path.as_ref();
    log_info(format!("Reading {}", path.display()));
    let parsed = parse_file(path, max_size).await?;
    map_parsed(parsed, mapping)
}

fn map_parsed(parsed: ParseResult, requested: &FieldMapping) -> Result<MappedImport, PipelineError> {
    let ParseResult { table, encoding } = parsed;

    if table.is_empty() {
        log_error("File contains no data");
        return Err(ImportError::EmptyInput.into());
    }

    log_success(format!("Detected encoding: {}", encoding));
    log_success(format!("Read {} rows", table.rows.len()));
    log_info(format!("File has {} columns:", table.headers.len()));
    for (i, col) in table.headers.iter().enumerate() {
        log_info(format!("[{:2}] {}", i + 1, col));
    }

    let mapping = bind_mapping(&table, requested)?;
    print_mapping(&mapping);

    let candidates = project(&table, &mapping);
    log_info(format!("Validating {} records...", candidates.len()));

    let dataset = validate(&mapping, candidates).map_err(|e| {
        log_error(e.to_string());
        e
    })?;
    log_success(format!("All {} records valid!", dataset.len()));

    Ok(MappedImport {
        table_info: TableInfo::new(&table, encoding),
        mapping,
        dataset,
    })
}

fn print_mapping(mapping: &FieldMapping) {
    log_info("Field mapping:");
    for field in LogicalField::ALL {
        match mapping.get(field) {
            Some(header) => log_info(format!("{} → {}", header, field)),
            None if field.is_required() => log_warning(format!("(unmapped) → {}", field)),
            None => log_info(format!("(unmapped) → {}", field)),
        }
    }
}
