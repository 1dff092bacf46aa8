//! Comma-separated text tokenizer with encoding auto-detection.
//!
//! Splits text into a header row and data rows. Quoting is not supported:
//! a comma inside a value always starts a new cell.

use std::path::Path;

use crate::error::{ImportError, ImportResult};
use crate::models::RawTable;

/// Cell delimiter.
pub const DELIMITER: char = ',';

/// Decoded file content with the encoding that was used
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: String,
}

/// Result of parsing a file with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Headers and rows
    pub table: RawTable,
    /// Detected encoding
    pub encoding: String,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the specified encoding.
///
/// Latin-1 is decoded as windows-1252, its WHATWG superset. Unknown
/// encodings fall back to lossy UTF-8. A leading BOM is removed.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding {
        "utf-8" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "windows-1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        label => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Detect the encoding and decode. Binary content is rejected.
pub fn decode_bytes(bytes: &[u8]) -> ImportResult<DecodedText> {
    let encoding = detect_encoding(bytes);

    if !encoding.starts_with("utf-16") && bytes.contains(&0) {
        return Err(ImportError::Encoding(
            "content contains NUL bytes and does not look like text".to_string(),
        ));
    }

    let text = decode_content(bytes, &encoding);
    Ok(DecodedText { text, encoding })
}

/// Reject content larger than `limit` bytes.
pub fn check_size(size: u64, limit: u64) -> ImportResult<()> {
    if size > limit {
        return Err(ImportError::FileTooLarge { size, limit });
    }
    Ok(())
}

/// Split text into headers and rows.
///
/// Lines end at `\n` or `\r\n`. Empty lines are dropped wherever they occur.
/// The first remaining line holds the headers; every following line is a row.
/// Cells are trimmed, headers keep their order and duplicates.
///
/// # Example
/// ```
/// use fieldmap::tokenize;
///
/// let table = tokenize("name,email\r\nAda,ada@x.com\n\n");
/// assert_eq!(table.headers, vec!["name", "email"]);
/// assert_eq!(table.rows, vec![vec!["Ada", "ada@x.com"]]);
/// ```
pub fn tokenize(text: &str) -> RawTable {
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty());

    let Some(header_line) = lines.next() else {
        return RawTable::default();
    };

    let headers = split_line(header_line);
    let rows = lines.map(split_line).collect();

    RawTable { headers, rows }
}

fn split_line(line: &str) -> Vec<String> {
    line.split(DELIMITER).map(|cell| cell.trim().to_string()).collect()
}

/// Decode and tokenize raw bytes.
pub fn parse_bytes(bytes: &[u8]) -> ImportResult<ParseResult> {
    let decoded = decode_bytes(bytes)?;
    Ok(ParseResult {
        table: tokenize(&decoded.text),
        encoding: decoded.encoding,
    })
}

/// Read a file (at most `max_size` bytes) and decode it.
pub async fn read_file(path: impl AsRef<Path>, max_size: u64) -> ImportResult<DecodedText> {
    let path = path.as_ref();
    let size = tokio::fs::metadata(path).await?.len();
    check_size(size, max_size)?;

    let bytes = tokio::fs::read(path).await?;
    decode_bytes(&bytes)
}

/// Read, decode and tokenize a file.
pub async fn parse_file(path: impl AsRef<Path>, max_size: u64) -> ImportResult<ParseResult> {
    let decoded = read_file(path, max_size).await?;
    Ok(ParseResult {
        table: tokenize(&decoded.text),
        encoding: decoded.encoding,
    })
}
