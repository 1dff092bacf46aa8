//! Field mapping editor.
//!
//! Associates each [`LogicalField`] with a source header. [`set_mapping`] is
//! the pure single-entry update; [`FieldMapper`] keeps the mapping consistent
//! with the headers of the currently imported table.

use crate::error::{MappingError, MappingResult};
use crate::models::{FieldMapping, LogicalField};

/// Return a copy of `mapping` with `field` bound to `header`.
///
/// An empty `header` unmaps the field. Other entries are left untouched.
pub fn set_mapping(mapping: &FieldMapping, field: LogicalField, header: &str) -> FieldMapping {
    let mut updated = mapping.clone();
    updated.set(field, header);
    updated
}

/// Mapping plus the header choices it may refer to.
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    mapping: FieldMapping,
    headers: Vec<String>,
}

impl FieldMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mapping.
    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Headers a field can be bound to.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Bind `field` to `header`, or unmap it when `header` is empty.
    ///
    /// Fails when `header` is not one of the current headers; the mapping is
    /// left unchanged in that case.
    pub fn assign(&mut self, field: LogicalField, header: &str) -> MappingResult<&FieldMapping> {
        if !header.is_empty() && !self.headers.iter().any(|h| h == header) {
            return Err(MappingError::UnknownHeader(header.to_string()));
        }
        self.mapping = set_mapping(&self.mapping, field, header);
        Ok(&self.mapping)
    }

    /// Like [`FieldMapper::assign`] but takes the field by name.
    pub fn assign_named(&mut self, field: &str, header: &str) -> MappingResult<LogicalField> {
        let field: LogicalField = field.parse()?;
        self.assign(field, header)?;
        Ok(field)
    }

    /// Switch to a new set of headers and unmap every entry that no longer
    /// refers to one of them. Returns the cleared fields.
    pub fn rebind(&mut self, headers: &[String]) -> Vec<LogicalField> {
        self.headers = headers.to_vec();

        let stale: Vec<LogicalField> = LogicalField::ALL
            .into_iter()
            .filter(|field| {
                self.mapping
                    .get(*field)
                    .is_some_and(|header| !self.headers.iter().any(|h| h == header))
            })
            .collect();

        for field in &stale {
            self.mapping.set(*field, "");
        }
        stale
    }

    /// Unmap every field.
    pub fn reset(&mut self) {
        self.mapping = FieldMapping::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_mapping_is_pure() {
        let original = FieldMapping::default();
        let updated = set_mapping(&original, LogicalField::Email, "mail");

        assert_eq!(original.get(LogicalField::Email), None);
        assert_eq!(updated.get(LogicalField::Email), Some("mail"));
        assert_eq!(updated.get(LogicalField::Name), None);
    }

    #[test]
    fn test_set_mapping_empty_unmaps() {
        let mapped = set_mapping(&FieldMapping::default(), LogicalField::Name, "n");
        let unmapped = set_mapping(&mapped, LogicalField::Name, "");
        assert!(!unmapped.is_mapped(LogicalField::Name));
    }

    #[test]
    fn test_assign_unknown_header_rejected() {
        let mut mapper = FieldMapper::new();
        mapper.rebind(&headers(&["name", "email"]));
        mapper.assign(LogicalField::Name, "name").unwrap();

        let err = mapper.assign(LogicalField::Email, "mail").unwrap_err();
        assert_eq!(err, MappingError::UnknownHeader("mail".into()));
        // Mapping untouched
        assert_eq!(mapper.mapping().get(LogicalField::Name), Some("name"));
        assert_eq!(mapper.mapping().get(LogicalField::Email), None);
    }

    #[test]
    fn test_assign_named_rejects_unknown_field() {
        let mut mapper = FieldMapper::new();
        mapper.rebind(&headers(&["name"]));
        let before = mapper.mapping().clone();

        let err = mapper.assign_named("fax", "name").unwrap_err();
        assert_eq!(err, MappingError::UnknownField("fax".into()));
        assert_eq!(mapper.mapping(), &before);
    }

    #[test]
    fn test_rebind_clears_stale_entries() {
        let mut mapper = FieldMapper::new();
        mapper.rebind(&headers(&["name", "email", "tel"]));
        mapper.assign(LogicalField::Name, "name").unwrap();
        mapper.assign(LogicalField::Email, "email").unwrap();
        mapper.assign(LogicalField::Phone, "tel").unwrap();

        let cleared = mapper.rebind(&headers(&["name", "email", "phone"]));

        assert_eq!(cleared, vec![LogicalField::Phone]);
        assert_eq!(mapper.mapping().get(LogicalField::Name), Some("name"));
        assert_eq!(mapper.mapping().get(LogicalField::Phone), None);
        assert_eq!(mapper.headers(), &headers(&["name", "email", "phone"])[..]);
    }

    #[test]
    fn test_reset() {
        let mut mapper = FieldMapper::new();
        mapper.rebind(&headers(&["name"]));
        mapper.assign(LogicalField::Name, "name").unwrap();
        mapper.reset();
        assert_eq!(mapper.mapping(), &FieldMapping::default());
        // Headers survive a reset
        assert_eq!(mapper.headers().len(), 1);
    }
}
