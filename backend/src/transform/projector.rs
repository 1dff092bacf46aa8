//! Applies a [`FieldMapping`] to the rows of a [`RawTable`].

use crate::models::{FieldMapping, LogicalField, RawTable, Record};

/// Build one record per row.
///
/// Each field takes the cell under the first column named by its mapping.
/// Unset or unknown headers and rows too short for the column yield `""`.
/// The output always has exactly `table.rows.len()` records, in row order.
pub fn project(table: &RawTable, mapping: &FieldMapping) -> Vec<Record> {
    let columns: Vec<(LogicalField, Option<usize>)> = LogicalField::ALL
        .into_iter()
        .map(|field| {
            let index = mapping.get(field).and_then(|h| table.column_index(h));
            (field, index)
        })
        .collect();

    table
        .rows
        .iter()
        .map(|row| {
            let mut record = Record::default();
            for (field, index) in &columns {
                if let Some(i) = index {
                    record.set(*field, RawTable::cell(row, *i));
                }
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenize;

    fn full_mapping() -> FieldMapping {
        FieldMapping {
            name: "Full Name".into(),
            email: "Mail".into(),
            phone: "Tel".into(),
            address: "Street".into(),
        }
    }

    #[test]
    fn test_projection_scenario() {
        let table = tokenize("name,email\nAda,ada@x.com\nBob,bob@x.com");
        let mapping = FieldMapping {
            name: "name".into(),
            email: "email".into(),
            ..FieldMapping::default()
        };

        let records = project(&table, &mapping);

        assert_eq!(
            records,
            vec![
                Record { name: "Ada".into(), email: "ada@x.com".into(), ..Record::default() },
                Record { name: "Bob".into(), email: "bob@x.com".into(), ..Record::default() },
            ]
        );
    }

    #[test]
    fn test_full_mapping_copies_cells() {
        let table = tokenize("Tel,Full Name,Street,Mail\n555-1,Ada,1 Main St,ada@x.com");
        let records = project(&table, &full_mapping());

        assert_eq!(records[0].name, "Ada");
        assert_eq!(records[0].email, "ada@x.com");
        assert_eq!(records[0].phone, "555-1");
        assert_eq!(records[0].address, "1 Main St");
    }

    #[test]
    fn test_length_matches_rows() {
        let table = tokenize("a,b\n1\n\n2,3,4\n,");
        for mapping in [FieldMapping::default(), full_mapping()] {
            assert_eq!(project(&table, &mapping).len(), table.rows.len());
        }
        assert!(project(&tokenize(""), &full_mapping()).is_empty());
    }

    #[test]
    fn test_short_rows_and_stale_headers() {
        let table = tokenize("name,email,phone\nAda\nBob,bob@x.com");
        let mapping = FieldMapping {
            name: "name".into(),
            email: "email".into(),
            phone: "phone".into(),
            address: "gone".into(),
        };

        let records = project(&table, &mapping);

        assert_eq!(records[0].email, "");
        assert_eq!(records[0].phone, "");
        assert_eq!(records[1].email, "bob@x.com");
        assert_eq!(records[1].address, "");
    }

    #[test]
    fn test_duplicate_header_resolves_to_first() {
        let table = tokenize("email,name,email\nfirst@x.com,Ada,second@x.com");
        let mapping = FieldMapping {
            name: "name".into(),
            email: "email".into(),
            ..FieldMapping::default()
        };

        assert_eq!(project(&table, &mapping)[0].email, "first@x.com");
    }

    #[test]
    fn test_same_column_for_two_fields() {
        let table = tokenize("contact\nada@x.com");
        let mapping = FieldMapping {
            name: "contact".into(),
            email: "contact".into(),
            ..FieldMapping::default()
        };

        let record = &project(&table, &mapping)[0];
        assert_eq!(record.name, "ada@x.com");
        assert_eq!(record.email, "ada@x.com");
    }
}
