use crate::error::ConfigurationError;
use crate::record::{Record, RecordKey};
use ahash::AHashMap;

/// An ordered collection of records with dataset-unique keys
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    columns: Vec<String>,
    records: Vec<Record>,
    positions: AHashMap<RecordKey, usize>,
}

impl Dataset {
    /// Build a dataset whose columns are the union of the records' field
    /// names, in first-seen order.
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Result<Self, ConfigurationError> {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for field in record.fields.keys() {
                if !columns.iter().any(|c| c == field) {
                    columns.push(field.clone());
                }
            }
        }
        Self::with_columns(name, columns, records)
    }

    /// Build a dataset with an explicit column list. Records may omit
    /// columns (read as absent) but may not carry undeclared ones.
    pub fn with_columns(
        name: impl Into<String>,
        columns: Vec<String>,
        records: Vec<Record>,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let mut positions = AHashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            if positions.insert(record.key.clone(), pos).is_some() {
                return Err(ConfigurationError::DuplicateKey {
                    key: record.key.clone(),
                    dataset: name,
                });
            }
            if let Some(field) = record.fields.keys().find(|f| !columns.contains(*f)) {
                return Err(ConfigurationError::UnknownField {
                    field: field.clone(),
                    dataset: name,
                });
            }
        }

        Ok(Self {
            name,
            columns,
            records,
            positions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.columns.iter().any(|c| c == field)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at insertion position `pos`
    #[inline]
    pub fn at(&self, pos: usize) -> &Record {
        &self.records[pos]
    }

    pub fn get(&self, key: &RecordKey) -> Option<&Record> {
        self.positions.get(key).map(|&pos| &self.records[pos])
    }

    pub fn position(&self, key: &RecordKey) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Fails unless every name in `fields` is a declared column
    pub fn require_fields<'a, I>(&self, fields: I) -> Result<(), ConfigurationError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for field in fields {
            if !self.has_column(field) {
                return Err(ConfigurationError::UnknownField {
                    field: field.to_string(),
                    dataset: self.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Column sets must be equal (order does not matter)
    pub fn require_same_columns(&self, other: &Dataset) -> Result<(), ConfigurationError> {
        let same = self.columns.len() == other.columns.len()
            && self.columns.iter().all(|c| other.has_column(c));
        if same {
            Ok(())
        } else {
            Err(ConfigurationError::ColumnMismatch {
                left: self.name.clone(),
                right: other.name.clone(),
            })
        }
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Vec<Record> {
        vec![
            Record::new("a").with_field("first", "john").with_field("last", "doe"),
            Record::new("b").with_field("first", "jane"),
            Record::new("c").with_field("last", "roe").with_field("age", 30i64),
        ]
    }

    #[test]
    fn test_columns_in_first_seen_order() {
        let ds = Dataset::new("people", people()).unwrap();
        assert_eq!(ds.columns(), &["first", "last", "age"]);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.position(&RecordKey::from("c")), Some(2));
        assert!(ds.get(&RecordKey::from("b")).unwrap().get("last").is_missing());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut records = people();
        records.push(Record::new("a"));
        let err = Dataset::new("people", records).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateKey {
                key: RecordKey::from("a"),
                dataset: "people".to_string(),
            }
        );
    }

    #[test]
    fn test_undeclared_column_rejected() {
        let err = Dataset::with_columns("people", vec!["first".to_string()], people()).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownField { ref field, .. } if field == "last"));
    }

    #[test]
    fn test_require_fields_and_columns() {
        let left = Dataset::new("left", people()).unwrap();
        let right = Dataset::with_columns(
            "right",
            vec!["age".into(), "last".into(), "first".into()],
            vec![],
        )
        .unwrap();
        assert!(left.require_fields(["first", "age"]).is_ok());
        assert!(left.require_fields(["middle"]).is_err());
        assert!(left.require_same_columns(&right).is_ok());

        let narrow = Dataset::with_columns("narrow", vec!["first".into()], vec![]).unwrap();
        assert!(matches!(
            left.require_same_columns(&narrow),
            Err(ConfigurationError::ColumnMismatch { .. })
        ));
    }
}
