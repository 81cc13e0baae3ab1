//! Entities (rows) submitted to a collection.
//!
//! Rows can be built directly as field-name maps ([`Entity`]) or as parallel
//! column arrays ([`ColumnBatch`]) that are zipped into rows before insert.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::schema::{CollectionSchema, DataType};

/// A query result row keyed by output field name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A single typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int64(i64),
    VarChar(String),
    FloatVector(Vec<f32>),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Int64(_) => "Int64",
            FieldValue::VarChar(_) => "VarChar",
            FieldValue::FloatVector(_) => "FloatVector",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Int64(v) => serde_json::Value::from(*v),
            FieldValue::VarChar(v) => serde_json::Value::from(v.as_str()),
            FieldValue::FloatVector(v) => serde_json::Value::from(v.clone()),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int64(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::VarChar(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::VarChar(value.to_string())
    }
}

impl From<Vec<f32>> for FieldValue {
    fn from(value: Vec<f32>) -> Self {
        FieldValue::FloatVector(value)
    }
}

/// One row conforming to a collection schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity {
    fields: BTreeMap<String, FieldValue>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Render as a JSON object, the row format the REST API expects.
    pub fn to_json(&self) -> serde_json::Value {
        let map: Row = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Check this row against `schema`.
    ///
    /// Rejects unknown fields, kind mismatches, vectors whose length differs
    /// from the declared dimension, over-long strings, explicit ids for an
    /// auto-id primary key, and missing required fields. VarChar
    /// `max_length` counts UTF-8 bytes, not characters.
    pub fn validate(&self, schema: &CollectionSchema) -> Result<(), SchemaError> {
        for (name, value) in &self.fields {
            let field = schema
                .field(name)
                .ok_or_else(|| SchemaError::UnknownField(name.clone()))?;

            if field.is_primary && field.auto_id {
                return Err(SchemaError::AutoIdValueSupplied(name.clone()));
            }

            match (&field.data_type, value) {
                (DataType::Int64, FieldValue::Int64(_)) => {}
                (DataType::FloatVector { dim }, FieldValue::FloatVector(v)) => {
                    if v.len() != *dim {
                        return Err(SchemaError::DimensionMismatch {
                            field: name.clone(),
                            expected: *dim,
                            actual: v.len(),
                        });
                    }
                }
                (DataType::VarChar { max_length }, FieldValue::VarChar(s)) => {
                    if s.len() > *max_length {
                        return Err(SchemaError::ValueTooLong {
                            field: name.clone(),
                            max_length: *max_length,
                        });
                    }
                }
                (expected, actual) => {
                    return Err(SchemaError::TypeMismatch {
                        field: name.clone(),
                        expected: expected.wire_name().to_string(),
                        actual: actual.kind().to_string(),
                    });
                }
            }
        }

        for field in schema.fields() {
            if !field.is_optional_on_insert() && !self.fields.contains_key(&field.name) {
                return Err(SchemaError::MissingField(field.name.clone()));
            }
        }

        Ok(())
    }
}

/// A typed column of values for parallel-array construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64(Vec<i64>),
    VarChar(Vec<String>),
    FloatVector(Vec<Vec<f32>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Int64(v) => v.len(),
            Column::VarChar(v) => v.len(),
            Column::FloatVector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn value(&self, row: usize) -> FieldValue {
        match self {
            Column::Int64(v) => FieldValue::Int64(v[row]),
            Column::VarChar(v) => FieldValue::VarChar(v[row].clone()),
            Column::FloatVector(v) => FieldValue::FloatVector(v[row].clone()),
        }
    }
}

/// Parallel column arrays, one per field, zipped into rows on insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnBatch {
    columns: Vec<(String, Column)>,
}

impl ColumnBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: impl Into<String>, column: Column) -> Self {
        self.columns.push((name.into(), column));
        self
    }

    /// Zip the columns into row entities.
    ///
    /// All columns must have the same length.
    pub fn into_entities(self) -> Result<Vec<Entity>, SchemaError> {
        let rows = self.columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        for (name, column) in &self.columns {
            if column.len() != rows {
                return Err(SchemaError::ColumnLengthMismatch {
                    field: name.clone(),
                    expected: rows,
                    actual: column.len(),
                });
            }
        }

        Ok((0..rows)
            .map(|i| {
                let mut entity = Entity::new();
                for (name, column) in &self.columns {
                    entity.set(name.clone(), column.value(i));
                }
                entity
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSchema;

    fn schema() -> CollectionSchema {
        CollectionSchema::new(
            vec![
                FieldSchema::int64("book_id").primary(),
                FieldSchema::int64("word_count"),
                FieldSchema::float_vector("book_intro", 3),
                FieldSchema::varchar("sentence", 8).with_default(FieldValue::VarChar(String::new())),
            ],
            "books",
        )
        .unwrap()
    }

    #[test]
    fn test_valid_entity_passes() {
        let entity = Entity::new()
            .with("book_id", 1_i64)
            .with("word_count", 42_i64)
            .with("book_intro", vec![0.1_f32, 0.2, 0.3])
            .with("sentence", "pera");
        assert!(entity.validate(&schema()).is_ok());
    }

    #[test]
    fn test_default_field_may_be_omitted() {
        let entity = Entity::new()
            .with("book_id", 1_i64)
            .with("word_count", 42_i64)
            .with("book_intro", vec![0.1_f32, 0.2, 0.3]);
        assert!(entity.validate(&schema()).is_ok());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let entity = Entity::new()
            .with("book_id", 1_i64)
            .with("word_count", 42_i64)
            .with("book_intro", vec![0.1_f32, 0.2]);
        let err = entity.validate(&schema()).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::DimensionMismatch { expected: 3, actual: 2, .. }
        ));
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let entity = Entity::new().with("book_id", 1_i64).with("book_intro", vec![0.0_f32; 3]);
        let err = entity.validate(&schema()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingField(name) if name == "word_count"));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let entity = Entity::new()
            .with("book_id", "one")
            .with("word_count", 42_i64)
            .with("book_intro", vec![0.0_f32; 3]);
        let err = entity.validate(&schema()).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let entity = Entity::new()
            .with("book_id", 1_i64)
            .with("word_count", 42_i64)
            .with("book_intro", vec![0.0_f32; 3])
            .with("author", "x");
        let err = entity.validate(&schema()).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownField(name) if name == "author"));
    }

    #[test]
    fn test_varchar_too_long_rejected() {
        let entity = Entity::new()
            .with("book_id", 1_i64)
            .with("word_count", 42_i64)
            .with("book_intro", vec![0.0_f32; 3])
            .with("sentence", "far too long for eight");
        let err = entity.validate(&schema()).unwrap_err();
        assert!(matches!(err, SchemaError::ValueTooLong { max_length: 8, .. }));
    }

    #[test]
    fn test_varchar_limit_counts_bytes() {
        let row = |sentence: &str| {
            Entity::new()
                .with("book_id", 1_i64)
                .with("word_count", 42_i64)
                .with("book_intro", vec![0.0_f32; 3])
                .with("sentence", sentence)
        };
        // 8 bytes, 7 chars
        assert!(row("perché?").validate(&schema()).is_ok());
        // 10 bytes, 5 chars
        let err = row("àèìòù").validate(&schema()).unwrap_err();
        assert!(matches!(err, SchemaError::ValueTooLong { max_length: 8, .. }));
    }

    #[test]
    fn test_auto_id_value_rejected() {
        let schema = CollectionSchema::new(
            vec![
                FieldSchema::int64("id").primary().auto_id(),
                FieldSchema::float_vector("v", 2),
            ],
            "",
        )
        .unwrap();
        let ok = Entity::new().with("v", vec![1.0_f32, 2.0]);
        assert!(ok.validate(&schema).is_ok());

        let bad = Entity::new().with("id", 7_i64).with("v", vec![1.0_f32, 2.0]);
        assert!(matches!(
            bad.validate(&schema).unwrap_err(),
            SchemaError::AutoIdValueSupplied(_)
        ));
    }

    #[test]
    fn test_column_batch_zips_rows_in_order() {
        let rows = ColumnBatch::new()
            .column("book_id", Column::Int64(vec![0, 1]))
            .column("sentence", Column::VarChar(vec!["mela".into(), "pera".into()]))
            .into_entities()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("book_id"), Some(&FieldValue::Int64(1)));
        assert_eq!(rows[1].get("sentence"), Some(&FieldValue::VarChar("pera".into())));
    }

    #[test]
    fn test_column_batch_length_mismatch() {
        let err = ColumnBatch::new()
            .column("book_id", Column::Int64(vec![0, 1, 2]))
            .column("sentence", Column::VarChar(vec!["mela".into()]))
            .into_entities()
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::ColumnLengthMismatch { expected: 3, actual: 1, .. }
        ));
    }

    #[test]
    fn test_entity_json_shape() {
        let json = Entity::new()
            .with("book_id", 3_i64)
            .with("book_intro", vec![0.5_f32, 0.25])
            .to_json();
        assert_eq!(json["book_id"], 3);
        assert_eq!(json["book_intro"][1], 0.25);
    }
}
