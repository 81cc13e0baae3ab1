//! Collection schema types.
//!
//! A [`CollectionSchema`] is an ordered list of [`FieldSchema`] descriptors
//! plus a description. Construction validates the structural rules the
//! vector database enforces (one primary key, one float vector field, sane
//! lengths) so a bad schema fails before any network call.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::FieldValue;
use crate::error::SchemaError;

/// Embedding dimension produced by the MiniLM-L6 family of sentence models.
pub const EMBEDDING_DIMENSION: usize = 384;

/// Upper bound the vector database accepts for `VarChar` `max_length`.
pub const MAX_VARCHAR_LENGTH: usize = 65_535;

/// Storage kind of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataType {
    Int64,
    FloatVector { dim: usize },
    VarChar { max_length: usize },
}

impl DataType {
    /// Wire name used by the Milvus REST API.
    pub fn wire_name(&self) -> &'static str {
        match self {
            DataType::Int64 => "Int64",
            DataType::FloatVector { .. } => "FloatVector",
            DataType::VarChar { .. } => "VarChar",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int64 => write!(f, "INT64"),
            DataType::FloatVector { dim } => write!(f, "FLOAT_VECTOR(dim={dim})"),
            DataType::VarChar { max_length } => write!(f, "VARCHAR(max_length={max_length})"),
        }
    }
}

/// Descriptor for one field of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub auto_id: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
}

impl FieldSchema {
    fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_primary: false,
            auto_id: false,
            description: None,
            default_value: None,
        }
    }

    pub fn int64(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Int64)
    }

    pub fn float_vector(name: impl Into<String>, dim: usize) -> Self {
        Self::new(name, DataType::FloatVector { dim })
    }

    pub fn varchar(name: impl Into<String>, max_length: usize) -> Self {
        Self::new(name, DataType::VarChar { max_length })
    }

    /// Mark this field as the collection's primary key.
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Let the database generate primary key values on insert.
    pub fn auto_id(mut self) -> Self {
        self.auto_id = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, value: FieldValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Whether an insert may omit this field.
    pub fn is_optional_on_insert(&self) -> bool {
        self.auto_id || self.default_value.is_some()
    }
}

/// Ordered set of fields bound to a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    fields: Vec<FieldSchema>,
    description: String,
}

impl CollectionSchema {
    /// Build and validate a schema.
    pub fn new(
        fields: Vec<FieldSchema>,
        description: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let schema = Self {
            fields,
            description: description.into(),
        };
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            if field.auto_id && !field.is_primary {
                return Err(SchemaError::AutoIdOnNonPrimary(field.name.clone()));
            }
            match field.data_type {
                DataType::FloatVector { dim } if dim == 0 => {
                    return Err(SchemaError::InvalidDimension {
                        field: field.name.clone(),
                        dim,
                    });
                }
                DataType::VarChar { max_length }
                    if max_length == 0 || max_length > MAX_VARCHAR_LENGTH =>
                {
                    return Err(SchemaError::InvalidMaxLength {
                        field: field.name.clone(),
                        max_length,
                    });
                }
                _ => {}
            }
        }

        let primaries: Vec<&FieldSchema> = self.fields.iter().filter(|f| f.is_primary).collect();
        match primaries.as_slice() {
            [] => return Err(SchemaError::MissingPrimaryKey),
            [pk] => {
                if matches!(pk.data_type, DataType::FloatVector { .. }) {
                    return Err(SchemaError::InvalidPrimaryKeyType(pk.name.clone()));
                }
            }
            _ => return Err(SchemaError::MultiplePrimaryKeys),
        }

        let vectors = self
            .fields
            .iter()
            .filter(|f| matches!(f.data_type, DataType::FloatVector { .. }))
            .count();
        if vectors != 1 {
            return Err(SchemaError::VectorFieldCount(vectors));
        }

        Ok(())
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The primary key field. Always present on a validated schema.
    pub fn primary_field(&self) -> &FieldSchema {
        self.fields
            .iter()
            .find(|f| f.is_primary)
            .unwrap_or(&self.fields[0])
    }

    /// The float vector field. Always present on a validated schema.
    pub fn vector_field(&self) -> &FieldSchema {
        self.fields
            .iter()
            .find(|f| matches!(f.data_type, DataType::FloatVector { .. }))
            .unwrap_or(&self.fields[0])
    }

    /// Declared dimension of the vector field.
    pub fn dimension(&self) -> usize {
        match self.vector_field().data_type {
            DataType::FloatVector { dim } => dim,
            _ => 0,
        }
    }

    /// Whether primary keys are generated by the database.
    pub fn auto_id(&self) -> bool {
        self.primary_field().auto_id
    }
}

impl fmt::Display for CollectionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (auto_id={})", self.description, self.auto_id())?;
        for field in &self.fields {
            write!(f, "  - {}: {}", field.name, field.data_type)?;
            if field.is_primary {
                write!(f, " [primary]")?;
            }
            if field.auto_id {
                write!(f, " [auto_id]")?;
            }
            if let Some(desc) = &field.description {
                write!(f, " -- {desc}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
