use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a schema or validating entities against it.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("field name cannot be empty")]
    EmptyFieldName,

    #[error("duplicate field '{0}'")]
    DuplicateField(String),

    #[error("schema has no primary key field")]
    MissingPrimaryKey,

    #[error("schema has more than one primary key field")]
    MultiplePrimaryKeys,

    #[error("primary key field '{0}' must be Int64 or VarChar")]
    InvalidPrimaryKeyType(String),

    #[error("auto_id is only allowed on the primary key, not '{0}'")]
    AutoIdOnNonPrimary(String),

    #[error("schema must have exactly one float vector field, found {0}")]
    VectorFieldCount(usize),

    #[error("vector field '{field}' has invalid dimension {dim}")]
    InvalidDimension { field: String, dim: usize },

    #[error("varchar field '{field}' has invalid max_length {max_length}")]
    InvalidMaxLength { field: String, max_length: usize },

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("missing value for required field '{0}'")]
    MissingField(String),

    #[error("field '{0}' is auto-generated and must not be supplied")]
    AutoIdValueSupplied(String),

    #[error("field '{field}' expects {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("vector field '{field}' expects dimension {expected}, got {actual}")]
    DimensionMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("value for '{field}' exceeds max_length {max_length}")]
    ValueTooLong { field: String, max_length: usize },

    #[error("column '{field}' has {actual} values, expected {expected}")]
    ColumnLengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors from vector database operations (used by trait definitions in ristobot-core).
#[derive(Debug, Error)]
pub enum VectorDbError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("authentication failed")]
    Unauthorized,

    #[error("collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("collection '{0}' already exists")]
    CollectionExists(String),

    #[error("collection '{0}' is not loaded")]
    NotLoaded(String),

    #[error("no index on field '{field}' of collection '{collection}'")]
    MissingIndex { collection: String, field: String },

    #[error("search metric {requested} does not match the {indexed} index of collection '{collection}'")]
    MetricMismatch {
        collection: String,
        indexed: String,
        requested: String,
    },

    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("invalid filter expression: {0}")]
    Filter(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors from embedding model loading and inference.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("embedding inference failed: {0}")]
    Inference(String),

    #[error("embedding has dimension {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedder returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
}

/// Errors from reading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("config section [{0}] not found")]
    MissingSection(String),

    #[error("config key '{key}' missing from section [{section}]")]
    MissingKey { section: String, key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::DimensionMismatch {
            field: "book_intro".to_string(),
            expected: 384,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "vector field 'book_intro' expects dimension 384, got 3"
        );
    }

    #[test]
    fn test_vector_db_error_wraps_schema_error() {
        let err: VectorDbError = SchemaError::MissingPrimaryKey.into();
        assert_eq!(err.to_string(), "schema has no primary key field");
    }

    #[test]
    fn test_config_error_names_section_and_key() {
        let err = ConfigError::MissingKey {
            section: "example".to_string(),
            key: "token".to_string(),
        };
        assert!(err.to_string().contains("[example]"));
        assert!(err.to_string().contains("'token'"));
    }

    #[test]
    fn test_server_error_display() {
        let err = VectorDbError::Server {
            code: 1100,
            message: "collection not found".to_string(),
        };
        assert_eq!(err.to_string(), "server error 1100: collection not found");
    }
}
