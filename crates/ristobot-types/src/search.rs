//! Index, search, and query request/response types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::Row;

/// Distance metric used by an index and by searches against it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    /// Squared Euclidean distance; smaller is closer.
    #[default]
    L2,
    /// Inner product; larger is closer.
    IP,
    /// Cosine similarity; larger is closer.
    #[serde(rename = "COSINE")]
    Cosine,
}

impl MetricType {
    /// Whether a smaller score ranks first.
    pub fn smaller_is_closer(&self) -> bool {
        matches!(self, MetricType::L2)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::L2 => "L2",
            MetricType::IP => "IP",
            MetricType::Cosine => "COSINE",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index algorithm; `AutoIndex` lets the server choose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexType {
    #[default]
    #[serde(rename = "AUTOINDEX")]
    AutoIndex,
    Flat,
    IvfFlat,
    Hnsw,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::AutoIndex => "AUTOINDEX",
            IndexType::Flat => "FLAT",
            IndexType::IvfFlat => "IVF_FLAT",
            IndexType::Hnsw => "HNSW",
        }
    }
}

/// Parameters for building a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexParams {
    pub field_name: String,
    pub index_type: IndexType,
    pub metric_type: MetricType,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IVF_FLAT cluster count.
pub const DEFAULT_NLIST: u32 = 128;
/// HNSW graph degree.
pub const DEFAULT_HNSW_M: u32 = 16;
pub const DEFAULT_HNSW_EF_CONSTRUCTION: u32 = 200;

impl IndexParams {
    /// An index of `index_type`, with the build params that type requires.
    pub fn new(field_name: impl Into<String>, index_type: IndexType, metric_type: MetricType) -> Self {
        let mut params = serde_json::Map::new();
        match index_type {
            IndexType::AutoIndex | IndexType::Flat => {}
            IndexType::IvfFlat => {
                params.insert("nlist".to_string(), DEFAULT_NLIST.into());
            }
            IndexType::Hnsw => {
                params.insert("M".to_string(), DEFAULT_HNSW_M.into());
                params.insert("efConstruction".to_string(), DEFAULT_HNSW_EF_CONSTRUCTION.into());
            }
        }
        Self {
            field_name: field_name.into(),
            index_type,
            metric_type,
            params,
        }
    }

    /// AUTOINDEX with the given metric and no extra params.
    pub fn auto(field_name: impl Into<String>, metric_type: MetricType) -> Self {
        Self::new(field_name, IndexType::AutoIndex, metric_type)
    }
}

/// Per-search parameters (metric plus algorithm knobs such as `level`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub metric_type: MetricType,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl SearchParams {
    pub fn new(metric_type: MetricType) -> Self {
        Self {
            metric_type,
            params: serde_json::Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::new(MetricType::L2)
    }
}

/// A single-vector nearest-neighbour search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    pub anns_field: String,
    pub params: SearchParams,
    pub limit: usize,
    pub output_fields: Vec<String>,
    pub filter: Option<String>,
    /// Name of the primary key field, used to read hit ids from result rows.
    pub primary_field: String,
}

/// Primary key value of a stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Int(i64),
    Str(String),
}

impl PrimaryKey {
    /// Parse a primary key out of a JSON value.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(PrimaryKey::Int),
            serde_json::Value::String(s) => Some(PrimaryKey::Str(s.clone())),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PrimaryKey::Int(v) => Some(*v),
            PrimaryKey::Str(_) => None,
        }
    }

    /// Render as a literal usable inside a filter expression.
    pub fn to_filter_literal(&self) -> String {
        match self {
            PrimaryKey::Int(v) => v.to_string(),
            PrimaryKey::Str(s) => format!("'{}'", s.replace('\'', "\\'")),
        }
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKey::Int(v) => write!(f, "{v}"),
            PrimaryKey::Str(s) => write!(f, "{s}"),
        }
    }
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: PrimaryKey,
    pub distance: f32,
    #[serde(default)]
    pub fields: Row,
}

/// A structured (non-vector) query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryRequest {
    pub filter: String,
    pub output_fields: Vec<String>,
    pub limit: Option<usize>,
}

impl QueryRequest {
    pub fn new(filter: impl Into<String>, output_fields: Vec<String>) -> Self {
        Self {
            filter: filter.into(),
            output_fields,
            limit: None,
        }
    }
}

/// Result of an insert call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InsertResult {
    pub insert_count: u64,
    pub ids: Vec<PrimaryKey>,
}

impl fmt::Display for InsertResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.ids.iter().map(ToString::to_string).collect();
        write!(f, "(insert count: {}, ids: [{}])", self.insert_count, ids.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_serde_names() {
        assert_eq!(serde_json::to_string(&MetricType::L2).unwrap(), "\"L2\"");
        assert_eq!(serde_json::to_string(&MetricType::Cosine).unwrap(), "\"COSINE\"");
        assert!(MetricType::L2.smaller_is_closer());
        assert!(!MetricType::IP.smaller_is_closer());
    }

    #[test]
    fn test_index_type_names() {
        assert_eq!(serde_json::to_string(&IndexType::AutoIndex).unwrap(), "\"AUTOINDEX\"");
        assert_eq!(serde_json::to_string(&IndexType::IvfFlat).unwrap(), "\"IVF_FLAT\"");
        assert_eq!(IndexType::Hnsw.as_str(), "HNSW");
    }

    #[test]
    fn test_index_params_fill_required_build_params() {
        let auto = IndexParams::auto("book_intro", MetricType::L2);
        assert_eq!(auto.index_type, IndexType::AutoIndex);
        assert!(auto.params.is_empty());

        let ivf = IndexParams::new("book_intro", IndexType::IvfFlat, MetricType::IP);
        assert_eq!(ivf.params["nlist"], 128);
        assert_eq!(ivf.metric_type, MetricType::IP);

        let hnsw = IndexParams::new("book_intro", IndexType::Hnsw, MetricType::L2);
        assert_eq!(hnsw.params["M"], 16);
        assert_eq!(hnsw.params["efConstruction"], 200);

        assert!(IndexParams::new("v", IndexType::Flat, MetricType::L2).params.is_empty());
        assert_eq!(IndexType::IvfFlat.to_string(), "IVF_FLAT");
    }

    #[test]
    fn test_primary_key_from_json() {
        assert_eq!(
            PrimaryKey::from_json(&serde_json::json!(42)),
            Some(PrimaryKey::Int(42))
        );
        assert_eq!(
            PrimaryKey::from_json(&serde_json::json!("abc")),
            Some(PrimaryKey::Str("abc".into()))
        );
        assert_eq!(PrimaryKey::from_json(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_primary_key_filter_literal() {
        assert_eq!(PrimaryKey::Int(7).to_filter_literal(), "7");
        assert_eq!(PrimaryKey::Str("it's".into()).to_filter_literal(), "'it\\'s'");
    }

    #[test]
    fn test_search_params_with_level() {
        let params = SearchParams::new(MetricType::L2).with_param("level", 2);
        assert_eq!(params.params["level"], 2);
    }

    #[test]
    fn test_insert_result_display() {
        let result = InsertResult {
            insert_count: 2,
            ids: vec![PrimaryKey::Int(0), PrimaryKey::Int(1)],
        };
        assert_eq!(result.to_string(), "(insert count: 2, ids: [0, 1])");
    }
}
