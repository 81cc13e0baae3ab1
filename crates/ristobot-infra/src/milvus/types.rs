//! Milvus RESTful API (v2) request/response types.
//!
//! These mirror the JSON bodies of `/v2/vectordb/...`. They are NOT the
//! backend-agnostic types from ristobot-types; conversion happens in the
//! client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use ristobot_types::schema::{CollectionSchema, DataType, FieldSchema};
use ristobot_types::search::{IndexParams, QueryRequest, SearchRequest};

/// Every response is wrapped in `{ "code": 0, "message": ..., "data": ... }`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Milvus reports success as `0`; some proxies use `200`.
    pub fn is_success(&self) -> bool {
        self.code == 0 || self.code == 200
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionNameBody<'a> {
    pub collection_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionBody<'a> {
    pub collection_name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'a str,
    pub schema: WireSchema,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSchema {
    pub auto_id: bool,
    pub enabled_dynamic_field: bool,
    pub fields: Vec<WireField>,
}

impl From<&CollectionSchema> for WireSchema {
    fn from(schema: &CollectionSchema) -> Self {
        Self {
            auto_id: schema.auto_id(),
            enabled_dynamic_field: false,
            fields: schema.fields().iter().map(WireField::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireField {
    pub field_name: String,
    pub data_type: &'static str,
    pub is_primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_type_params: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl From<&FieldSchema> for WireField {
    fn from(field: &FieldSchema) -> Self {
        let element_type_params = match field.data_type {
            DataType::Int64 => None,
            DataType::FloatVector { dim } => {
                let mut params = Map::new();
                params.insert("dim".to_string(), Value::from(dim));
                Some(params)
            }
            DataType::VarChar { max_length } => {
                let mut params = Map::new();
                params.insert("max_length".to_string(), Value::from(max_length));
                Some(params)
            }
        };

        Self {
            field_name: field.name.clone(),
            data_type: field.data_type.wire_name(),
            is_primary: field.is_primary,
            description: field.description.clone(),
            element_type_params,
            default_value: field.default_value.as_ref().map(|v| v.to_json()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertBody<'a> {
    pub collection_name: &'a str,
    pub data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertData {
    #[serde(default)]
    pub insert_count: u64,
    #[serde(default)]
    pub insert_ids: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIndexBody<'a> {
    pub collection_name: &'a str,
    pub index_params: Vec<WireIndexParams>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireIndexParams {
    pub field_name: String,
    pub index_name: String,
    pub metric_type: &'static str,
    pub index_type: &'static str,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl From<&IndexParams> for WireIndexParams {
    fn from(params: &IndexParams) -> Self {
        Self {
            field_name: params.field_name.clone(),
            index_name: params.field_name.clone(),
            metric_type: params.metric_type.as_str(),
            index_type: params.index_type.as_str(),
            params: params.params.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBody<'a> {
    pub collection_name: &'a str,
    pub data: Vec<&'a [f32]>,
    pub anns_field: &'a str,
    pub limit: usize,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub output_fields: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<&'a str>,
    pub search_params: WireSearchParams<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSearchParams<'a> {
    pub metric_type: &'static str,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: &'a Map<String, Value>,
}

impl<'a> SearchBody<'a> {
    pub fn new(collection_name: &'a str, request: &'a SearchRequest) -> Self {
        Self {
            collection_name,
            data: vec![request.vector.as_slice()],
            anns_field: &request.anns_field,
            limit: request.limit,
            output_fields: &request.output_fields,
            filter: request.filter.as_deref().filter(|f| !f.trim().is_empty()),
            search_params: WireSearchParams {
                metric_type: request.params.metric_type.as_str(),
                params: &request.params.params,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBody<'a> {
    pub collection_name: &'a str,
    pub filter: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub output_fields: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl<'a> QueryBody<'a> {
    pub fn new(collection_name: &'a str, request: &'a QueryRequest) -> Self {
        Self {
            collection_name,
            filter: &request.filter,
            output_fields: &request.output_fields,
            limit: request.limit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HasData {
    pub has: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStateData {
    pub load_state: String,
}

/// Load state reported once a collection is fully loaded.
pub const LOAD_STATE_LOADED: &str = "LoadStateLoaded";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub row_count: u64,
}

#[cfg(test)]
mod tests {
    use ristobot_types::entity::FieldValue;
    use ristobot_types::search::{IndexParams, IndexType, MetricType, SearchParams};
    use serde_json::json;

    use super::*;

    #[test]
    fn schema_serializes_to_rest_shape() {
        let schema = CollectionSchema::new(
            vec![
                FieldSchema::int64("book_id").primary(),
                FieldSchema::float_vector("book_intro", 384),
                FieldSchema::varchar("sentence", 1000)
                    .with_description("book sentence")
                    .with_default(FieldValue::VarChar(String::new())),
            ],
            "my first book collection",
        )
        .unwrap();

        let body = CreateCollectionBody {
            collection_name: "book",
            description: schema.description(),
            schema: WireSchema::from(&schema),
        };
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["collectionName"], "book");
        assert_eq!(value["schema"]["autoId"], false);
        assert_eq!(value["schema"]["enabledDynamicField"], false);
        let fields = value["schema"]["fields"].as_array().unwrap();
        assert_eq!(
            fields[0],
            json!({"fieldName": "book_id", "dataType": "Int64", "isPrimary": true})
        );
        assert_eq!(fields[1]["dataType"], "FloatVector");
        assert_eq!(fields[1]["elementTypeParams"]["dim"], 384);
        assert_eq!(fields[2]["elementTypeParams"]["max_length"], 1000);
        assert_eq!(fields[2]["defaultValue"], "");
        assert_eq!(fields[2]["description"], "book sentence");
    }

    #[test]
    fn search_body_omits_empty_filter() {
        let request = SearchRequest {
            vector: vec![0.5, 0.25],
            anns_field: "book_intro".to_string(),
            params: SearchParams::new(MetricType::L2).with_param("level", 2),
            limit: 1,
            output_fields: vec!["book_id".to_string()],
            filter: Some("  ".to_string()),
            primary_field: "book_id".to_string(),
        };
        let value = serde_json::to_value(SearchBody::new("book", &request)).unwrap();
        assert_eq!(value["data"], json!([[0.5, 0.25]]));
        assert_eq!(value["annsField"], "book_intro");
        assert_eq!(value["searchParams"]["metricType"], "L2");
        assert_eq!(value["searchParams"]["params"]["level"], 2);
        assert!(value.get("filter").is_none());
    }

    #[test]
    fn envelope_success_codes() {
        let ok: Envelope<Value> = serde_json::from_str(r#"{"code":0,"data":{}}"#).unwrap();
        assert!(ok.is_success());
        let also_ok: Envelope<Value> = serde_json::from_str(r#"{"code":200}"#).unwrap();
        assert!(also_ok.is_success());
        let err: Envelope<Value> =
            serde_json::from_str(r#"{"code":1100,"message":"bad"}"#).unwrap();
        assert!(!err.is_success());
        assert_eq!(err.message.as_deref(), Some("bad"));
    }

    #[test]
    fn hnsw_index_carries_build_params() {
        let index = IndexParams::new("book_intro", IndexType::Hnsw, MetricType::Cosine);
        let wire = serde_json::to_value(WireIndexParams::from(&index)).unwrap();
        assert_eq!(wire["indexType"], json!("HNSW"));
        assert_eq!(wire["metricType"], json!("COSINE"));
        assert_eq!(wire["params"], json!({ "M": 16, "efConstruction": 200 }));

        let auto = IndexParams::auto("book_intro", MetricType::L2);
        let wire = serde_json::to_value(WireIndexParams::from(&auto)).unwrap();
        assert_eq!(wire["indexType"], json!("AUTOINDEX"));
        assert!(wire.get("params").is_none());
    }
}
