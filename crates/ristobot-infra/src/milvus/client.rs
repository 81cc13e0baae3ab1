//! MilvusClient -- concrete [`VectorDatabase`] over the Milvus RESTful API.
//!
//! Works against a self-hosted Milvus (`http://localhost:19530`, token
//! `user:password`) or a Zilliz Cloud endpoint (API key token). Every call is
//! a `POST` to `/v2/vectordb/...` with a bearer token; responses carry a
//! `code` that must be `0` for success.
//!
//! The token is held as a [`SecretString`] and only exposed when building
//! the `Authorization` header.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use ristobot_core::vectordb::VectorDatabase;
use ristobot_types::entity::{Entity, Row};
use ristobot_types::error::VectorDbError;
use ristobot_types::schema::CollectionSchema;
use ristobot_types::search::{
    IndexParams, InsertResult, PrimaryKey, QueryRequest, SearchHit, SearchRequest,
};

use crate::config::ConnectionProfile;

use super::types::{
    CollectionNameBody, CreateCollectionBody, CreateIndexBody, Envelope, HasData, InsertBody,
    InsertData, LoadStateData, QueryBody, SearchBody, StatsData, WireIndexParams, WireSchema,
    LOAD_STATE_LOADED,
};

/// Milvus error codes that mean the credentials were rejected.
const AUTH_ERROR_CODES: [i64; 2] = [80, 1800];

/// Tuning knobs for [`MilvusClient`].
#[derive(Debug, Clone)]
pub struct MilvusOptions {
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Upper bound on waiting for a collection to finish loading.
    pub load_timeout: Duration,
    /// Delay between load state polls.
    pub poll_interval: Duration,
}

impl Default for MilvusOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            load_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Session with one Milvus endpoint.
///
/// Does not derive Debug; the token lives here.
pub struct MilvusClient {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
    options: MilvusOptions,
}

impl MilvusClient {
    /// Build a client without contacting the server.
    pub fn new(profile: ConnectionProfile, options: MilvusOptions) -> Result<Self, VectorDbError> {
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| VectorDbError::Connection(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: normalize_uri(&profile.uri),
            token: profile.token,
            options,
        })
    }

    /// Build a client and verify the endpoint and token with a cheap call.
    pub async fn connect(
        profile: ConnectionProfile,
        options: MilvusOptions,
    ) -> Result<Self, VectorDbError> {
        let client = Self::new(profile, options)?;
        let collections = client.list_collections().await?;
        tracing::info!(
            uri = %client.base_url,
            collections = collections.len(),
            "connected to Milvus"
        );
        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/vectordb{}", self.base_url, path)
    }

    /// POST `body` to `path` and unwrap the response envelope.
    async fn call<B, T>(&self, path: &str, body: &B) -> Result<Envelope<T>, VectorDbError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!(%url, "milvus request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .header("accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VectorDbError::Timeout(format!("{path}: {e}"))
                } else {
                    VectorDbError::Connection(format!("{url}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => VectorDbError::Unauthorized,
                _ => VectorDbError::Server {
                    code: i64::from(status.as_u16()),
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| VectorDbError::InvalidResponse(format!("{path}: {e}")))?;

        if !envelope.is_success() {
            let message = envelope.message.unwrap_or_default();
            if AUTH_ERROR_CODES.contains(&envelope.code) {
                return Err(VectorDbError::Unauthorized);
            }
            return Err(VectorDbError::Server {
                code: envelope.code,
                message,
            });
        }

        Ok(envelope)
    }

    /// Call an endpoint whose `data` is required.
    async fn fetch<B, T>(&self, path: &str, body: &B) -> Result<T, VectorDbError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call::<B, T>(path, body)
            .await?
            .data
            .ok_or_else(|| VectorDbError::InvalidResponse(format!("{path}: missing data")))
    }

    /// Call an endpoint whose `data` is ignored.
    async fn execute<B>(&self, path: &str, body: &B) -> Result<(), VectorDbError>
    where
        B: Serialize + ?Sized,
    {
        self.call::<B, Value>(path, body).await.map(|_| ())
    }

    async fn load_state(&self, collection: &str) -> Result<String, VectorDbError> {
        let data: LoadStateData = self
            .fetch(
                "/collections/get_load_state",
                &CollectionNameBody {
                    collection_name: collection,
                },
            )
            .await?;
        Ok(data.load_state)
    }

    async fn ensure_exists(&self, collection: &str) -> Result<(), VectorDbError> {
        if self.has_collection(collection).await? {
            Ok(())
        } else {
            Err(VectorDbError::CollectionNotFound(collection.to_string()))
        }
    }
}

/// Trim trailing slashes and default the scheme to `http://`.
fn normalize_uri(uri: &str) -> String {
    let uri = uri.trim().trim_end_matches('/');
    if uri.starts_with("http://") || uri.starts_with("https://") {
        uri.to_string()
    } else {
        format!("http://{uri}")
    }
}

/// Milvus may return int64 keys as JSON strings to avoid precision loss.
fn parse_key(value: &Value) -> Option<PrimaryKey> {
    match value {
        Value::String(s) => Some(
            s.parse::<i64>()
                .map(PrimaryKey::Int)
                .unwrap_or_else(|_| PrimaryKey::Str(s.clone())),
        ),
        other => PrimaryKey::from_json(other),
    }
}

/// Turn one search result row into a hit.
fn parse_hit(mut row: Row, primary_field: &str) -> Result<SearchHit, VectorDbError> {
    let distance = row
        .remove("distance")
        .and_then(|d| d.as_f64())
        .ok_or_else(|| VectorDbError::InvalidResponse("search hit without distance".to_string()))?
        as f32;

    let id = row
        .get(primary_field)
        .or_else(|| row.get("id"))
        .and_then(parse_key)
        .ok_or_else(|| {
            VectorDbError::InvalidResponse(format!("search hit without '{primary_field}'"))
        })?;

    Ok(SearchHit {
        id,
        distance,
        fields: row,
    })
}

impl VectorDatabase for MilvusClient {
    fn backend_name(&self) -> &str {
        "milvus"
    }

    async fn list_collections(&self) -> Result<Vec<String>, VectorDbError> {
        let body = serde_json::Map::new();
        let names: Option<Vec<String>> = self.call("/collections/list", &body).await?.data;
        Ok(names.unwrap_or_default())
    }

    async fn has_collection(&self, name: &str) -> Result<bool, VectorDbError> {
        let data: HasData = self
            .fetch(
                "/collections/has",
                &CollectionNameBody {
                    collection_name: name,
                },
            )
            .await?;
        Ok(data.has)
    }

    async fn create_collection(
        &self,
        name: &str,
        schema: &CollectionSchema,
    ) -> Result<(), VectorDbError> {
        if self.has_collection(name).await? {
            return Err(VectorDbError::CollectionExists(name.to_string()));
        }

        let body = CreateCollectionBody {
            collection_name: name,
            description: schema.description(),
            schema: WireSchema::from(schema),
        };
        self.execute("/collections/create", &body).await?;
        tracing::info!(collection = name, fields = schema.fields().len(), "created collection");
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<(), VectorDbError> {
        self.ensure_exists(name).await?;
        self.execute(
            "/collections/drop",
            &CollectionNameBody {
                collection_name: name,
            },
        )
        .await?;
        tracing::info!(collection = name, "dropped collection");
        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        entities: &[Entity],
    ) -> Result<InsertResult, VectorDbError> {
        let body = InsertBody {
            collection_name: collection,
            data: entities.iter().map(Entity::to_json).collect(),
        };
        let data: InsertData = self.fetch("/entities/insert", &body).await?;

        let ids = data
            .insert_ids
            .iter()
            .map(|v| {
                parse_key(v).ok_or_else(|| {
                    VectorDbError::InvalidResponse(format!("unexpected insert id: {v}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(collection, count = data.insert_count, "inserted entities");
        Ok(InsertResult {
            insert_count: data.insert_count,
            ids,
        })
    }

    async fn flush(&self, collection: &str) -> Result<(), VectorDbError> {
        self.execute(
            "/collections/flush",
            &CollectionNameBody {
                collection_name: collection,
            },
        )
        .await
    }

    async fn create_index(
        &self,
        collection: &str,
        params: &IndexParams,
    ) -> Result<(), VectorDbError> {
        let body = CreateIndexBody {
            collection_name: collection,
            index_params: vec![WireIndexParams::from(params)],
        };
        self.execute("/indexes/create", &body).await?;
        tracing::info!(
            collection,
            field = %params.field_name,
            index_type = params.index_type.as_str(),
            metric = params.metric_type.as_str(),
            "created index"
        );
        Ok(())
    }

    async fn load_collection(&self, collection: &str) -> Result<(), VectorDbError> {
        self.execute(
            "/collections/load",
            &CollectionNameBody {
                collection_name: collection,
            },
        )
        .await?;

        let started = Instant::now();
        loop {
            let state = self.load_state(collection).await?;
            if state == LOAD_STATE_LOADED {
                tracing::debug!(
                    collection,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "collection loaded"
                );
                return Ok(());
            }
            if started.elapsed() >= self.options.load_timeout {
                return Err(VectorDbError::Timeout(format!(
                    "collection '{collection}' still in {state} after {:?}",
                    self.options.load_timeout
                )));
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    async fn count(&self, collection: &str) -> Result<u64, VectorDbError> {
        let data: StatsData = self
            .fetch(
                "/collections/get_stats",
                &CollectionNameBody {
                    collection_name: collection,
                },
            )
            .await?;
        Ok(data.row_count)
    }

    async fn search(
        &self,
        collection: &str,
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>, VectorDbError> {
        let rows: Vec<Row> = self
            .fetch("/entities/search", &SearchBody::new(collection, request))
            .await?;
        rows.into_iter()
            .map(|row| parse_hit(row, &request.primary_field))
            .collect()
    }

    async fn query(
        &self,
        collection: &str,
        request: &QueryRequest,
    ) -> Result<Vec<Row>, VectorDbError> {
        if request.filter.trim().is_empty() {
            return Err(VectorDbError::Filter("query filter is empty".to_string()));
        }
        self.fetch("/entities/query", &QueryBody::new(collection, request))
            .await
    }

    async fn close(&self) -> Result<(), VectorDbError> {
        tracing::debug!(uri = %self.base_url, "closing Milvus session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn normalize_uri_adds_scheme_and_trims() {
        assert_eq!(normalize_uri("localhost:19530"), "http://localhost:19530");
        assert_eq!(
            normalize_uri("https://in03-abc.zillizcloud.com/"),
            "https://in03-abc.zillizcloud.com"
        );
        assert_eq!(normalize_uri(" http://h:1 "), "http://h:1");
    }

    #[test]
    fn parse_key_accepts_stringified_ints() {
        assert_eq!(parse_key(&json!(7)), Some(PrimaryKey::Int(7)));
        assert_eq!(
            parse_key(&json!("449953225164000001")),
            Some(PrimaryKey::Int(449953225164000001))
        );
        assert_eq!(parse_key(&json!("abc")), Some(PrimaryKey::Str("abc".into())));
        assert_eq!(parse_key(&json!(null)), None);
    }

    #[test]
    fn parse_hit_reads_distance_and_primary_key() {
        let row = json!({"distance": 0.25, "book_id": 1})
            .as_object()
            .cloned()
            .unwrap();
        let hit = parse_hit(row, "book_id").unwrap();
        assert_eq!(hit.id, PrimaryKey::Int(1));
        assert!((hit.distance - 0.25).abs() < f32::EPSILON);
        assert!(!hit.fields.contains_key("distance"));
        assert_eq!(hit.fields["book_id"], 1);
    }

    #[test]
    fn parse_hit_falls_back_to_id_key() {
        let row = json!({"distance": 1.0, "id": 3}).as_object().cloned().unwrap();
        let hit = parse_hit(row, "book_id").unwrap();
        assert_eq!(hit.id, PrimaryKey::Int(3));
    }

    #[test]
    fn parse_hit_without_distance_is_invalid() {
        let row = json!({"book_id": 1}).as_object().cloned().unwrap();
        assert!(matches!(
            parse_hit(row, "book_id"),
            Err(VectorDbError::InvalidResponse(_))
        ));
    }
}
