//! Book search pipeline.
//!
//! Resets a collection with a caller-supplied `book_id` primary key, a word
//! count, a 384-wide `book_intro` vector and the source sentence, inserts one
//! row per sentence from parallel column arrays, flushes, builds a vector
//! index (AUTOINDEX with L2 unless told otherwise), loads the collection,
//! then searches for a free-text query. Each hit is resolved twice: its
//! sentence is looked up locally by id, and its row is fetched back with a
//! `book_id == <id>` query.

use std::collections::BTreeMap;

use ristobot_types::entity::{Column, ColumnBatch, FieldValue, Row};
use ristobot_types::error::SchemaError;
use ristobot_types::schema::{CollectionSchema, FieldSchema};
use ristobot_types::search::{
    IndexParams, IndexType, InsertResult, MetricType, QueryRequest, SearchHit, SearchParams,
    SearchRequest,
};

use crate::collection::drop_if_exists;
use crate::embedder::{check_embeddings, embed_one, Embedder};
use crate::filter::eq_filter;
use crate::ingest::Ingestor;
use crate::vectordb::VectorDatabase;

use super::{run_stage, PipelineError, PipelineEvent, Stage};

pub const DEFAULT_COLLECTION: &str = "book";
pub const PRIMARY_FIELD: &str = "book_id";
pub const WORD_COUNT_FIELD: &str = "word_count";
pub const VECTOR_FIELD: &str = "book_intro";
pub const SENTENCE_FIELD: &str = "sentence";
pub const SENTENCE_MAX_LENGTH: usize = 1000;

/// Inputs for [`run_book_search`].
#[derive(Debug, Clone)]
pub struct BookSearchOptions {
    pub collection: String,
    pub sentences: Vec<String>,
    /// One word count per sentence.
    pub word_counts: Vec<i64>,
    pub search_text: String,
    pub top_k: usize,
    pub metric: MetricType,
    pub index_type: IndexType,
    /// Search `level`; only sent for AUTOINDEX.
    pub search_level: i64,
}

impl BookSearchOptions {
    /// The stock demo data with the given word counts.
    pub fn demo(word_counts: Vec<i64>) -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            sentences: vec!["mela".to_string(), "pera".to_string(), "banana".to_string()],
            word_counts,
            search_text: "pera".to_string(),
            top_k: 1,
            metric: MetricType::L2,
            index_type: IndexType::AutoIndex,
            search_level: 2,
        }
    }
}

/// A search hit with its locally resolved sentence and re-queried rows.
#[derive(Debug, Clone)]
pub struct ResolvedHit {
    pub hit: SearchHit,
    pub sentence: Option<String>,
    pub filter: String,
    pub rows: Vec<Row>,
}

/// What the pipeline did.
#[derive(Debug, Clone)]
pub struct BookSearchReport {
    pub collection: String,
    pub dropped_existing: bool,
    pub schema: CollectionSchema,
    pub insert: InsertResult,
    pub search_text: String,
    pub hits: Vec<ResolvedHit>,
}

/// `book_id` (user-supplied), `word_count`, `book_intro`, `sentence`.
pub fn book_schema(dimension: usize) -> Result<CollectionSchema, SchemaError> {
    CollectionSchema::new(
        vec![
            FieldSchema::int64(PRIMARY_FIELD)
                .primary()
                .with_description("customized primary id"),
            FieldSchema::int64(WORD_COUNT_FIELD).with_description("word count"),
            FieldSchema::float_vector(VECTOR_FIELD, dimension),
            FieldSchema::varchar(SENTENCE_FIELD, SENTENCE_MAX_LENGTH)
                .with_description("book sentence")
                .with_default(FieldValue::VarChar(String::new())),
        ],
        "my first book collection",
    )
}

/// Run the book search pipeline end to end.
///
/// A search that returns no hits is not an error: the report simply has an
/// empty `hits` list and no follow-up query is issued.
pub async fn run_book_search<D: VectorDatabase, E: Embedder>(
    db: &D,
    embedder: &E,
    options: &BookSearchOptions,
    mut observer: impl FnMut(PipelineEvent),
) -> Result<BookSearchReport, PipelineError> {
    if options.word_counts.len() != options.sentences.len() {
        return Err(PipelineError::InvalidOptions(format!(
            "{} word counts for {} sentences",
            options.word_counts.len(),
            options.sentences.len()
        )));
    }
    if options.top_k == 0 {
        return Err(PipelineError::InvalidOptions("top_k must be at least 1".to_string()));
    }

    let collection = options.collection.as_str();

    let schema = run_stage(Stage::DefineSchema, &mut observer, async {
        book_schema(embedder.dimension())
    })
    .await?;

    let dropped_existing =
        run_stage(Stage::DropExisting, &mut observer, drop_if_exists(db, collection)).await?;

    run_stage(
        Stage::CreateCollection,
        &mut observer,
        db.create_collection(collection, &schema),
    )
    .await?;

    let embeddings = run_stage(Stage::Embed, &mut observer, async {
        let vectors = embedder.embed(&options.sentences).await?;
        check_embeddings(&vectors, options.sentences.len(), embedder.dimension())?;
        Ok::<_, PipelineError>(vectors)
    })
    .await?;

    let book_ids: Vec<i64> = (0..options.sentences.len() as i64).collect();
    let id_sentence_map: BTreeMap<i64, String> = book_ids
        .iter()
        .copied()
        .zip(options.sentences.iter().cloned())
        .collect();

    let entities = run_stage(Stage::PrepareData, &mut observer, async {
        ColumnBatch::new()
            .column(PRIMARY_FIELD, Column::Int64(book_ids.clone()))
            .column(WORD_COUNT_FIELD, Column::Int64(options.word_counts.clone()))
            .column(VECTOR_FIELD, Column::FloatVector(embeddings.clone()))
            .column(SENTENCE_FIELD, Column::VarChar(options.sentences.clone()))
            .into_entities()
    })
    .await?;

    let ingestor = Ingestor::new(db, collection, &schema);
    let insert = run_stage(Stage::Insert, &mut observer, ingestor.insert(&entities)).await?;
    run_stage(Stage::Flush, &mut observer, ingestor.flush()).await?;

    let index_params = IndexParams::new(VECTOR_FIELD, options.index_type, options.metric);
    run_stage(
        Stage::BuildIndex,
        &mut observer,
        db.create_index(collection, &index_params),
    )
    .await?;

    run_stage(Stage::LoadCollection, &mut observer, db.load_collection(collection)).await?;

    let query_vector = embed_one(embedder, &options.search_text).await?;
    let mut params = SearchParams::new(options.metric);
    if options.index_type == IndexType::AutoIndex {
        params = params.with_param("level", options.search_level);
    }
    let request = SearchRequest {
        vector: query_vector,
        anns_field: VECTOR_FIELD.to_string(),
        params,
        limit: options.top_k,
        output_fields: vec![PRIMARY_FIELD.to_string()],
        filter: None,
        primary_field: PRIMARY_FIELD.to_string(),
    };
    let hits = run_stage(Stage::Search, &mut observer, db.search(collection, &request)).await?;
    tracing::info!(
        collection,
        query = %options.search_text,
        hits = hits.len(),
        "search complete"
    );

    let output_fields = vec![
        PRIMARY_FIELD.to_string(),
        WORD_COUNT_FIELD.to_string(),
        SENTENCE_FIELD.to_string(),
    ];
    let mut resolved = Vec::with_capacity(hits.len());
    for hit in hits {
        let sentence = hit
            .id
            .as_i64()
            .and_then(|id| id_sentence_map.get(&id).cloned());
        let filter = eq_filter(PRIMARY_FIELD, &hit.id);
        let query = QueryRequest::new(filter.clone(), output_fields.clone());
        let rows = run_stage(Stage::Query, &mut observer, db.query(collection, &query)).await?;
        resolved.push(ResolvedHit {
            hit,
            sentence,
            filter,
            rows,
        });
    }

    Ok(BookSearchReport {
        collection: collection.to_string(),
        dropped_existing,
        schema,
        insert,
        search_text: options.search_text.clone(),
        hits: resolved,
    })
}
