//! Sentence ingest pipeline.
//!
//! Resets a collection with an auto-id primary key and a single vector
//! field, embeds a list of sentences, inserts one row per embedding, and
//! flushes. Nothing is indexed or searched.

use ristobot_types::entity::Entity;
use ristobot_types::error::SchemaError;
use ristobot_types::schema::{CollectionSchema, FieldSchema};
use ristobot_types::search::InsertResult;

use crate::collection::drop_if_exists;
use crate::embedder::{check_embeddings, Embedder};
use crate::ingest::Ingestor;
use crate::vectordb::VectorDatabase;

use super::{run_stage, PipelineError, PipelineEvent, Stage};

pub const DEFAULT_COLLECTION: &str = "ristobot";
pub const VECTOR_FIELD: &str = "ristodata";

/// Inputs for [`run_sentence_ingest`].
#[derive(Debug, Clone)]
pub struct SentenceIngestOptions {
    pub collection: String,
    pub sentences: Vec<String>,
}

impl Default for SentenceIngestOptions {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            sentences: vec![
                "This is an example sentence".to_string(),
                "Each string here gets embedded".to_string(),
                "The embeddings can then be indexed using Milvus".to_string(),
            ],
        }
    }
}

/// What the pipeline did.
#[derive(Debug, Clone)]
pub struct SentenceIngestReport {
    pub collection: String,
    pub dropped_existing: bool,
    pub schema: CollectionSchema,
    pub embeddings: Vec<Vec<f32>>,
    pub entities: Vec<Entity>,
    pub insert: InsertResult,
}

/// Auto-id primary key plus one `dimension`-wide vector field.
pub fn sentence_schema(dimension: usize) -> Result<CollectionSchema, SchemaError> {
    CollectionSchema::new(
        vec![
            FieldSchema::int64("id").primary().auto_id(),
            FieldSchema::float_vector(VECTOR_FIELD, dimension),
        ],
        "demo for inserting BERT vectors",
    )
}

/// Run the sentence ingest pipeline end to end.
pub async fn run_sentence_ingest<D: VectorDatabase, E: Embedder>(
    db: &D,
    embedder: &E,
    options: &SentenceIngestOptions,
    mut observer: impl FnMut(PipelineEvent),
) -> Result<SentenceIngestReport, PipelineError> {
    let collection = options.collection.as_str();

    let schema = run_stage(Stage::DefineSchema, &mut observer, async {
        sentence_schema(embedder.dimension())
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

    let entities = run_stage(Stage::PrepareData, &mut observer, async {
        Ok::<_, PipelineError>(
            embeddings
                .iter()
                .map(|v| Entity::new().with(VECTOR_FIELD, v.clone()))
                .collect::<Vec<_>>(),
        )
    })
    .await?;

    let ingestor = Ingestor::new(db, collection, &schema);
    let insert = run_stage(Stage::Insert, &mut observer, ingestor.insert(&entities)).await?;
    run_stage(Stage::Flush, &mut observer, ingestor.flush()).await?;

    tracing::info!(
        collection,
        rows = insert.insert_count,
        model = embedder.model_name(),
        "sentence ingest complete"
    );

    Ok(SentenceIngestReport {
        collection: collection.to_string(),
        dropped_existing,
        schema,
        embeddings,
        entities,
        insert,
    })
}
