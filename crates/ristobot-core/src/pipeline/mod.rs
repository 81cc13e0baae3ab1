//! The two demo pipelines.
//!
//! Both are strictly sequential: each stage is awaited before the next one
//! starts, and the first failure aborts the run. Progress is reported to the
//! caller through [`PipelineEvent`]s so the CLI can print step lines and
//! timings as they happen.

pub mod book;
pub mod sentence;

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use ristobot_types::error::{EmbedError, SchemaError, VectorDbError};

/// One step of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DefineSchema,
    DropExisting,
    CreateCollection,
    Embed,
    PrepareData,
    Insert,
    Flush,
    BuildIndex,
    LoadCollection,
    Search,
    Query,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::DefineSchema => "Define the collection schema",
            Stage::DropExisting => "Drop the collection if it exists",
            Stage::CreateCollection => "Create the collection",
            Stage::Embed => "Generate sentence embeddings",
            Stage::PrepareData => "Prepare data",
            Stage::Insert => "Insert",
            Stage::Flush => "Flush collection",
            Stage::BuildIndex => "Build the vector index",
            Stage::LoadCollection => "Load collection",
            Stage::Search => "Search",
            Stage::Query => "Query",
        };
        f.write_str(label)
    }
}

/// Progress notification emitted while a pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Started(Stage),
    Finished { stage: Stage, elapsed: Duration },
}

/// Any failure that aborts a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    VectorDb(#[from] VectorDbError),

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error("{0}")]
    InvalidOptions(String),
}

/// Run `work` as `stage`, reporting start and finish with the elapsed time.
pub(crate) async fn run_stage<T, E, F>(
    stage: Stage,
    observer: &mut impl FnMut(PipelineEvent),
    work: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, E>>,
    PipelineError: From<E>,
{
    observer(PipelineEvent::Started(stage));
    let started = Instant::now();
    let value = work.await?;
    let elapsed = started.elapsed();
    tracing::debug!(%stage, elapsed_ms = elapsed.as_millis() as u64, "stage finished");
    observer(PipelineEvent::Finished { stage, elapsed });
    Ok(value)
}
