//! CLI command definitions and dispatch for the `ristobot` binary.
//!
//! Uses clap derive macros for argument parsing. The two demo pipelines are
//! `ingest` and `book`; the remaining commands inspect what they left behind.

pub mod book;
pub mod ingest;
pub mod inspect;
pub mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use ristobot_core::pipeline::{book as book_pipeline, sentence as sentence_pipeline};
use ristobot_infra::config::DEFAULT_CONFIG_FILE;
use ristobot_infra::vectordb::BackendKind;
use ristobot_types::search::{IndexType, MetricType};

/// Embed sentences and search them in Milvus.
#[derive(Parser)]
#[command(name = "ristobot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// INI file holding `[section] uri/token` entries.
    #[arg(long, global = true, env = "RISTOBOT_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Config section to read the endpoint from (defaults per command).
    #[arg(long, global = true)]
    pub section: Option<String>,

    /// Vector database URI; overrides the config file.
    #[arg(long, global = true, env = "RISTOBOT_URI")]
    pub uri: Option<String>,

    /// Access token (`user:password` or API key); overrides the config file.
    #[arg(long, global = true, env = "RISTOBOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Local sentence-transformers ONNX export to embed with.
    #[arg(long, global = true, env = "RISTOBOT_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Vector database backend (`milvus` or `memory`).
    #[arg(long, global = true, default_value = "milvus")]
    pub backend: BackendKind,

    /// Seconds to wait for a collection to finish loading.
    #[arg(long, global = true, default_value_t = 120)]
    pub load_timeout: u64,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write log lines as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Embed sentences into a fresh auto-id collection (no index, no search).
    Ingest {
        /// Target collection; dropped and recreated.
        #[arg(long, default_value = sentence_pipeline::DEFAULT_COLLECTION)]
        collection: String,

        /// Sentences to embed (defaults to three sample sentences).
        sentences: Vec<String>,
    },

    /// Ingest books, build an AUTOINDEX, search, and query the best match.
    Book {
        /// Target collection; dropped and recreated.
        #[arg(long, default_value = book_pipeline::DEFAULT_COLLECTION)]
        collection: String,

        /// Free text to search for.
        #[arg(long, short = 'q', default_value = "pera")]
        query: String,

        /// Number of nearest neighbours to return.
        #[arg(long, default_value_t = 1)]
        top_k: usize,

        /// Distance metric for the index and the search.
        #[arg(long, value_enum, default_value_t = MetricArg::L2)]
        metric: MetricArg,

        /// Vector index type to build.
        #[arg(long, value_enum, default_value_t = IndexArg::Auto)]
        index_type: IndexArg,

        /// Search `level` parameter (AUTOINDEX only).
        #[arg(long, default_value_t = 2)]
        level: i64,

        /// Seed for the random word counts.
        #[arg(long)]
        seed: Option<u64>,

        /// Book sentences (defaults to mela, pera, banana).
        sentences: Vec<String>,
    },

    /// List collections.
    #[command(alias = "ls")]
    Collections,

    /// Count flushed rows in a collection.
    Count {
        /// Collection name.
        collection: String,
    },

    /// Embed a text and search a collection for its nearest rows.
    Search {
        /// Collection name.
        collection: String,

        /// Text to embed and search for.
        text: String,

        /// Vector field to search.
        #[arg(long, default_value = book_pipeline::VECTOR_FIELD)]
        field: String,

        /// Primary key field name.
        #[arg(long, default_value = book_pipeline::PRIMARY_FIELD)]
        primary_field: String,

        /// Maximum number of hits.
        #[arg(long, short = 'k', default_value_t = 3)]
        limit: usize,

        /// Boolean filter expression, e.g. `word_count > 10`.
        #[arg(long)]
        filter: Option<String>,

        /// Fields to return with each hit.
        #[arg(long, value_delimiter = ',')]
        output_fields: Vec<String>,

        /// Distance metric.
        #[arg(long, value_enum, default_value_t = MetricArg::L2)]
        metric: MetricArg,
    },

    /// Fetch rows matching a filter expression.
    Query {
        /// Collection name.
        collection: String,

        /// Filter expression, e.g. `book_id == 1`.
        filter: String,

        /// Fields to return.
        #[arg(long, value_delimiter = ',')]
        output_fields: Vec<String>,

        /// Maximum number of rows.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Drop a collection and all of its data.
    #[command(alias = "rm")]
    Drop {
        /// Collection name.
        collection: String,

        /// Skip confirmation prompt.
        #[arg(long, short)]
        force: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Commands {
    /// Short name used in spans and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Ingest { .. } => "ingest",
            Commands::Book { .. } => "book",
            Commands::Collections => "collections",
            Commands::Count { .. } => "count",
            Commands::Search { .. } => "search",
            Commands::Query { .. } => "query",
            Commands::Drop { .. } => "drop",
            Commands::Completions { .. } => "completions",
        }
    }
}

/// Distance metric choices on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    L2,
    Ip,
    Cosine,
}

impl From<MetricArg> for MetricType {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::L2 => MetricType::L2,
            MetricArg::Ip => MetricType::IP,
            MetricArg::Cosine => MetricType::Cosine,
        }
    }
}

/// Vector index choices on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexArg {
    Auto,
    Flat,
    IvfFlat,
    Hnsw,
}

impl From<IndexArg> for IndexType {
    fn from(arg: IndexArg) -> Self {
        match arg {
            IndexArg::Auto => IndexType::AutoIndex,
            IndexArg::Flat => IndexType::Flat,
            IndexArg::IvfFlat => IndexType::IvfFlat,
            IndexArg::Hnsw => IndexType::Hnsw,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn book_defaults() {
        let cli = Cli::try_parse_from(["ristobot", "book"]).unwrap();
        match cli.command {
            Commands::Book {
                collection,
                query,
                top_k,
                metric,
                index_type,
                level,
                seed,
                sentences,
            } => {
                assert_eq!(collection, "book");
                assert_eq!(query, "pera");
                assert_eq!(top_k, 1);
                assert_eq!(metric, MetricArg::L2);
                assert_eq!(IndexType::from(index_type), IndexType::AutoIndex);
                assert_eq!(level, 2);
                assert!(seed.is_none());
                assert!(sentences.is_empty());
            }
            _ => panic!("expected book"),
        }
        assert_eq!(cli.backend, BackendKind::Milvus);
        assert_eq!(cli.config, PathBuf::from("config.ini"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ristobot",
            "ingest",
            "hello",
            "world",
            "--backend",
            "memory",
            "--json",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.backend, BackendKind::Memory);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ingest {
                collection,
                sentences,
            } => {
                assert_eq!(collection, "ristobot");
                assert_eq!(sentences, vec!["hello", "world"]);
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn search_output_fields_split_on_commas() {
        let cli = Cli::try_parse_from([
            "ristobot",
            "search",
            "book",
            "pera",
            "--output-fields",
            "book_id,word_count",
            "--metric",
            "cosine",
        ])
        .unwrap();
        match cli.command {
            Commands::Search {
                output_fields,
                metric,
                limit,
                ..
            } => {
                assert_eq!(output_fields, vec!["book_id", "word_count"]);
                assert_eq!(MetricType::from(metric), MetricType::Cosine);
                assert_eq!(limit, 3);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn book_index_type_flag() {
        let cli = Cli::try_parse_from([
            "ristobot",
            "book",
            "--index-type",
            "hnsw",
            "--metric",
            "cosine",
        ])
        .unwrap();
        match cli.command {
            Commands::Book {
                index_type, metric, ..
            } => {
                assert_eq!(IndexType::from(index_type), IndexType::Hnsw);
                assert_eq!(MetricType::from(metric), MetricType::Cosine);
            }
            _ => panic!("expected book"),
        }
        assert!(Cli::try_parse_from(["ristobot", "book", "--index-type", "ivf-flat"]).is_ok());
        assert!(Cli::try_parse_from(["ristobot", "book", "--index-type", "diskann"]).is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        assert!(Cli::try_parse_from(["ristobot", "collections", "--backend", "lance"]).is_err());
    }

    #[test]
    fn command_names() {
        let cli = Cli::try_parse_from(["ristobot", "rm", "book", "--force"]).unwrap();
        assert_eq!(cli.command.name(), "drop");
    }
}
