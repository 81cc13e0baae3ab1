//! Ristobot CLI entry point.
//!
//! Binary name: `ristobot`
//!
//! Parses CLI arguments, sets up tracing, then dispatches to the command
//! handler. Each handler connects to the vector database itself.

mod cli;
mod state;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing::Instrument;

use ristobot_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_filter, LogFormat};
use ristobot_types::search::{IndexType, MetricType};

use cli::book::BookArgs;
use cli::inspect::SearchArgs;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need logging or a database
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "ristobot", &mut std::io::stdout());
        return Ok(());
    }

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(&verbosity_filter(cli.verbose, cli.quiet), format, cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let span = tracing::info_span!(
        "command",
        name = cli.command.name(),
        db.system = %cli.backend,
    );
    let result = run(&cli).instrument(span).await;

    shutdown_tracing();
    result
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Ingest {
            collection,
            sentences,
        } => cli::ingest::ingest(cli, collection, sentences.clone()).await,

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
            let args = BookArgs {
                collection: collection.clone(),
                query: query.clone(),
                top_k: *top_k,
                metric: MetricType::from(*metric),
                index_type: IndexType::from(*index_type),
                level: *level,
                seed: *seed,
                sentences: sentences.clone(),
            };
            cli::book::book(cli, args).await
        }

        Commands::Collections => cli::inspect::list_collections(cli).await,

        Commands::Count { collection } => cli::inspect::count(cli, collection).await,

        Commands::Search {
            collection,
            text,
            field,
            primary_field,
            limit,
            filter,
            output_fields,
            metric,
        } => {
            let args = SearchArgs {
                collection: collection.clone(),
                text: text.clone(),
                field: field.clone(),
                primary_field: primary_field.clone(),
                limit: *limit,
                filter: filter.clone(),
                output_fields: output_fields.clone(),
                metric: MetricType::from(*metric),
            };
            cli::inspect::search(cli, args).await
        }

        Commands::Query {
            collection,
            filter,
            output_fields,
            limit,
        } => cli::inspect::query(cli, collection, filter, output_fields.clone(), *limit).await,

        Commands::Drop { collection, force } => {
            cli::inspect::drop_collection(cli, collection, *force).await
        }

        // Handled before tracing is initialized
        Commands::Completions { .. } => Ok(()),
    }
}
