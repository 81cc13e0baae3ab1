//! `ristobot ingest`: embed sentences into a fresh auto-id collection.

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use ristobot_core::embedder::Embedder;
use ristobot_core::pipeline::sentence::{run_sentence_ingest, SentenceIngestOptions};
use ristobot_core::vectordb::VectorDatabase;
use ristobot_infra::config::INGEST_SECTION;

use super::progress::StepPrinter;
use super::Cli;
use crate::state::AppState;

/// Number of leading components shown per embedding.
const PREVIEW_LEN: usize = 4;

/// Run the sentence ingest pipeline.
///
/// # Examples
///
/// ```bash
/// ristobot ingest
/// ristobot ingest "first sentence" "second sentence" --collection notes
/// ```
pub async fn ingest(cli: &Cli, collection: &str, sentences: Vec<String>) -> Result<()> {
    let silent = cli.json || cli.quiet;
    let mut printer = StepPrinter::new(silent);

    printer.step("Connect to the vector database");
    let state = AppState::init(cli, INGEST_SECTION).await?;
    printer.note(format!("Connected to {}", style(&state.endpoint).cyan()));

    printer.step("Load the sentence embedding model");
    let spinner = printer.spinner(&format!("Loading {}...", state.model_source));
    let embedder = state.load_embedder(!silent).await;
    spinner.finish_and_clear();
    let embedder = embedder?;
    printer.note(format!(
        "Model {} ({} dimensions)",
        style(embedder.model_name()).cyan(),
        embedder.dimension()
    ));

    let mut options = SentenceIngestOptions {
        collection: collection.to_string(),
        ..SentenceIngestOptions::default()
    };
    if !sentences.is_empty() {
        options.sentences = sentences;
    }

    let report = run_sentence_ingest(&state.db, &embedder, &options, |event| printer.observe(event))
        .await
        .with_context(|| format!("Sentence ingest into '{collection}' failed"))?;

    let row_count = state.db.count(&report.collection).await?;

    printer.step("Disconnect");
    state.db.close().await?;

    if cli.json {
        let output = serde_json::json!({
            "collection": report.collection,
            "backend": state.backend.to_string(),
            "endpoint": state.endpoint,
            "model": embedder.model_name(),
            "dimension": embedder.dimension(),
            "dropped_existing": report.dropped_existing,
            "schema": report.schema,
            "sentences": options.sentences,
            "insert": report.insert,
            "row_count": row_count,
            "timings": printer.timings_json(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if cli.quiet {
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Sentence").fg(Color::White),
        Cell::new("Embedding").fg(Color::White),
    ]);
    for (i, (sentence, vector)) in options.sentences.iter().zip(&report.embeddings).enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(sentence).fg(Color::White),
            Cell::new(vector_preview(vector)).fg(Color::Cyan),
        ]);
    }

    println!();
    println!("  Schema: {}", report.schema);
    println!("{table}");
    println!();
    println!(
        "  {} {} {}",
        style("✓").green().bold(),
        style(&report.collection).cyan().bold(),
        report.insert
    );
    if report.dropped_existing {
        println!("  {}", style("(replaced an existing collection)").dim());
    }
    println!(
        "  {} entit{} in '{}'",
        style(row_count).bold(),
        if row_count == 1 { "y" } else { "ies" },
        report.collection
    );
    println!();

    Ok(())
}

/// `[0.0123, -0.0456, 0.0789, 0.0012, ... (384)]`
pub fn vector_preview(vector: &[f32]) -> String {
    let head: Vec<String> = vector
        .iter()
        .take(PREVIEW_LEN)
        .map(|v| format!("{v:.4}"))
        .collect();
    if vector.len() > PREVIEW_LEN {
        format!("[{}, ... ({})]", head.join(", "), vector.len())
    } else {
        format!("[{}]", head.join(", "))
    }
}
