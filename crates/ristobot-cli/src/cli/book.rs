//! `ristobot book`: ingest book sentences, index, search, and query back
//! the best match.

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use ristobot_core::embedder::Embedder;
use ristobot_core::pipeline::book::{
    run_book_search, BookSearchOptions, BookSearchReport, PRIMARY_FIELD, SENTENCE_FIELD,
    WORD_COUNT_FIELD,
};
use ristobot_core::pipeline::Stage;
use ristobot_core::vectordb::VectorDatabase;
use ristobot_infra::config::BOOK_SECTION;
use ristobot_types::search::{IndexType, MetricType};

use super::progress::{seconds, StepPrinter};
use super::Cli;
use crate::state::AppState;

/// Word counts are drawn uniformly from this range.
const WORD_COUNT_RANGE: std::ops::RangeInclusive<i64> = 1..=100;

/// Arguments of `ristobot book`.
pub struct BookArgs {
    pub collection: String,
    pub query: String,
    pub top_k: usize,
    pub metric: MetricType,
    pub index_type: IndexType,
    pub level: i64,
    pub seed: Option<u64>,
    pub sentences: Vec<String>,
}

/// One random word count per sentence; reproducible with a seed.
pub fn random_word_counts(n: usize, seed: Option<u64>) -> Vec<i64> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    (0..n).map(|_| rng.gen_range(WORD_COUNT_RANGE)).collect()
}

fn build_options(args: BookArgs) -> BookSearchOptions {
    let mut options = BookSearchOptions::demo(Vec::new());
    if !args.sentences.is_empty() {
        options.sentences = args.sentences;
    }
    options.word_counts = random_word_counts(options.sentences.len(), args.seed);
    options.collection = args.collection;
    options.search_text = args.query;
    options.top_k = args.top_k;
    options.metric = args.metric;
    options.index_type = args.index_type;
    options.search_level = args.level;
    options
}

/// Run the book search pipeline.
///
/// # Examples
///
/// ```bash
/// ristobot book
/// ristobot book --query banana --top-k 3 --seed 7
/// ristobot book --index-type hnsw --metric cosine
/// ```
pub async fn book(cli: &Cli, args: BookArgs) -> Result<()> {
    let silent = cli.json || cli.quiet;
    let mut printer = StepPrinter::new(silent);

    printer.step("Connect to the vector database");
    let state = AppState::init(cli, BOOK_SECTION).await?;
    printer.note(format!("Connecting to DB: {}", style(&state.endpoint).cyan()));
    printer.note("Success!");

    printer.step("Load the sentence embedding model");
    let spinner = printer.spinner(&format!("Loading {}...", state.model_source));
    let embedder = state.load_embedder(!silent).await;
    spinner.finish_and_clear();
    let embedder = embedder?;

    let options = build_options(args);
    printer.note(format!(
        "Inserting {} entities into '{}'...",
        options.sentences.len(),
        options.collection
    ));

    let report = run_book_search(&state.db, &embedder, &options, |event| printer.observe(event))
        .await
        .with_context(|| format!("Book search in '{}' failed", options.collection))?;

    printer.step("Disconnect");
    state.db.close().await?;

    if cli.json {
        let hits: Vec<Value> = report
            .hits
            .iter()
            .map(|resolved| {
                serde_json::json!({
                    "id": resolved.hit.id,
                    "distance": resolved.hit.distance,
                    "sentence": resolved.sentence,
                    "filter": resolved.filter,
                    "rows": resolved.rows,
                })
            })
            .collect();
        let output = serde_json::json!({
            "collection": report.collection,
            "backend": state.backend.to_string(),
            "endpoint": state.endpoint,
            "model": embedder.model_name(),
            "dropped_existing": report.dropped_existing,
            "schema": report.schema,
            "word_counts": options.word_counts,
            "insert": report.insert,
            "search_text": report.search_text,
            "hits": hits,
            "timings": printer.timings_json(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if !cli.quiet {
        print_report(&report, &printer);
    }
    Ok(())
}

fn print_report(report: &BookSearchReport, printer: &StepPrinter) {
    println!();
    println!("  Schema: {}", report.schema);
    println!("  Insert: {}", report.insert);
    println!();

    if report.hits.is_empty() {
        println!(
            "  {} No matches for '{}'.",
            style("i").blue().bold(),
            style(&report.search_text).cyan()
        );
        println!();
        return;
    }

    let search_secs = printer
        .timings()
        .iter()
        .find(|(stage, _)| *stage == Stage::Search)
        .map(|(_, elapsed)| seconds(*elapsed));

    let mut hits = Table::new();
    hits.load_preset(presets::UTF8_FULL_CONDENSED);
    hits.set_content_arrangement(ContentArrangement::Dynamic);
    hits.set_header(vec![
        Cell::new("Hit id").fg(Color::White),
        Cell::new("Distance").fg(Color::White),
        Cell::new("Matched sentence").fg(Color::White),
    ]);
    for resolved in &report.hits {
        hits.add_row(vec![
            Cell::new(&resolved.hit.id).fg(Color::Cyan),
            Cell::new(format!("{:.4}", resolved.hit.distance)).fg(Color::Yellow),
            Cell::new(resolved.sentence.as_deref().unwrap_or("-")).fg(Color::White),
        ]);
    }

    println!(
        "  Results for '{}'{}",
        style(&report.search_text).cyan().bold(),
        search_secs
            .map(|s| format!(" (search latency: {s} seconds)"))
            .unwrap_or_default()
    );
    println!("{hits}");
    println!();

    let mut rows = Table::new();
    rows.load_preset(presets::UTF8_FULL_CONDENSED);
    rows.set_content_arrangement(ContentArrangement::Dynamic);
    rows.set_header(vec![
        Cell::new(PRIMARY_FIELD).fg(Color::White),
        Cell::new(WORD_COUNT_FIELD).fg(Color::White),
        Cell::new(SENTENCE_FIELD).fg(Color::White),
    ]);
    for resolved in &report.hits {
        for row in &resolved.rows {
            rows.add_row(vec![
                Cell::new(display_value(row.get(PRIMARY_FIELD))).fg(Color::Cyan),
                Cell::new(display_value(row.get(WORD_COUNT_FIELD))).fg(Color::Yellow),
                Cell::new(display_value(row.get(SENTENCE_FIELD))).fg(Color::White),
            ]);
        }
    }
    println!(
        "  Query: {}",
        style(
            report
                .hits
                .iter()
                .map(|h| h.filter.as_str())
                .collect::<Vec<_>>()
                .join(" | ")
        )
        .dim()
    );
    println!("{rows}");
    println!();
}

/// Strings without quotes, everything else as JSON.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn seeded_word_counts_repeat() {
        let a = random_word_counts(3, Some(42));
        let b = random_word_counts(3, Some(42));
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn word_counts_in_range() {
        let counts = random_word_counts(500, None);
        assert!(counts.iter().all(|c| WORD_COUNT_RANGE.contains(c)));
    }

    #[test]
    fn options_default_to_demo_data() {
        let options = build_options(BookArgs {
            collection: "book".into(),
            query: "pera".into(),
            top_k: 1,
            metric: MetricType::L2,
            index_type: IndexType::AutoIndex,
            level: 2,
            seed: Some(1),
            sentences: Vec::new(),
        });
        assert_eq!(options.sentences, vec!["mela", "pera", "banana"]);
        assert_eq!(options.word_counts.len(), 3);
        assert_eq!(options.search_level, 2);
        assert_eq!(options.index_type, IndexType::AutoIndex);
    }

    #[test]
    fn options_use_given_sentences() {
        let options = build_options(BookArgs {
            collection: "shelf".into(),
            query: "kiwi".into(),
            top_k: 2,
            metric: MetricType::IP,
            index_type: IndexType::IvfFlat,
            level: 1,
            seed: None,
            sentences: vec!["kiwi".into()],
        });
        assert_eq!(options.collection, "shelf");
        assert_eq!(options.sentences, vec!["kiwi"]);
        assert_eq!(options.word_counts.len(), 1);
        assert_eq!(options.metric, MetricType::IP);
        assert_eq!(options.index_type, IndexType::IvfFlat);
    }

    #[test]
    fn display_value_unquotes_strings() {
        assert_eq!(display_value(Some(&json!("pera"))), "pera");
        assert_eq!(display_value(Some(&json!(47))), "47");
        assert_eq!(display_value(None), "-");
    }
}
