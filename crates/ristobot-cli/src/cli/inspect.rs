//! Inspection commands: collections, count, search, query, drop.
//!
//! These read the endpoint from the `[milvus_ristobot]` section unless
//! `--section` says otherwise.

use anyhow::{bail, Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use dialoguer::Confirm;

use ristobot_core::embedder::{embed_one, Embedder};
use ristobot_core::vectordb::VectorDatabase;
use ristobot_infra::config::BOOK_SECTION;
use ristobot_types::entity::Row;
use ristobot_types::search::{MetricType, QueryRequest, SearchParams, SearchRequest};

use super::book::display_value;
use super::Cli;
use crate::state::AppState;

/// List every collection.
pub async fn list_collections(cli: &Cli) -> Result<()> {
    let state = AppState::init(cli, BOOK_SECTION).await?;
    let mut names = state.db.list_collections().await?;
    names.sort();
    state.db.close().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }

    if names.is_empty() {
        println!();
        println!(
            "  {} No collections at {}.",
            style("i").blue().bold(),
            style(&state.endpoint).cyan()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("  Collections at {}", style(&state.endpoint).cyan().bold());
    println!();
    for name in &names {
        println!("  {} {}", style("•").dim(), name);
    }
    println!();
    Ok(())
}

/// Print the flushed row count of a collection.
pub async fn count(cli: &Cli, collection: &str) -> Result<()> {
    let state = AppState::init(cli, BOOK_SECTION).await?;
    let rows = state
        .db
        .count(collection)
        .await
        .with_context(|| format!("Failed to count '{collection}'"))?;
    state.db.close().await?;

    if cli.json {
        let output = serde_json::json!({ "collection": collection, "row_count": rows });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "  {} entit{} in '{}'",
            style(rows).bold(),
            if rows == 1 { "y" } else { "ies" },
            style(collection).cyan()
        );
    }
    Ok(())
}

/// Arguments of `ristobot search`.
pub struct SearchArgs {
    pub collection: String,
    pub text: String,
    pub field: String,
    pub primary_field: String,
    pub limit: usize,
    pub filter: Option<String>,
    pub output_fields: Vec<String>,
    pub metric: MetricType,
}

/// Embed `text` and search an existing, indexed collection.
pub async fn search(cli: &Cli, args: SearchArgs) -> Result<()> {
    if args.limit == 0 {
        bail!("--limit must be at least 1");
    }

    let state = AppState::init(cli, BOOK_SECTION).await?;

    let spinner = super::progress::StepPrinter::new(cli.json || cli.quiet)
        .spinner(&format!("Loading {}...", state.model_source));
    let embedder = state.load_embedder(!(cli.json || cli.quiet)).await;
    spinner.finish_and_clear();
    let embedder = embedder?;

    state
        .db
        .load_collection(&args.collection)
        .await
        .with_context(|| format!("Failed to load '{}'", args.collection))?;

    let vector = embed_one(&embedder, &args.text).await?;
    let request = SearchRequest {
        vector,
        anns_field: args.field,
        params: SearchParams::new(args.metric),
        limit: args.limit,
        output_fields: args.output_fields,
        filter: args.filter,
        primary_field: args.primary_field,
    };
    let hits = state
        .db
        .search(&args.collection, &request)
        .await
        .with_context(|| format!("Search in '{}' failed", args.collection))?;
    state.db.close().await?;

    if cli.json {
        let output = serde_json::json!({
            "collection": args.collection,
            "text": args.text,
            "model": embedder.model_name(),
            "hits": hits,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!();
        println!(
            "  {} No matches for '{}'.",
            style("i").blue().bold(),
            style(&args.text).cyan()
        );
        println!();
        return Ok(());
    }

    let extra: Vec<&String> = request
        .output_fields
        .iter()
        .filter(|f| **f != request.primary_field)
        .collect();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec![
        Cell::new("Rank").fg(Color::White),
        Cell::new(&request.primary_field).fg(Color::White),
        Cell::new("Distance").fg(Color::White),
    ];
    header.extend(extra.iter().map(|f| Cell::new(f).fg(Color::White)));
    table.set_header(header);

    for (rank, hit) in hits.iter().enumerate() {
        let mut cells = vec![
            Cell::new(rank + 1).fg(Color::DarkGrey),
            Cell::new(&hit.id).fg(Color::Cyan),
            Cell::new(format!("{:.4}", hit.distance)).fg(Color::Yellow),
        ];
        cells.extend(
            extra
                .iter()
                .map(|f| Cell::new(display_value(hit.fields.get(f.as_str()))).fg(Color::White)),
        );
        table.add_row(cells);
    }

    println!();
    println!(
        "  Nearest to '{}' in '{}'",
        style(&args.text).cyan().bold(),
        style(&args.collection).cyan()
    );
    println!();
    println!("{table}");
    println!();
    Ok(())
}

/// Fetch rows matching a filter expression.
pub async fn query(
    cli: &Cli,
    collection: &str,
    filter: &str,
    output_fields: Vec<String>,
    limit: Option<usize>,
) -> Result<()> {
    let state = AppState::init(cli, BOOK_SECTION).await?;
    state
        .db
        .load_collection(collection)
        .await
        .with_context(|| format!("Failed to load '{collection}'"))?;

    let request = QueryRequest {
        filter: filter.to_string(),
        output_fields,
        limit,
    };
    let rows = state
        .db
        .query(collection, &request)
        .await
        .with_context(|| format!("Query '{filter}' on '{collection}' failed"))?;
    state.db.close().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!();
        println!("  {} No rows match '{}'.", style("i").blue().bold(), filter);
        println!();
        return Ok(());
    }

    println!();
    println!("{}", rows_table(&rows));
    println!();
    println!(
        "  {} row{}",
        style(rows.len()).bold(),
        if rows.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

/// One column per key, in first-seen order.
fn rows_table(rows: &[Row]) -> Table {
    let mut columns: Vec<&String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key) {
                columns.push(key);
            }
        }
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(columns.iter().map(|c| Cell::new(c).fg(Color::White)));
    for row in rows {
        table.add_row(
            columns
                .iter()
                .map(|c| Cell::new(display_value(row.get(c.as_str())))),
        );
    }
    table
}

/// Drop a collection, asking first unless `--force` or `--json`.
pub async fn drop_collection(cli: &Cli, collection: &str, force: bool) -> Result<()> {
    if !force && !cli.json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently drop collection '{}' and all its data?",
                style(collection).red().bold()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let state = AppState::init(cli, BOOK_SECTION).await?;
    state
        .db
        .drop_collection(collection)
        .await
        .with_context(|| format!("Failed to drop '{collection}'"))?;
    state.db.close().await?;

    if cli.json {
        let output = serde_json::json!({ "collection": collection, "dropped": true });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !cli.quiet {
        println!(
            "  {} Dropped '{}'",
            style("✓").green().bold(),
            style(collection).cyan()
        );
    }
    Ok(())
}
