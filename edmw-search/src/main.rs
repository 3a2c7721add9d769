//! EDM Wizard Part Search (edmw-search) - Main entry point
//!
//! Headless batch run: search every row against PAS, normalize the
//! manufacturers observed, and write a JSON report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use edmw_common::config::load_config;
use edmw_common::logging::init_tracing;
use edmw_search::config::{build_ai_assist, build_normalizer, build_search_stack};
use edmw_search::models::{MatchResult, NormalizationResult, PartRow};
use edmw_search::services::BatchSummary;
use edmw_search::tabular::{apply_normalizations, load_reference_names, load_rows, reference_manufacturers};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments for edmw-search
#[derive(Parser, Debug)]
#[command(name = "edmw-search")]
#[command(about = "Batch part search and manufacturer normalization for EDM library data")]
#[command(version)]
struct Args {
    /// JSON array of rows ({manufacturer, part_number, description} or MFG/MFG_PN/Description)
    #[arg(short, long, env = "EDMW_INPUT")]
    input: PathBuf,

    /// Where to write the JSON report
    #[arg(short, long, default_value = "edmw-report.json", env = "EDMW_OUTPUT")]
    output: PathBuf,

    /// Config file (overrides EDMW_CONFIG and the platform default)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Concurrent search workers (overrides [search] workers)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Canonical manufacturer list, one per line (default: manufacturers returned by the search)
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// Disable the AI assist even if a key is configured
    #[arg(long)]
    no_ai: bool,
}

#[derive(Serialize)]
struct ReportRow<'a> {
    index: usize,
    manufacturer: &'a str,
    part_number: &'a str,
    /// `None` when the batch was cancelled before this row ran
    result: Option<&'a MatchResult>,
}

#[derive(Serialize)]
struct Report<'a> {
    results: Vec<ReportRow<'a>>,
    normalizations: &'a [NormalizationResult],
    /// Rows with accepted normalizations applied
    normalized_rows: &'a [PartRow],
    summary: &'a BatchSummary,
    cancelled: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(workers) = args.workers {
        config.search.workers = workers.max(1);
    }
    if args.no_ai {
        config.ai.api_key = None;
    }

    init_tracing(&config.logging);
    info!("Starting EDM Wizard part search");

    let rows = load_rows(&args.input)
        .with_context(|| format!("Failed to read rows from {}", args.input.display()))?;

    let assist = build_ai_assist(&config);
    let stack = build_search_stack(&config, assist.clone(), None)
        .context("Failed to initialise part search")?;

    let cancel = CancellationToken::new();
    let refresh_task = stack.tokens.clone().spawn_refresh_task(cancel.child_token());

    // Ctrl-C stops new rows; in-flight requests finish
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling batch");
            signal_cancel.cancel();
        }
    });

    let mut handle = stack.orchestrator.spawn(rows.clone(), cancel.clone());
    let total = rows.len();
    while let Some(row) = handle.next_completed().await {
        let progress = handle.progress();
        if progress.completed % 10 == 0 || progress.is_complete() {
            info!(
                progress = format!("{}/{}", progress.completed, total),
                last_row = row.index,
                "Search progress"
            );
        }
    }
    let outcome = handle.wait().await.context("Batch search failed")?;

    let reference = match &args.reference {
        Some(path) => load_reference_names(path)
            .with_context(|| format!("Failed to read reference list {}", path.display()))?,
        None => reference_manufacturers(outcome.results.iter().flatten()),
    };

    let normalizer = build_normalizer(&config, assist);
    let normalizations = stack
        .orchestrator
        .normalize_manufacturers(&normalizer, &rows, &reference)
        .await;

    let mut normalized_rows = rows.clone();
    let rewritten = apply_normalizations(&mut normalized_rows, &normalizations);
    info!(rows_rewritten = rewritten, "Normalizations applied");

    let report = Report {
        results: rows
            .iter()
            .zip(outcome.results.iter())
            .enumerate()
            .map(|(index, (row, result))| ReportRow {
                index,
                manufacturer: &row.manufacturer,
                part_number: &row.part_number,
                result: result.as_ref(),
            })
            .collect(),
        normalizations: &normalizations,
        normalized_rows: &normalized_rows,
        summary: &outcome.summary,
        cancelled: outcome.cancelled,
    };

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("Failed to write report to {}", args.output.display()))?;

    info!(
        output = %args.output.display(),
        found = outcome.summary.found,
        multiple = outcome.summary.multiple,
        need_review = outcome.summary.need_review,
        none = outcome.summary.none,
        errors = outcome.summary.errors,
        "Report written"
    );

    cancel.cancel();
    if let Err(e) = refresh_task.await {
        warn!(error = %e, "Token refresh task ended abnormally");
    }

    Ok(())
}
