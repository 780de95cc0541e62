use anyhow::{Context, Result};
use console::style;
use tracing::warn;

use truthforge_core::{ingest::IngestError, search::ScoredEntry, verify::VerifyRequest};
use truthforge_extensions::gemini::GeminiModel;

use crate::{
    app::TruthForge,
    cli::{IngestArgs, SearchArgs, VerifyArgs},
};

const TEXT_WIDTH: usize = 88;

// --- Handler Functions ---

pub async fn handle_ingest(args: IngestArgs, app: &TruthForge) -> Result<()> {
    match app.ingest(&args.path, args.granularity.into()).await {
        Ok(report) => {
            println!(
                "Ingested {} passages from {} into {}",
                style(report.chunks_added).bold(),
                args.path.display(),
                app.config.store_path.display()
            );
            if !report.sources.is_empty() {
                let sources: Vec<&str> = report.sources.iter().map(String::as_str).collect();
                println!("  Sources: {}", sources.join(", "));
            }
            Ok(())
        }
        Err(e) => match e.downcast_ref::<IngestError>() {
            Some(IngestError::SourceMissing(path)) => {
                warn!(path = %path.display(), "Rule file not found, nothing ingested");
                eprintln!("{} {} not found, nothing ingested.", style("warning:").yellow().bold(), path.display());
                Ok(())
            }
            _ => Err(e),
        },
    }
}

pub async fn handle_search(args: SearchArgs, app: &TruthForge) -> Result<()> {
    let results = app.search(&args.query, args.limit).await?;
    if results.is_empty() {
        println!("No passages found. Ingest a rule file first.");
        return Ok(());
    }
    for result in &results {
        println!("{}", format_result(result));
    }
    Ok(())
}

fn format_result(result: &ScoredEntry) -> String {
    let score = if result.score.is_finite() {
        format!("{:.3}", result.score)
    } else {
        "n/a".to_string()
    };
    let body = textwrap::indent(&textwrap::fill(&result.entry.text, TEXT_WIDTH - 4), "    ");
    format!(
        "{} {} {}\n{}",
        style(format!("#{}", result.rank + 1)).bold(),
        style(format!("[{}]", result.entry.source())).cyan(),
        style(format!("score {}", score)).dim(),
        body.trim_end()
    )
}

fn request(args: VerifyArgs) -> (VerifyRequest, Option<usize>) {
    let request = VerifyRequest {
        claim: args.claim,
        answer: args.answer,
        rules: args.rules,
    };
    (request, args.limit)
}

pub async fn handle_verify(args: VerifyArgs, app: &TruthForge) -> Result<()> {
    let (request, limit) = request(args);
    let report = app.verify(&request, limit).await?;
    if report.is_error() {
        warn!("Language model did not return a usable verdict");
    }
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}

pub async fn handle_fix(args: VerifyArgs, app: &TruthForge) -> Result<()> {
    let (request, limit) = request(args);
    let result = app.fix(&request, limit).await?;
    println!("{}", result.fixed_solution);
    Ok(())
}

pub async fn handle_models(app: &TruthForge) -> Result<()> {
    let mut models = app.list_models().await?;
    models.sort_by(|a, b| a.id.cmp(&b.id));
    println!("  {:<40} | {:>9} | Capabilities", "Model", "Input");
    println!("  {:-<40}-|-{:->9}-|-------------", "", "");
    for model in &models {
        println!("  {}", format_model(model));
    }
    Ok(())
}

fn format_model(model: &GeminiModel) -> String {
    let limit = model
        .input_token_limit
        .map(|l| l.to_string())
        .unwrap_or_else(|| "--".to_string());
    let mut capabilities = Vec::new();
    if model.is_chat_model() {
        capabilities.push("chat");
    }
    if model.is_embedding_model() {
        capabilities.push("embed");
    }
    format!("{:<40} | {:>9} | {}", model.id, limit, capabilities.join(", "))
}

pub async fn handle_stats(app: &TruthForge) -> Result<()> {
    let store = app.inspect_store().await?;
    println!("Store: {}", store.path().display());
    println!("  Entries: {}", store.len());
    match store.dimensions() {
        Some(dimensions) => println!("  Dimensions: {}", dimensions),
        None => println!("  Dimensions: --"),
    }
    let sources = store.sources();
    if !sources.is_empty() {
        println!();
        println!("  {:<30} | Passages", "Source");
        println!("  {:-<30}-|---------", "");
        for (source, count) in &sources {
            println!("  {:<30} | {:8}", source, count);
        }
    }
    Ok(())
}
