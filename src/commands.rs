use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};
use itertools::Itertools;
use std::path::PathBuf;
use tracing::info;

use crate::PdfChatError;
use crate::chat::{ChatHistory, RagChain, SourceRef, Summarizer};
use crate::config::Config;
use crate::database::VectorStore;
use crate::gemini::GeminiClient;
use crate::ingest::Ingestor;

/// Extract, embed, and store one PDF file
#[inline]
pub async fn ingest(file: PathBuf, api_key: Option<String>) -> Result<()> {
    let config = load_config()?;
    let client = build_client(&config, api_key.as_deref())?;
    let mut store = VectorStore::open_or_create(&config).await?;

    info!("Ingesting {}", file.display());

    let mut ingestor = Ingestor::new(&config, &client, &mut store);
    let report = ingestor.ingest_file(&file).await?;

    println!(
        "Ingested {}: {} pages, {} segments",
        style(&report.source).cyan(),
        report.pages,
        report.segments
    );
    println!(
        "Store now holds {} segments ({} before this ingest)",
        report.store_total, report.prior_total
    );

    Ok(())
}

/// Answer a single question and exit
#[inline]
pub async fn ask(question: String, api_key: Option<String>) -> Result<()> {
    let config = load_config()?;
    let client = build_client(&config, api_key.as_deref())?;
    let store = VectorStore::open_existing(&config).await?;

    let chain = RagChain::new(&config, &client, &store);
    let answer = chain.ask(&question, &ChatHistory::new()).await?;

    println!("{}", answer.answer);
    print_sources(&answer.sources);

    Ok(())
}

/// Interactive chat session over the ingested documents
#[inline]
pub async fn chat(ingest_file: Option<PathBuf>, api_key: Option<String>) -> Result<()> {
    let config = load_config()?;
    let client = build_client(&config, api_key.as_deref())?;
    let store = match ingest_file {
        Some(file) => {
            let mut store = VectorStore::open_or_create(&config).await?;
            info!("Ingesting {}", file.display());
            let mut ingestor = Ingestor::new(&config, &client, &mut store);
            let report = ingestor.ingest_file(&file).await?;
            println!(
                "Ingested {}: {} pages, {} segments",
                style(&report.source).cyan(),
                report.pages,
                report.segments
            );
            store
        }
        None => VectorStore::open_existing(&config).await?,
    };

    let chain = RagChain::new(&config, &client, &store);
    let summarizer = Summarizer::new(&config, &client, &store);
    let mut history = ChatHistory::new();
    let mut last_sources: Vec<SourceRef> = Vec::new();

    println!(
        "{}",
        style("💬 pdf-chat interactive session").bold().cyan()
    );
    println!(
        "{} segments available. Ask a question, or use /summary, /sources, /clear, /quit.",
        store.count().await?
    );
    println!();

    loop {
        let line: String = match Input::new()
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            // EOF or a closed terminal ends the session.
            Err(_) => break,
        };
        let line = line.trim();

        match line {
            "" => {}
            "/quit" | "/exit" => break,
            "/clear" => {
                history.clear();
                last_sources.clear();
                println!("{}", style("History cleared.").dim());
            }
            "/sources" => {
                if last_sources.is_empty() {
                    println!("{}", style("No answer to cite yet.").dim());
                } else {
                    print_sources(&last_sources);
                }
            }
            "/summary" => match summarizer.summarize().await {
                Ok(summary) => println!("{summary}"),
                Err(error) => print_turn_error(&error),
            },
            question => match chain.ask(question, &history).await {
                Ok(answer) => {
                    println!("{}", answer.answer);
                    print_sources(&answer.sources);
                    // The exchange joins the history only once it succeeded.
                    history.push_exchange(question, answer.answer.clone());
                    last_sources = answer.sources;
                }
                Err(error) => print_turn_error(&error),
            },
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Summarize everything currently in the store
#[inline]
pub async fn summarize(api_key: Option<String>) -> Result<()> {
    let config = load_config()?;
    let client = build_client(&config, api_key.as_deref())?;
    let store = VectorStore::open_existing(&config).await?;

    let summarizer = Summarizer::new(&config, &client, &store);
    let summary = summarizer.summarize().await?;

    println!("{summary}");

    Ok(())
}

/// Show the store location and a per-document breakdown
#[inline]
pub async fn show_status() -> Result<()> {
    let config = load_config()?;

    println!("{}", style("📊 pdf-chat Status").bold().cyan());
    println!();
    println!("Config file: {}", config.config_file_path().display());
    println!("Vector store: {}", config.store_path().display());
    println!();

    match VectorStore::open_existing(&config).await {
        Ok(store) => {
            let total = store.count().await?;
            println!("Stored segments: {total}");
            println!("Vector dimension: {}", store.dimension());

            let segments = store.all_segments().await?;
            let mut documents: Vec<(String, usize)> = segments
                .iter()
                .counts_by(|segment| segment.source.clone())
                .into_iter()
                .collect();
            documents.sort();

            if !documents.is_empty() {
                println!();
                println!("Documents:");
                for (source, count) in documents {
                    println!("  {source}: {count} segments");
                }
            }
        }
        Err(PdfChatError::NotFound(_)) => {
            println!("No documents ingested yet. Run `pdf-chat ingest <file>` to get started.");
        }
        Err(error) => return Err(error.into()),
    }

    Ok(())
}

/// Delete every stored segment after confirmation
#[inline]
pub async fn clear(yes: bool) -> Result<()> {
    let config = load_config()?;

    let mut store = match VectorStore::open_existing(&config).await {
        Ok(store) => store,
        Err(PdfChatError::NotFound(_)) => {
            println!("The store is already empty.");
            return Ok(());
        }
        Err(error) => return Err(error.into()),
    };

    let total = store.count().await?;
    if total == 0 {
        println!("The store is already empty.");
        return Ok(());
    }

    let confirmed = yes
        || Confirm::new()
            .with_prompt(format!(
                "Delete all {total} stored segments? This cannot be undone"
            ))
            .default(false)
            .interact()?;

    if !confirmed {
        println!("Nothing deleted.");
        return Ok(());
    }

    store.clear().await?;
    println!("Deleted {total} segments.");

    Ok(())
}

fn load_config() -> Result<Config> {
    Config::load_default().context("Failed to load configuration")
}

fn build_client(config: &Config, api_key: Option<&str>) -> Result<GeminiClient> {
    let key = config.resolve_api_key(api_key)?;
    let client = GeminiClient::new(config, key)?;
    Ok(client)
}

fn print_sources(sources: &[SourceRef]) {
    if sources.is_empty() {
        return;
    }

    let listed = sources
        .iter()
        .map(|source| format!("{} p.{}", source.source, source.page))
        .unique()
        .join(", ");
    println!("{}", style(format!("Sources: {listed}")).dim());
}

/// Reports a failed chat turn without ending the session.
fn print_turn_error(error: &PdfChatError) {
    if error.is_transient() {
        println!("{}", style(format!("{error} (try again)")).yellow());
    } else {
        println!("{}", style(error.to_string()).red());
    }
}
