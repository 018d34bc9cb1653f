use crate::app::AppContext;
use crate::channels::GraphApiSender;
use crate::config::AppConfig;
use crate::server::{self, ServerState};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docqa_chunker::StrategyKind;
use docqa_indexer::{CanonicalReindex, GateOutcome, ReindexWatcher, WatcherConfig};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Answer questions grounded in a folder of documents.
#[derive(Parser, Debug)]
#[command(name = "docqa", author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to ./docqa.toml when present)
    #[arg(short, long, global = true, env = "DOCQA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server and keep the index in sync with the source folder
    Serve {
        /// Do not watch the source folder
        #[arg(long)]
        no_watch: bool,
    },
    /// Load, chunk and index the source folder
    Ingest {
        /// Delete the collection before indexing
        #[arg(long)]
        clear_db: bool,
        /// fixed, structural or semantic (defaults to the configured strategy)
        #[arg(long)]
        strategy: Option<StrategyKind>,
    },
    /// Answer a single question
    Ask {
        question: String,
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Interactive question loop; `exit` or `quit` leaves
    Chat {
        #[arg(short, long)]
        language: Option<String>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Serve { no_watch } => serve(config, !no_watch).await,
        Command::Ingest { clear_db, strategy } => ingest(config, clear_db, strategy).await,
        Command::Ask { question, language } => ask(config, &question, language).await,
        Command::Chat { language } => chat(config, language).await,
    }
}

async fn ingest(config: AppConfig, clear_db: bool, strategy: Option<StrategyKind>) -> Result<()> {
    let ctx = AppContext::build(config).await?;
    let request = ctx.ingest_request(clear_db, strategy)?;
    log::info!(
        "Ingesting {} into '{}'",
        request.source_dir.display(),
        request.collection
    );

    match ctx.gate.run(&request).await? {
        GateOutcome::Completed(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.is_partial() {
                log::warn!(
                    "Ingestion finished with {} skipped files and {} failed batches",
                    report.skipped_files.len(),
                    report.failed_batches.len()
                );
            }
        }
        GateOutcome::Coalesced => log::info!("An ingestion is already queued"),
    }
    Ok(())
}

async fn ask(config: AppConfig, question: &str, language: Option<String>) -> Result<()> {
    let language = language.unwrap_or_else(|| config.answer.default_language.clone());
    let ctx = AppContext::build(config).await?;
    let answer = ctx.qa.ask(question, &language).await?;
    println!("{answer}");
    Ok(())
}

async fn chat(config: AppConfig, language: Option<String>) -> Result<()> {
    let language = language.unwrap_or_else(|| config.answer.default_language.clone());
    let ctx = AppContext::build(config).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match ctx.qa.ask(question, &language).await {
            Ok(answer) => println!("Assistant: {answer}\n"),
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }
    Ok(())
}

async fn serve(config: AppConfig, watch: bool) -> Result<()> {
    let data_dir = config.source.data_dir.clone();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    let addr = config.bind_addr()?;

    let ctx = AppContext::build(config).await?;
    let watcher = if watch && ctx.config.watcher.enabled {
        start_watcher(&ctx).await
    } else {
        None
    };

    let state = ServerState {
        qa: ctx.qa.clone(),
        sender: Arc::new(GraphApiSender::new(&ctx.config.channels)?),
        verify_token: ctx.config.channels.verify_token.clone(),
        default_language: ctx.config.answer.default_language.clone(),
        watcher_health: watcher.as_ref().map(ReindexWatcher::health_stream),
    };
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let result = server::serve(listener, state, shutdown_signal()).await;

    if let Some(watcher) = watcher {
        log::info!("Stopping document watcher");
        watcher.stop().await;
    }
    result
}

/// Watcher failures are logged; the server runs without one.
async fn start_watcher(ctx: &AppContext) -> Option<ReindexWatcher> {
    let request = match ctx.ingest_request(true, None) {
        Ok(request) => request,
        Err(e) => {
            log::error!("Failed to start watcher: {e:#}");
            return None;
        }
    };
    let collection = request.collection.clone();
    let source = ctx.config.source_options();
    let watcher_config = WatcherConfig {
        debounce: ctx.config.debounce(),
        extensions: source.extensions,
        recursive: source.recursive,
    };
    let target = Arc::new(CanonicalReindex::new(ctx.gate.clone(), request));

    let watcher = match ReindexWatcher::start(&ctx.config.source.data_dir, target, watcher_config) {
        Ok(watcher) => watcher,
        Err(e) => {
            log::error!("Failed to start watcher: {e}");
            return None;
        }
    };

    if !ctx.store.exists(&collection).await.unwrap_or(false) {
        if let Err(e) = watcher.trigger("initial build").await {
            log::warn!("Failed to schedule initial build: {e}");
        }
    }
    Some(watcher)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
