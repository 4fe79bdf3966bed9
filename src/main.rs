use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{info, warn};

use cinder::bluesky::{IdentityResolver, OzoneLabeler, PublicAtpClient};
use cinder::classifier::llm::LlmClassifier;
use cinder::classifier::{NoopClassifier, ScamClassifier};
use cinder::clock::{Clock, SystemClock};
use cinder::config::Config;
use cinder::ignore::{IgnoreCache, IgnoreTier};
use cinder::matcher::terms::{refresh_once, spawn_refresh_loop, FileTermSource, TermSource};
use cinder::matcher::MatcherHandle;
use cinder::moderation::{DryRunLabeler, LabelActuator};
use cinder::output::terminal;
use cinder::pipeline::ingest::{spawn_reader, EVENT_CHANNEL_CAPACITY};
use cinder::pipeline::{BypassList, ClassificationDispatcher, DuplicateAggregator, Pipeline};

/// Cinder: spam and scam moderation pre-filter for Bluesky.
///
/// Cheap lexical checks and a windowed duplicate detector catch most abuse;
/// only posts that hit a watched term reach the text classifier.
#[derive(Parser)]
#[command(name = "cinder", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the ignore-cache database
    Init,

    /// Run the pipeline over newline-delimited JSON post events
    Run {
        /// Read events from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Classify a single text and show what the pipeline would do (applies nothing)
    Classify {
        /// The post text to classify
        text: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cinder=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing Cinder database...");
            let config = Config::load()?;
            let store = cinder::db::initialize_sqlite(&config.db_path)?;
            let table_count = store.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            let active = store.active_count(SystemClock.now()).await?;
            println!("Active ignore entries: {active}");
            println!("\nCinder is ready. Next step: set up your .env file");
            println!("  (see .env.example for required variables)");
            println!("\nThen run: cargo run -- run --input events.ndjson");
        }

        Commands::Run { input } => {
            let config = Config::load()?;
            config.require_pipeline()?;

            let summary = match input {
                Some(path) => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .with_context(|| format!("Failed to open {}", path.display()))?;
                    run_pipeline(&config, BufReader::new(file)).await?
                }
                None => run_pipeline(&config, BufReader::new(tokio::io::stdin())).await?,
            };

            terminal::display_run_summary(&summary);
        }

        Commands::Classify { text } => {
            let config = Config::load()?;
            config.require_classifier()?;

            let matcher = MatcherHandle::default();
            let source = FileTermSource::new(&config.terms_path);
            match refresh_once(&matcher, &source).await {
                Ok(count) => info!(terms = count, "Loaded term list"),
                Err(e) => warn!(error = %e, "Could not load term list, matching nothing"),
            }
            let term = matcher.find(&text);

            let classifier = build_classifier(&config)?;
            let snippet: String = text
                .chars()
                .take(cinder::pipeline::dispatcher::SNIPPET_CHARS)
                .collect();
            let verdict = classifier.classify(&snippet).await?;

            terminal::display_classification(&text, term.as_deref(), verdict);
        }
    }

    Ok(())
}

/// Wire up collaborators and run the pipeline until the event source closes.
async fn run_pipeline<R>(config: &Config, reader: R) -> Result<cinder::pipeline::RunSummary>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let durable_store = cinder::db::open_sqlite(&config.db_path)?;
    let durable = Arc::new(IgnoreCache::new(
        IgnoreTier::Durable,
        durable_store,
        clock.clone(),
    ));
    let ephemeral = Arc::new(IgnoreCache::in_memory(clock));

    let matcher = Arc::new(MatcherHandle::default());
    let source: Arc<dyn TermSource> = Arc::new(FileTermSource::new(&config.terms_path));
    let count = refresh_once(&matcher, source.as_ref())
        .await
        .context("Failed to load initial term list")?;
    info!(terms = count, path = %config.terms_path, "Loaded term list");
    let refresher = spawn_refresh_loop(matcher.clone(), source, config.terms_refresh());

    let resolver: Arc<dyn IdentityResolver> = Arc::new(PublicAtpClient::new(
        &config.public_api_url,
        config.http_timeout(),
    )?);

    let classifier: Arc<dyn ScamClassifier> = if config.classifier_api_key.is_empty() {
        warn!("CLASSIFIER_API_KEY not set — matched posts will not be classified");
        Arc::new(NoopClassifier)
    } else {
        Arc::from(build_classifier(config)?)
    };

    let labeler: Arc<dyn LabelActuator> = if config.dry_run {
        println!("{}", "Dry run: labels will be logged, not applied".yellow());
        Arc::new(DryRunLabeler)
    } else {
        config.require_labeler()?;
        Arc::new(OzoneLabeler::new(
            &config.bluesky_service_url,
            &config.bluesky_handle,
            &config.bluesky_app_password,
            &config.labeler_did,
            config.http_timeout(),
        )?)
    };

    let bypass = BypassList::from_csv(&config.bypass);
    if !bypass.is_empty() {
        info!(entries = bypass.len(), "Loaded bypass list");
    }

    let dispatcher = Arc::new(ClassificationDispatcher::new(
        matcher,
        resolver,
        bypass,
        durable,
        classifier,
        labeler.clone(),
    ));
    let aggregator = Arc::new(DuplicateAggregator::new(
        config.thresholds(),
        labeler,
        ephemeral,
    ));

    let (events, reader_task) = spawn_reader(reader, EVENT_CHANNEL_CAPACITY);
    let pipeline = Pipeline::new(dispatcher, aggregator, config.window())
        .with_dispatch_limit(config.max_in_flight);
    let summary = pipeline.run(events).await;

    refresher.abort();
    match reader_task.await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!(error = %e, "Event reader stopped with an error"),
        Err(e) => warn!(error = %e, "Event reader task failed"),
    }

    Ok(summary)
}

fn build_classifier(config: &Config) -> Result<Box<dyn ScamClassifier>> {
    Ok(Box::new(LlmClassifier::new(
        &config.classifier_api_url,
        config.classifier_api_key.clone(),
        config.classifier_model.clone(),
        config.classifier_qps,
        config.http_timeout(),
    )?))
}
