//! Toxiscan
//!
//! Command-line entry point: serves the HTTP API, scores texts from the
//! terminal and fits vectorizer artifacts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{error, info, warn};

use toxiscan_classifiers::{Normalizer, ToxicityPredictor};
use toxiscan_server::{create_router, AppState, ConfigOverrides, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "toxiscan", version)]
#[command(about = "YouTube comment toxicity scoring", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TOXISCAN_CONFIG", default_value = "config/toxiscan.yaml", global = true)]
    config: PathBuf,

    /// Model artifact path
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Vectorizer artifact path
    #[arg(long, global = true)]
    vectorizer: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Listen address
        #[arg(short = 'l', long)]
        listen: Option<String>,

        /// Listen port
        #[arg(short = 'P', long)]
        port: Option<u16>,

        /// Allowed CORS origin
        #[arg(long, env = "FRONTEND_URL")]
        cors_origin: Option<String>,
    },

    /// Score texts and print one JSON result per line
    ///
    /// Reads lines from stdin when no text is given.
    Score {
        texts: Vec<String>,
    },

    /// Fit a vectorizer on a corpus with one document per line
    FitVectorizer {
        #[arg(long)]
        corpus: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let mut overrides = ConfigOverrides {
        model_path: cli.model.clone(),
        vectorizer_path: cli.vectorizer.clone(),
        ..Default::default()
    };
    if let Command::Serve {
        listen,
        port,
        cors_origin,
    } = &cli.command
    {
        overrides.listen = listen.clone();
        overrides.port = *port;
        overrides.cors_origin = cors_origin.clone();
    }

    let config = ServerConfig::load(&cli.config, &overrides)
        .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

    match cli.command {
        Command::Serve { .. } => serve(config).await,
        Command::Score { texts } => score(&config, texts),
        Command::FitVectorizer { corpus, output } => fit_vectorizer(&config, &corpus, &output),
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    info!("Starting toxiscan server");

    let metrics_handle = init_metrics()?;
    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;

    let state = AppState::from_config(config, Some(metrics_handle))?;
    let prediction_log = state.prediction_log.clone();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(log) = prediction_log {
        log.sync().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

fn score(config: &ServerConfig, texts: Vec<String>) -> Result<()> {
    let predictor = ToxicityPredictor::from_config(&config.classifier)?;

    let texts = if texts.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .collect()
    } else {
        texts
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for text in &texts {
        let result = predictor.predict_one(text)?;
        writeln!(out, "{}", serde_json::to_string(&result)?)?;
    }

    Ok(())
}

fn fit_vectorizer(config: &ServerConfig, corpus: &Path, output: &Path) -> Result<()> {
    let content = std::fs::read_to_string(corpus)
        .with_context(|| format!("failed to read corpus {:?}", corpus))?;

    let normalizer = config.classifier.normalizer.build()?;
    let documents: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| normalizer.normalize(line))
        .collect();
    info!(
        documents = documents.len(),
        normalizer = normalizer.name(),
        "Fitting vectorizer"
    );

    let vectorizer = config.classifier.vectorizer.fit(&documents)?;
    vectorizer.save(output)?;

    info!(
        vocabulary_size = vectorizer.vocabulary_size(),
        "Vectorizer written to {:?}",
        output
    );
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, stopping server...");
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("toxiscan=debug,toxiscan_server=debug,toxiscan_classifiers=debug,toxiscan_telemetry=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("toxiscan=info,toxiscan_server=info,toxiscan_classifiers=info,toxiscan_telemetry=info")
        })
    };

    // Logs go to stderr so `score` output stays clean JSON lines
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "toxiscan_requests_total",
        "Total number of scoring requests processed"
    );
    metrics::describe_counter!(
        "toxiscan_predictions_total",
        "Total number of scored texts by label and source"
    );
    metrics::describe_histogram!(
        "toxiscan_prediction_latency_us",
        metrics::Unit::Microseconds,
        "Scoring latency in microseconds per request"
    );
    metrics::describe_counter!("toxiscan_errors_total", "Total number of errors by type");

    info!("Metrics exporter initialized");
    Ok(handle)
}
