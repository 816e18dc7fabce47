#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use triplewalk::config::ServerConfig;
use triplewalk::ingest::{self, LoadOptions, LoadReport};
use triplewalk::storage::{Graph, LogEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triplewalk=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: data_directory={}, listen_port={}, serve={}, load_files={}",
        config.data_directory.display(),
        config.listen_port,
        config.serve,
        config.load_files.len()
    );

    let engine = match LogEngine::open(&config.data_directory, config.engine_options()) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(
                "Failed to open store at {}: {e}",
                config.data_directory.display()
            );
            std::process::exit(1);
        }
    };
    let graph = Arc::new(Graph::new(engine).with_walk_buffer(config.walk_buffer));
    tracing::info!("store opened: {}", graph.stats());

    if config.initial_compaction
        && let Err(e) = graph.compact()
    {
        tracing::error!("Initial compaction failed: {e}");
        std::process::exit(1);
    }

    if !config.load_files.is_empty() {
        load_all(&graph, config.load_files.clone(), &config.load_options()).await;
    }

    if !config.serve {
        return;
    }

    let app = triplewalk::http::router(Arc::clone(&graph));
    let addr = SocketAddr::from(([127, 0, 0, 1], config.listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}

/// Load every file on its own blocking task and log the combined totals.
async fn load_all(graph: &Arc<Graph<LogEngine>>, files: Vec<PathBuf>, options: &LoadOptions) {
    let tasks = files.into_iter().map(|path| {
        let graph = Arc::clone(graph);
        let options = options.clone();
        tokio::task::spawn_blocking(move || {
            let result = ingest::load_file(&graph, &path, &options);
            (path, result)
        })
    });

    let mut total = LoadReport::default();
    for joined in futures::future::join_all(tasks).await {
        match joined {
            Ok((_, Ok(report))) => {
                total.read += report.read;
                total.written += report.written;
                total.problems += report.problems;
                total.elapsed = total.elapsed.max(report.elapsed);
            }
            Ok((path, Err(e))) => {
                tracing::error!("Failed to load {}: {e}", path.display());
            }
            Err(e) => tracing::error!("Load task failed: {e}"),
        }
    }
    tracing::info!(
        "load complete: read={} written={} problems={} in {:.3}s ({})",
        total.read,
        total.written,
        total.problems,
        total.elapsed.as_secs_f64(),
        graph.stats()
    );
}
