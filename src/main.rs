use clap::Parser;
use content_search::{
    analytics::AnalyticsEngine,
    api::{build_router, AppState},
    config::{Config, StorageBackend},
    content::{ContentStore, InMemoryContentStore, IndexWorker},
    indexer::Indexer,
    search::QueryEngine,
    store::{open_db, IndexStore},
    suggest::SuggestionService,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "content-search", about = "Content search and indexing service")]
struct Args {
    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address override, e.g. 127.0.0.1:8600
    #[arg(long)]
    listen: Option<String>,

    /// Data directory override for the embedded database
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "content_search=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if let Some(path) = &args.config {
        // Config::load resolves the file through this variable
        std::env::set_var("CONFIG_PATH", path);
    }

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });
    if let Some(dir) = args.data_dir {
        config.storage.path = dir;
    }

    tracing::info!("Starting content-search v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Storage backend: {:?}", config.storage.backend);

    // Initialize storage backend
    let (store, analytics) = match config.storage.backend {
        StorageBackend::Memory => (
            Arc::new(IndexStore::in_memory(config.query.min_token_len)),
            Arc::new(AnalyticsEngine::in_memory(config.analytics.clone())),
        ),
        StorageBackend::Sled => {
            let db = open_db(&config.storage.path)?;
            let store = IndexStore::persistent(db.clone(), config.query.min_token_len)?;
            let analytics = AnalyticsEngine::persistent(db, config.analytics.clone())?;
            tracing::info!(
                entries = store.len(),
                path = %config.storage.path.display(),
                "Persisted index loaded"
            );
            (Arc::new(store), Arc::new(analytics))
        }
    };

    // Content collaborator. The in-memory store starts empty; production
    // deployments swap in a CMS-backed implementation here.
    let content: Arc<dyn ContentStore> = Arc::new(InMemoryContentStore::new());

    // Initialize components
    let indexer = Arc::new(Indexer::new(
        store.clone(),
        content,
        config.indexing.clone(),
    ));
    let engine = Arc::new(QueryEngine::new(store.clone(), config.query.clone()));
    let suggester = Arc::new(SuggestionService::new(
        store.clone(),
        analytics.clone(),
        config.suggest.clone(),
    ));

    // Spawn the live indexing worker; the sender must outlive the server or
    // the worker drains and exits
    let (_events, _worker) = IndexWorker::spawn(indexer.clone());
    tracing::info!("Index worker started");

    let app_state = AppState::new(store, indexer, engine, suggester, analytics);
    let app = build_router(app_state);

    // Start HTTP server
    let addr = args
        .listen
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("HTTP API listening on http://{}", addr);
    tracing::info!("   Health check: http://{}/health", addr);
    tracing::info!("   Search: http://{}/v1/search?q=...", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
