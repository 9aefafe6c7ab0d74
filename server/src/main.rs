use analytics::{EventRecorder, EventStore, MemoryEventStore, RecorderConfig, SledEventStore};
use anyhow::Result;
use clap::Parser;
use search_core::persist::{load_index, IndexPaths};
use search_core::{default_fallback_path, RetrievalEngine, SynonymTable};
use server::{build_app, AppState, CatalogSource};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Product catalog (JSON array or JSONL)
    #[arg(long, env = "DATA_FILE_PATH", default_value = "data/fashion_products_dataset.json")]
    catalog: PathBuf,
    /// Catalog used when the primary one cannot be loaded (default: <stem>_clean.csv next to --catalog)
    #[arg(long, env = "FALLBACK_DATA_FILE_PATH")]
    fallback_catalog: Option<PathBuf>,
    /// Prebuilt index directory; takes precedence over --catalog
    #[arg(long)]
    index: Option<PathBuf>,
    /// Event store directory; events are kept in memory when omitted
    #[arg(long, env = "EVENTS_DIR")]
    events: Option<PathBuf>,
    /// JSON synonym file replacing the built-in table
    #[arg(long)]
    synonyms: Option<PathBuf>,
    /// Idle seconds before a client gets a new session
    #[arg(long, default_value_t = 1800)]
    session_ttl_secs: u64,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8088)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    // Build or load the index before accepting traffic.
    let (index, catalog) = match &args.index {
        Some(dir) => (load_index(&IndexPaths::new(dir))?, None),
        None => {
            let source = CatalogSource {
                primary: args.catalog.clone(),
                fallback: Some(args.fallback_catalog.clone().unwrap_or_else(|| default_fallback_path(&args.catalog))),
            };
            (source.build_index()?, Some(source))
        }
    };
    let synonyms = match &args.synonyms {
        Some(path) => SynonymTable::from_json_file(path)?,
        None => SynonymTable::builtin(),
    };
    let engine = Arc::new(RetrievalEngine::new(index, synonyms));

    let store: Arc<dyn EventStore> = match &args.events {
        Some(dir) => Arc::new(SledEventStore::open(dir)?),
        None => {
            tracing::warn!("no --events directory given, analytics are kept in memory only");
            Arc::new(MemoryEventStore::new())
        }
    };
    let config = RecorderConfig { session_ttl: Duration::from_secs(args.session_ttl_secs), ..RecorderConfig::default() };
    let recorder = Arc::new(EventRecorder::with_config(store.clone(), config)?);

    let state = AppState { engine, recorder, catalog, admin_token: std::env::var("ADMIN_TOKEN").ok() };
    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    store.flush()?;
    Ok(())
}
