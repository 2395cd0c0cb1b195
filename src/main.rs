use anyhow::{Context, Result};
use axum::Router;
use photo_catalog::{
    config::{AppConfig, Backend, Maintenance},
    handlers::AppState,
    routes,
    services::{
        catalog_service::CatalogService,
        document_store::SqliteDocumentStore,
        json_store::JsonFileStore,
        store::{CatalogSnapshot, CatalogStore},
    },
};
use std::{io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + maintenance flags ---
    let (cfg, maintenance) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting photo-catalog with config: {:?}", cfg);

    // --- Handle maintenance mode ---
    if maintenance.migrate || maintenance.import_dir.is_some() {
        run_maintenance(&cfg, &maintenance).await?;
        return Ok(()); // exit after maintenance
    }

    // --- Open storage backend ---
    let store: Arc<dyn CatalogStore> = match cfg.backend {
        Backend::Json => {
            if !cfg.data_dir.exists() {
                tracing::warn!(
                    "Data directory {} does not exist yet; collections will read as empty",
                    cfg.data_dir.display()
                );
            }
            Arc::new(JsonFileStore::new(cfg.data_dir.clone()))
        }
        Backend::Sqlite => Arc::new(open_sqlite(&cfg.database_url).await?),
    };

    // --- Initialize core service ---
    let state = AppState {
        catalog: CatalogService::new(store),
        enforce_ownership: cfg.enforce_ownership,
    };

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Connect to SQLite, creating the parent directory of a file database.
async fn open_sqlite(database_url: &str) -> Result<SqliteDocumentStore> {
    let db_path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    SqliteDocumentStore::connect(database_url)
        .await
        .with_context(|| format!("connecting to {}", database_url))
}

/// Apply the SQLite schema and optionally seed it from a flat JSON catalog.
async fn run_maintenance(cfg: &AppConfig, maintenance: &Maintenance) -> Result<()> {
    let store = open_sqlite(&cfg.database_url).await?;
    store.migrate().await?;
    tracing::info!("Database migration complete.");

    if let Some(dir) = &maintenance.import_dir {
        let source = JsonFileStore::new(dir.clone());
        let snapshot = CatalogSnapshot::capture(&source)
            .await
            .with_context(|| format!("reading catalog from {}", dir.display()))?;
        store.import(&snapshot).await?;
        tracing::info!("Import from {} complete.", dir.display());
    }

    Ok(())
}
