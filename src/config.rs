use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, path::PathBuf};

/// Which storage backend holds the catalog.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Flat JSON files in `data_dir`.
    Json,
    /// JSON documents in a SQLite database at `database_url`.
    Sqlite,
}

impl Backend {
    fn parse_env(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(Backend::Json),
            "sqlite" => Ok(Backend::Sqlite),
            other => bail!("unknown backend `{}` (expected `json` or `sqlite`)", other),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub database_url: String,
    /// Require `X-User-Id` on photo routes and restrict them to the owner.
    pub enforce_ownership: bool,
}

/// One-shot maintenance tasks requested on the command line.
#[derive(Debug, Clone, Default)]
pub struct Maintenance {
    pub migrate: bool,
    pub import_dir: Option<PathBuf>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Photo catalog service")]
pub struct Args {
    /// Host to bind to (overrides PHOTO_CATALOG_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PHOTO_CATALOG_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Storage backend (overrides PHOTO_CATALOG_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Directory with photos.json, albums.json and users.json (overrides PHOTO_CATALOG_DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// SQLite database URL (overrides PHOTO_CATALOG_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Serve photo routes without ownership checks
    #[arg(long)]
    pub no_ownership: bool,

    /// Create the SQLite schema and exit
    #[arg(long)]
    pub migrate: bool,

    /// Copy a flat JSON catalog from this directory into SQLite and exit
    #[arg(long)]
    pub import_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and maintenance flags.
    pub fn from_env_and_args() -> Result<(Self, Maintenance)> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<(Self, Maintenance)> {
        // --- Environment fallback ---
        let env_host = env::var("PHOTO_CATALOG_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("PHOTO_CATALOG_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing PHOTO_CATALOG_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 8000,
            Err(err) => return Err(err).context("reading PHOTO_CATALOG_PORT"),
        };
        let env_backend = match env::var("PHOTO_CATALOG_BACKEND") {
            Ok(value) => Backend::parse_env(&value).context("parsing PHOTO_CATALOG_BACKEND")?,
            Err(_) => Backend::Json,
        };
        let env_data_dir = env::var("PHOTO_CATALOG_DATA_DIR").unwrap_or_else(|_| "./data".into());
        let env_db = env::var("PHOTO_CATALOG_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/catalog.db".into());
        let env_enforce = match env::var("PHOTO_CATALOG_ENFORCE_OWNERSHIP") {
            Ok(value) => value.parse::<bool>().with_context(|| {
                format!("parsing PHOTO_CATALOG_ENFORCE_OWNERSHIP value `{}`", value)
            })?,
            Err(_) => true,
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            backend: args.backend.unwrap_or(env_backend),
            data_dir: args.data_dir.unwrap_or_else(|| env_data_dir.into()),
            database_url: args.database_url.unwrap_or(env_db),
            enforce_ownership: env_enforce && !args.no_ownership,
        };
        let maintenance = Maintenance {
            migrate: args.migrate,
            import_dir: args.import_dir,
        };

        Ok((cfg, maintenance))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
