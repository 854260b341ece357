//! Formway server - serves the questionnaire CRUD and navigation API.
//!
//! Configuration comes from flags first, then the environment
//! (`FORMWAY_BIND`, `DATABASE_URL`). Pending migrations are applied at
//! startup unless `--skip-migrations` is given; `--memory` swaps the
//! PostgreSQL store for the in-memory backend.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use formway_http::{AppState, HttpIngress};
use formway_store::{MemoryStore, Migrator, PgStore, PostgresPool};

/// Formway questionnaire API server
#[derive(Parser)]
#[command(name = "formway")]
#[command(author, version, about = "Questionnaire CRUD and navigation API")]
struct Args {
    /// Address to listen on (falls back to FORMWAY_BIND)
    #[arg(long)]
    bind: Option<String>,

    /// PostgreSQL connection string (falls back to DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Connection pool size
    #[arg(long, default_value_t = 8)]
    max_connections: u32,

    /// Do not apply pending migrations at startup
    #[arg(long)]
    skip_migrations: bool,

    /// Use the in-memory store instead of PostgreSQL (development only)
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let bind = args
        .bind
        .or_else(|| std::env::var("FORMWAY_BIND").ok())
        .unwrap_or_else(|| "127.0.0.1:3000".to_string());

    if args.memory {
        tracing::warn!("Running with the in-memory store; nothing will be persisted");
        let store = Arc::new(MemoryStore::new());
        HttpIngress::new(AppState::new(store))
            .bind(bind)
            .run()
            .await?;
        return Ok(());
    }

    let url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .context("--database-url or DATABASE_URL is required unless --memory is set")?;

    let pool = PostgresPool::with_max_connections(&url, args.max_connections)
        .await
        .context("failed to connect to PostgreSQL")?;
    pool.ping().await.context("database ping failed")?;

    if !args.skip_migrations {
        let applied = Migrator::embedded()
            .run(pool.inner())
            .await
            .context("migrations failed")?;
        if applied > 0 {
            tracing::info!(formway.migrate.applied = applied, "Migrations applied");
        }
    }

    let store = Arc::new(PgStore::new(&pool));
    HttpIngress::new(AppState::new(store))
        .bind(bind)
        .run()
        .await?;
    Ok(())
}
