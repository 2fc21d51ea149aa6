mod config;
mod domain;
mod infra;
mod logging;
mod platform;
mod ui;
mod usecase;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use crate::config::{resolve_db_path, Backend, Cli, Command, ImportArgs, ServeArgs};
use crate::infra::cache::memory::{MemoryCache, NoopCache};
use crate::infra::import::csv::import_csv_to_sqlite;
use crate::infra::postgrest::client::{PostgrestClient, PostgrestConfig};
use crate::infra::sqlite::repo::SqliteRepo;
use crate::logging::init_logging;
use crate::platform::server::{serve, state::AppState};
use crate::usecase::ports::cache::QueryCache;
use crate::usecase::ports::data_service::DataService;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_config()).context("failed to initialise logging")?;

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Import(args) => run_import(args).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let data: Arc<dyn DataService> = match args.backend {
        Backend::Remote => {
            let remote = args.remote()?;
            let config = PostgrestConfig::new(&remote.url, remote.key, remote.schema)?;
            info!(url = %config.base_url, schema = %config.schema, "using remote backend");
            Arc::new(PostgrestClient::new(config))
        }
        Backend::Sqlite => {
            let db_path = resolve_db_path(args.db_path.as_ref())?;
            let repo = SqliteRepo::new(db_path);
            repo.init()?;
            info!(db = %repo.db_path.display(), "using sqlite backend");
            Arc::new(repo)
        }
    };

    let taxonomy = infra::taxonomy::load(args.taxonomy.as_deref())?;
    if taxonomy.section_names().is_empty() {
        warn!("field taxonomy has no sections");
    }

    let cache: Arc<dyn QueryCache> = if args.no_cache {
        Arc::new(NoopCache)
    } else {
        Arc::new(MemoryCache::new())
    };
    let state = AppState::new(data, cache, Arc::new(taxonomy));
    serve(args.bind, state).await
}

async fn run_import(args: ImportArgs) -> Result<()> {
    let db_path = resolve_db_path(args.db_path.as_ref())?;
    let result = tokio::task::spawn_blocking(move || {
        import_csv_to_sqlite(&db_path, &args.table, &args.csv_path)
    })
    .await
    .context("import worker failed")??;

    println!(
        "imported {} rows into {}{}",
        result.row_count,
        result.table,
        if result.skipped_columns.is_empty() {
            String::new()
        } else {
            format!(" (skipped: {})", result.skipped_columns.join(", "))
        }
    );
    Ok(())
}

#[cfg(test)]
mod tests;
