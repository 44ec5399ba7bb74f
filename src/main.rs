use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

#[macro_use]
mod macros;

mod blob;
mod cache;
mod cli;
mod cookies;
mod db;
mod email;
mod env;
mod error;
mod html;
mod routes;
mod scoring;
mod static_files;
mod traits;
mod util;

pub use error::{AppError, AppResult};
pub use static_files::render_html_template;

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    cache: Arc<cache::ViewCache>,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: Arc::new(cache::ViewCache::new()),
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&*env::RUST_LOG))
        .init();

    let args = cli::Args::parse();

    let connect_options =
        SqliteConnectOptions::from_str(&env::DATABASE_URL)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(3))
        .connect_with(connect_options)
        .await?;

    let state = AppState::new(pool);

    match args.command.unwrap_or_default() {
        cli::Command::Run => {
            state.migrate().await?;

            let app = routes::router().with_state(state);
            let listener = tokio::net::TcpListener::bind(&*env::BIND_ADDRESS).await?;
            tracing::info!(address = %*env::BIND_ADDRESS, "serving");
            axum::serve(listener, app).await?;
        }
        cli::Command::Reset => state.reset().await?,
        cli::Command::Migrate => state.migrate().await?,
        cli::Command::Seed => {
            state.migrate().await?;
            state.seed().await?;
        }
    }

    Ok(())
}
