use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use predmarket_engine::api::routes::{router, ApiState};
use predmarket_engine::config::{Config, DB_BUSY_TIMEOUT_MS};
use predmarket_engine::error::Result;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", cfg.db_path))?
        .create_if_missing(true)
        .busy_timeout(Duration::from_millis(DB_BUSY_TIMEOUT_MS));
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- HTTP API server ---
    let app = router(ApiState { pool });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Market engine listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
