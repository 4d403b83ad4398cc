use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docstore::config::AppConfig;
use docstore::controllers::build_router;
use docstore::{build_state, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("load configuration")?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db = db::connect(&config.database_path).await?;
    info!("database ready at {}", config.database_path.display());

    let app = build_router(build_state(db, &config));

    info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("bind listener")?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
