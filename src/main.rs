use anyhow::Context;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seat_ticketing::{config::Config, controllers, database::Database, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting seat ticketing service");

    // Connect to the database
    let db = Database::new(
        &config.database.url,
        config.database.pool_size,
        Duration::from_secs(config.database.acquire_timeout_secs),
    )
    .await
    .context("failed to connect to database")?;
    info!("Database connected");

    db.run_migrations()
        .await
        .context("failed to run migrations")?;

    tokio::fs::create_dir_all(&config.render.output_dir)
        .await
        .with_context(|| format!("cannot create {}", config.render.output_dir.display()))?;
    tokio::fs::create_dir_all(&config.render.batch_output_dir)
        .await
        .with_context(|| format!("cannot create {}", config.render.batch_output_dir.display()))?;

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("HOST and PORT do not form a socket address")?;
    let app_state = AppState::new(db, config);

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;

    Ok(())
}
