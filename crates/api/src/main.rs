use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use userhub_api::config::ServerConfig;
use userhub_api::router::build_app_router;
use userhub_api::service::UserService;
use userhub_api::state::AppState;
use userhub_db::{InMemoryUserStore, PgUserStore, UserStore};
use userhub_events::{open_channel, EventPublisher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(
        host = %config.http.host,
        port = config.http.port,
        topic = %config.broker.topic,
        partition_key = ?config.partition_key,
        publish_retries = config.publish_retry.max_retries,
        "Loaded server configuration"
    );

    // --- Record store ---
    let store: Arc<dyn UserStore> = match &config.database_url {
        Some(url) => {
            let pool = userhub_db::create_pool(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connection pool created");

            userhub_db::health_check(&pool)
                .await
                .context("Database health check failed")?;
            userhub_db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");

            Arc::new(PgUserStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, users are kept in memory");
            Arc::new(InMemoryUserStore::new())
        }
    };

    // --- Event channel ---
    let channel = open_channel(&config.broker)?;
    let publisher = EventPublisher::new(Arc::clone(&channel), config.broker.topic.clone())
        .with_partition_key(config.partition_key)
        .with_retry(config.publish_retry);

    // --- App state ---
    let state = AppState {
        users: Arc::new(UserService::new(store, publisher)),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config.http)?;

    // --- Start server ---
    let addr = SocketAddr::new(
        config.http.host.parse().context("Invalid HOST address")?,
        config.http.port,
    );
    tracing::info!(%addr, "Starting user service");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, flushing event channel");
    if let Err(e) = channel.close().await {
        tracing::error!(error = %e, "Failed to close event channel");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// `RUST_LOG` filters as usual; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "userhub_api=debug,userhub_events=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
