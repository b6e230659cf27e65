use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use userhub_events::open_channel;
use userhub_notifier::config::NotifierConfig;
use userhub_notifier::router::build_app_router;
use userhub_notifier::setup::{build_dispatcher, build_mailer, build_subscriber};
use userhub_notifier::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // --- Configuration ---
    let config = NotifierConfig::from_env()?;
    tracing::info!(
        host = %config.http.host,
        port = config.http.port,
        topic = %config.broker.topic,
        group = %config.broker.group_id,
        mail_retries = config.mail_retry.max_retries,
        dead_letter = ?config.dead_letter_topic,
        "Loaded notifier configuration"
    );

    // --- Mail + dispatch ---
    let mailer = build_mailer(&config).context("Failed to configure SMTP mailer")?;
    let dispatcher = build_dispatcher(&config, mailer);

    // --- Event channel + subscriber ---
    let channel = open_channel(&config.broker)?;
    let subscriber = build_subscriber(&config, Arc::clone(&channel), dispatcher.clone());

    let subscriber_cancel = CancellationToken::new();
    let token = subscriber_cancel.clone();
    let subscriber_handle = tokio::spawn(async move {
        if let Err(e) = subscriber.run(token).await {
            tracing::error!(error = %e, "Subscriber stopped with an error");
        }
    });

    // --- App state ---
    let state = AppState {
        dispatcher,
        channel: Arc::clone(&channel),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config.http)?;

    // --- Start server ---
    let addr = SocketAddr::new(
        config.http.host.parse().context("Invalid HOST address")?,
        config.http.port,
    );
    tracing::info!(%addr, "Starting notification service");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    // The subscriber finishes the delivery it is handling before it exits.
    subscriber_cancel.cancel();
    let grace = Duration::from_secs(config.http.shutdown_timeout_secs);
    if tokio::time::timeout(grace, subscriber_handle).await.is_err() {
        tracing::warn!(?grace, "Subscriber did not stop in time");
    } else {
        tracing::info!("Subscriber stopped");
    }

    if let Err(e) = channel.close().await {
        tracing::error!(error = %e, "Failed to close event channel");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// `RUST_LOG` filters as usual; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "userhub_notifier=debug,userhub_events=debug,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

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
