use clap::Parser;

use planbook::auth::SessionStore;
use planbook::config::{generate_identity_secret, Config};
use planbook::db::{redact_url, Db};
use planbook::routes;
use planbook::state::AppState;

const SECRET_FILE: &str = "identity_secret.txt";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    log::info!("Connecting to database at {}", redact_url(&config.database_url));
    let db = Db::connect(&config.database_url).await?;

    let identity_secret = match config.identity_secret.clone() {
        Some(secret) if !secret.is_empty() => secret,
        _ => {
            let secret = generate_identity_secret();
            tokio::fs::write(SECRET_FILE, &secret).await?;
            log::warn!("No identity secret configured; generated one in {SECRET_FILE}");
            secret
        }
    };

    let sessions = SessionStore::new(config.session_ttl());
    let state = AppState::new(db, sessions, identity_secret)
        .with_secure_cookies(config.secure_cookies);

    let app = routes::router(state, config.body_limit);

    log::info!("Planbook server starting on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl-C, shutting down"),
        _ = terminate => log::info!("Received SIGTERM, shutting down"),
    }
}
