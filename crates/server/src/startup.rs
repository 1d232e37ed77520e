use std::net::SocketAddr;

use axum::Router;
use common::utils::logging::init_logging;
use configs::AppConfig;
use dotenvy::dotenv;
use service::notify::{Level, Notifier};
use service::Storefront;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, auth::ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Mirror user-facing notifications into the log.
fn spawn_notification_log(notifier: &Notifier) {
    let mut rx = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(n) if n.level == Level::Error => warn!(message = %n.message, "notification"),
                Ok(n) => info!(message = %n.message, "notification"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "notification log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Router over an already-built storefront.
pub fn app(storefront: Storefront) -> Router {
    routes::build_router(ServerState::new(storefront), build_cors())
}

/// Public entry: load config, connect the backend platform and serve HTTP.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    init_logging(&cfg.server.log_format);

    let storefront = Storefront::from_config(&cfg).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    spawn_notification_log(&storefront.notifier);

    let addr = bind_addr(&cfg)?;
    info!(%addr, backend = %cfg.backend.url, "starting storefront server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(storefront)).await?;
    Ok(())
}
