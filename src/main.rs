use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playclock::{api, catalog::ContentCatalog, config::AppConfig, state::AppState, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playclock=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting playclock...");

    let config = AppConfig::from_env();

    let catalog = match &config.catalog_path {
        Some(path) => match ContentCatalog::from_file(path).await {
            Ok(catalog) => {
                tracing::info!(path = %path.display(), items = catalog.len(), "Catalog loaded");
                catalog
            }
            Err(e) => {
                tracing::error!(path = %path.display(), "Failed to load catalog: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::info!("Using built-in catalog");
            ContentCatalog::builtin()
        }
    };

    let port = config.port;
    let state = match AppState::from_config(config, catalog).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to open stores: {}", e);
            std::process::exit(1);
        }
    };

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(api::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
