use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use talkoot_api::{AppState, AppStateInner, router, session::SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talkoot=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("TALKOOT_DB_PATH").unwrap_or_else(|_| "talkoot.db".into());
    let host = std::env::var("TALKOOT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("TALKOOT_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database (applies the schema bootstrap)
    let db = talkoot_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state: the store handle and the session store
    let state: AppState = Arc::new(AppStateInner {
        db,
        sessions: SessionStore::new(),
    });

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Talkoot server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
