//! funnel-server — webhook endpoints and dashboard API for the quiz
//! funnel. One process, one local database, optional hosted store.

mod config;
mod device;
mod hubla;
mod routes;
mod state;
mod supabase;
mod webhook;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = config::ServerConfig::from_env();
    let port = config.port;
    log::info!(
        "iniciando funnel-server (db: {}, supabase: {})",
        config.db_path,
        config.supabase_configured()
    );

    let state = state::AppState::new(config)?;
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
