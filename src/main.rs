use image_similarity::api::{create_router, AppState};
use image_similarity::infrastructure::{logging, AppConfig, Services};
use std::net::SocketAddr;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init("api=debug,image_similarity=debug,tower_http=debug");

    let config = AppConfig::load()?;
    let services = Services::from_config(config)?;
    let state = AppState::from_services(&services);

    let server = &services.config.server;
    let addr = SocketAddr::new(server.host.parse()?, server.port);
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
