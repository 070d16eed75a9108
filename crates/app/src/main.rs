mod bus;
mod problem;
mod router;
mod telemetry;
mod views;

use std::{net::SocketAddr, sync::Arc};

use notifier_util::{load_env_file, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let bus = bus::NotificationBus::new(config.channel_capacity);
    let renderer = Arc::new(views::AskamaRenderer::new(config.app_name.clone()));
    let state = router::AppState::new(metrics, bus, renderer);

    let addr: SocketAddr = config.bind_addr;
    info!(
        stage = "app",
        %addr,
        env = %config.environment.as_str(),
        app_name = %config.app_name,
        channel_capacity = config.channel_capacity,
        "starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
