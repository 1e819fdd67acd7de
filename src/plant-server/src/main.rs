use std::error::Error;

use log::info;
use plant_server::config::Config;
use plant_server::{build_router, startup, RouterConfig};
use structopt::StructOpt;

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::from_args();

    info!("Starting plant-server v{}", env!("CARGO_PKG_VERSION"));

    let state = startup::build_state(&config).await;

    let static_dir = config.static_dir.is_dir().then(|| config.static_dir.clone());
    let app = build_router(
        state,
        &RouterConfig {
            max_upload_bytes: config.max_upload_bytes,
            static_dir,
        },
    );

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
