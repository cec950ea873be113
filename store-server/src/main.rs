use store_server::{Config, ServerState, api, utils};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, logging)
    dotenv::dotenv().ok();
    utils::init_logger();

    tracing::info!("SupplyVend store server starting...");

    // 2. Configuration
    let config = Config::from_env();
    tracing::info!(
        environment = %config.environment,
        port = config.http_port,
        "Configuration loaded"
    );

    // 3. State (data dir + embedded store)
    let state = ServerState::initialize(&config);

    // 4. HTTP server
    let app = api::build_app(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
