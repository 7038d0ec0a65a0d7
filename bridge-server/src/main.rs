use bridge_server::core::{Config, Server, ServerState};
use bridge_server::utils::logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    logger::init_logger(&config.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        erp = %config.erp_url,
        broker = %config.broker_url,
        "starting bridge"
    );

    let state = ServerState::initialize(config);
    Server::with_state(state).run().await
}
