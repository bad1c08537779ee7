use stayspot_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = stayspot_api::setup::initialize_app(config.clone()).await?;

    let served = stayspot_api::setup::server::start_server(&config, router).await;

    // Close the store even when the server failed, then report the server error.
    if let Err(e) = state.store.close().await {
        tracing::error!(error = %e, "Failed to close blob store");
    }
    stayspot_infra::shutdown_telemetry().await;

    served
}
