use tokio::net::TcpListener;
use newtab_api::{
    config::Config,
    api::routes::create_router,
    telemetry,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    telemetry::init(config.log_format)?;

    let server_addr = config.server_addr;
    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; news summaries are disabled");
    }

    let app_state = AppState::new(config);
    if app_state.commands.is_empty() {
        tracing::warn!("command list is empty; /api/command will answer 503");
    } else {
        tracing::info!(commands = app_state.commands.len(), "command list ready");
    }

    let app = create_router(app_state);
    let listener = TcpListener::bind(server_addr).await?;

    tracing::info!(%server_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
