use std::sync::Arc;

use userhub::bus::EventBus;
use userhub::handlers;
use userhub::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "userhub=debug,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::init().await?;

    tracing::info!("verifying database integrity");
    state.store.initialize().await?;

    let bus = Arc::new(EventBus::new());
    handlers::bind_all(&bus, &state);

    tracing::info!(
        authentication = %state.config.bus.authentication,
        describe_user = %state.config.bus.describe_user,
        update_user_info = %state.config.bus.update_user_info,
        "user service ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    state.store.close().await;
    Ok(())
}
