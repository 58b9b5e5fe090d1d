mod commands;
pub mod core;

use tracing_subscriber::EnvFilter;

use crate::core::error::LauncherResult;
use crate::core::state::AppState;

pub async fn run() -> LauncherResult<()> {
    // Structured logging on stderr; stdout belongs to the console.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,minelaunch_lib=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Minelaunch starting...");

    let state = AppState::initialize().await?;
    commands::run_console(state).await
}
