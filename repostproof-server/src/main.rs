// repostproof-server/src/main.rs
//
// Binary entry point for the repostproof service.
//
// Responsibilities:
// - Parsing flags and environment variables (`ServerArgs`).
// - Setting up logging via env_logger (RUST_LOG, default "info").
// - Validating configuration and creating the scratch directory at startup,
//   so its lifecycle is owned here rather than by import-time side effects.
// - Warning early when the external engine binary is missing.
// - Serving the upload/download API until shutdown.

use clap::Parser;
use log::{info, warn};
use repostproof_core::SidecarRunner;
use repostproof_server::config::ServerArgs;
use repostproof_server::handlers::{router, AppState};

use std::fs;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = ServerArgs::parse();
    let config = args.core_config();
    config.validate()?;
    fs::create_dir_all(&config.scratch_dir)?;

    if let Err(e) = repostproof_core::check_dependency("ffmpeg") {
        warn!(
            "Engine check failed, uploads will error until ffmpeg is installed: {}",
            e
        );
    }

    let addr = format!("{}:{}", args.host, args.port);
    let state = AppState::new(config, args.public_url(), Arc::new(SidecarRunner));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
