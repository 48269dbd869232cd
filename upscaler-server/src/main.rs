//! Page Upscaler Server - Headless Gateway
//!
//! An HTTP server that:
//! - Validates access codes and their quota on /api/proxy and /api/verify-code
//! - Forwards page images to Gemini with the server's own key
//! - Hands oversized results out through presigned object-storage links
//!
//! Access via: http://localhost:3000

#![allow(clippy::print_stdout, reason = "admin subcommands print to stdout")]

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod code_commands;
mod router;
mod server_utils;
mod state;
#[cfg(test)]
mod test_helpers;

use cli::{Cli, Commands, ServerArgs};
use state::AppState;
use upscaler_core::middleware::cors::DEFAULT_ALLOWED_ORIGINS;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Some(Commands::Codes(cmd)) => code_commands::handle_code_command(cmd, &cli.redis_url).await,
        Some(Commands::Serve) | None => serve(cli.server, &cli.redis_url).await,
    }
}

async fn serve(args: ServerArgs, redis_url: &str) -> Result<()> {
    info!("🚀 Page Upscaler Server v{} starting on port {}...", env!("CARGO_PKG_VERSION"), args.port);

    let config = args.gateway_config()?;
    let state = AppState::initialize(&config, redis_url, args.memory_store, &args.seed_codes).await?;

    let origins = if args.allowed_origins.is_empty() {
        DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect()
    } else {
        args.allowed_origins.clone()
    };
    let app = router::build_router(state, args.max_body_bytes, &origins);

    let listener = server_utils::create_listener(&args.bind, args.port).await?;
    info!("🌐 Server listening on http://{}", listener.local_addr()?);
    info!("🔀 Gateway endpoints at http://{}/api/proxy", listener.local_addr()?);

    axum::serve(listener, app).with_graceful_shutdown(server_utils::shutdown_signal()).await?;

    info!("👋 Server stopped");
    Ok(())
}
