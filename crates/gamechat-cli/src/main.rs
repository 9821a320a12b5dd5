//! gamechat-bridge: relay between a game server and a chat channel
//!
//! Usage: `gamechat-bridge <cod2|cod4> [config path]`
//!
//! Binds `/tmp/opencj_events_<game>` (or the configured prefix), waits for
//! the game server to connect, and bridges its events to the chat channel.

mod config;
mod console;

use anyhow::{Context, Result, bail};
use config::BridgeConfig;
use console::{ConsoleDispatcher, relay_lines};
use gamechat_bridge::BridgeServer;
use gamechat_core::ChannelFilter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let Some(game) = args.get(1) else {
        bail!("Not called for a specific game, exiting");
    };
    let config_path = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| BridgeConfig::default_path(game));

    let config = BridgeConfig::load(game, &config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    info!(
        "Bridging {} to channel {} in guild {} ({:?} profile)",
        game, config.channel_id, config.guild_id, config.server.profile
    );
    debug!("Chat platform token loaded ({} bytes)", config.token.len());

    // Chat-platform side
    let dispatcher = Arc::new(ConsoleDispatcher::stdout());
    let filter = ChannelFilter::new(
        config.guild_id.clone(),
        config.channel_id.clone(),
        config.server.profile.sanitizer(),
    );

    // Game server listener; failing to bind is fatal
    let server = BridgeServer::bind(config.server.clone(), dispatcher.clone())
        .await
        .context("Failed to start game server listener")?;

    tokio::spawn(relay_lines(
        BufReader::new(tokio::io::stdin()),
        server.handle(),
        filter,
        config.guild_id.clone(),
        config.channel_id.clone(),
    ));
    dispatcher.mark_ready();

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                // Without a signal handler, run until killed
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Bridge shutting down");
    Ok(())
}
