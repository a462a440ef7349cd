//! Tabletop server entry point.
//!
//! Parses the command line, loads the TOML configuration and card data,
//! starts the websocket server and drains it on SIGINT/SIGTERM.

mod cli;
mod config;
mod logging;
mod signals;

use anyhow::Context;
use cli::CliArgs;
use config::AppConfig;
use game_server::{storage, GameServer, ServerConfig};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long the server gets to drain rooms after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Applies command-line overrides on top of the file configuration.
fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(data_dir) = &args.data_dir {
        config.data.directory = data_dir.to_string_lossy().to_string();
    }
    if let Some(bind_address) = &args.bind_address {
        config.server.bind_address = bind_address.clone();
    }
    if let Some(log_level) = &args.log_level {
        config.logging.level = log_level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
}

pub struct Application {
    config: AppConfig,
    server: Arc<GameServer>,
}

impl Application {
    pub async fn new(args: CliArgs) -> anyhow::Result<Self> {
        // Configuration comes before logging so the level can be applied.
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        apply_overrides(&mut config, &args);
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

        logging::setup_logging(&config.logging)?;

        let server_config: ServerConfig = config.to_server_config()?;
        let collaborators = storage::load_data_dir(Path::new(&config.data.directory))
            .await
            .with_context(|| format!("loading card data from {}", config.data.directory))?;
        let server = Arc::new(GameServer::new(server_config, collaborators));

        info!("🃏 Tabletop Server v{}", env!("CARGO_PKG_VERSION"));
        info!(
            "📂 Config: {} | Data: {}",
            args.config_path.display(),
            config.data.directory
        );

        Ok(Self { config, server })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!("  🪑 Max seats per room: {}", self.config.rooms.max_seats);
        info!("  ⏱️ Idle timeout: {}s", self.config.server.idle_timeout_secs);
        match self.config.rooms.rng_seed {
            Some(seed) => warn!("🎲 Rooms use the fixed seed {}", seed),
            None => info!("  🎲 Rooms draw randomness from entropy"),
        }

        let mut server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move { server.start().await })
        };

        info!("🛑 Press Ctrl+C to gracefully shutdown");

        tokio::select! {
            result = signals::wait_for_shutdown() => {
                result.context("installing signal handlers")?;
                info!("🛑 Shutdown signal received, initiating graceful shutdown...");
            }
            finished = &mut server_handle => {
                // The server only returns on its own when it failed to start.
                finished.context("server task panicked")??;
                return Ok(());
            }
        }

        self.server.shutdown();
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut server_handle).await {
            Ok(Ok(Ok(()))) => info!("✅ Tabletop Server shutdown complete"),
            Ok(Ok(Err(e))) => error!("❌ Server error during shutdown: {}", e),
            Ok(Err(e)) => error!("❌ Server task failed: {}", e),
            Err(_) => {
                warn!("⏳ Server did not drain within {:?}, aborting", SHUTDOWN_GRACE);
                server_handle.abort();
            }
        }
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let app = match Application::new(args).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        error!("❌ Application error: {:?}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> CliArgs {
        CliArgs {
            config_path: PathBuf::from("unused.toml"),
            data_dir: Some(PathBuf::from("/srv/cards")),
            bind_address: Some("127.0.0.1:9000".to_string()),
            log_level: Some("debug".to_string()),
            json_logs: true,
        }
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args());
        assert_eq!(config.data.directory, "/srv/cards");
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_absent_overrides_keep_file_values() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            data_dir: None,
            bind_address: None,
            log_level: None,
            json_logs: false,
            ..args()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config, AppConfig::default());
    }
}
