//! LinkDB gateway, CLI server
//!
//! ```sh
//! # Run with the default config (~/.config/linkdb/config.toml)
//! linkdb-gateway
//!
//! # Custom config path and port
//! linkdb-gateway --config /etc/linkdb/config.toml --port 9100
//!
//! # Validate config without starting
//! linkdb-gateway --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use linkdb::config::{default_config_path, AppConfig};
use linkdb::server::{init_tracing, ServerHandle, ServerOptions};

/// Multi-tenant HTTP gateway over a shared data store.
#[derive(Parser, Debug)]
#[command(
    name = "linkdb-gateway",
    version,
    about = "Multi-tenant HTTP gateway over a shared data store",
    long_about = "LinkDB gateway: issues API keys, gives each key a private namespace \
                  and exposes table and row operations over REST.\n\n\
                  Default config: ~/.config/linkdb/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "LINKDB_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the database URL.
    #[arg(long)]
    database_url: Option<String>,

    /// Validate the configuration and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(ref url) = cli.database_url {
        config.database.url = url.clone();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    let loaded = AppConfig::load_or_default(&config_path);

    if cli.check {
        let mut config = loaded?;
        apply_overrides(&mut config, &cli);
        config.validate()?;
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   Address     : {}", config.server.address());
        println!("   Log level   : {}", config.logging.level);
        println!(
            "   Rate budget : {} requests / {}s",
            config.rate_limit.requests_per_window, config.rate_limit.window_secs
        );
        println!("   Cost / call : {}", config.usage.cost_per_call);
        println!();
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let (mut config, load_error) = match loaded {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    apply_overrides(&mut config, &cli);
    init_tracing(&config);

    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await?;

    handle.install_signal_handler();
    info!("Press Ctrl+C to shut down gracefully.");

    handle.wait().await;
    Ok(())
}
