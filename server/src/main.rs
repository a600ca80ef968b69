use clap::Parser;
use log::{error, info, warn};
use server::config::ServerConfig;
use server::level::LevelRegistry;
use server::utils::unix_time;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};

/// Main-method of the application.
/// Loads the configuration, preloads the requested levels and runs the level tick.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// TOML configuration file
        #[clap(short, long)]
        config: Option<PathBuf>,
        /// Server data directory, overrides the configuration
        #[clap(short, long)]
        server_path: Option<PathBuf>,
        /// Seconds between timed level events
        #[clap(short, long)]
        tick_rate: Option<u64>,
        /// Levels to load at startup
        #[clap(short, long)]
        level: Vec<String>,
    }

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(server_path) = args.server_path {
        config.server_path = server_path;
    }
    if let Some(tick_rate) = args.tick_rate {
        config.tick_interval_secs = tick_rate;
    }
    info!("Serving levels from {}", config.levels_path().display());

    let registry = Arc::new(
        LevelRegistry::new(&config.levels_path())
            .with_board_change_lifetime(config.board_change_lifetime_secs),
    );
    for name in &args.level {
        if let Err(e) = registry.find_level(name).await {
            warn!("Could not preload {}: {}", name, e);
        }
    }

    let tick_handle = {
        let registry = Arc::clone(&registry);
        let config = config.clone();
        tokio::spawn(async move {
            run_level_tick(registry, config).await;
        })
    };

    // Handle shutdown gracefully
    tokio::select! {
        result = tick_handle => {
            if let Err(e) = result {
                error!("Level tick task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}

/// Drives the per-second level hook on every loaded level.
async fn run_level_tick(registry: Arc<LevelRegistry>, config: ServerConfig) {
    let mut interval_timer = interval(config.tick_interval());
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first tick since it fires immediately
    interval_timer.tick().await;

    loop {
        interval_timer.tick().await;
        registry.do_timed_events(unix_time()).await;
    }
}
