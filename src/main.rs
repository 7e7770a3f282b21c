//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `affiliate_gateway` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//!
//! All gateway functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use affiliate_gateway::initialization::init_logger_with;
use affiliate_gateway::{run_server, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let config = Config::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    if let Err(e) = run_server(config).await {
        eprintln!("affiliate_gateway error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}
