// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Herald - inbound webhook ingestion and tenant routing engine.
//!
//! This is the binary entry point for the Herald service.

use clap::{Parser, Subcommand};

mod serve;

/// Herald - inbound webhook ingestion and tenant routing engine.
#[derive(Parser, Debug)]
#[command(name = "herald", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook gateway and ingestion pipeline.
    Serve,
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match herald_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            herald_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("herald serve failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            print_config(&config);
        }
        None => {
            println!("herald: use --help for available commands");
        }
    }
}

/// Print the resolved configuration with secrets redacted.
fn print_config(config: &herald_config::HeraldConfig) {
    println!("service.name           = {}", config.service.name);
    println!("service.log_level      = {}", config.service.log_level);
    println!(
        "provider.app_secret    = {}",
        if config.provider.app_secret.is_some() {
            "[set]"
        } else {
            "[unset]"
        }
    );
    println!(
        "provider.verify_token  = {}",
        if config.provider.verify_token.is_some() {
            "[set]"
        } else {
            "[unset]"
        }
    );
    println!("provider.api_version   = {}", config.provider.api_version);
    println!("storage.database_path  = {}", config.storage.database_path);
    println!("storage.wal_mode       = {}", config.storage.wal_mode);
    println!(
        "gateway                = {}:{}",
        config.gateway.host, config.gateway.port
    );
    println!(
        "ingest.event_timeout   = {}s",
        config.ingest.event_timeout_secs
    );
    println!(
        "ingest.retention       = {}h",
        config.ingest.delivery_retention_hours
    );
}
