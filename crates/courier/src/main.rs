// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Courier - deferred-delivery campaign scheduler.
//!
//! This is the binary entry point for the Courier service and its
//! operator commands.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod publish;
mod serve;
mod stats;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use courier_config::model::CourierConfig;

/// Courier - deferred-delivery campaign scheduler.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scheduler until SIGINT or SIGTERM.
    Serve,
    /// Store a campaign from a JSON file and announce it for dispatch.
    Publish {
        /// Path to the campaign JSON (`message_text`, `filter_choice`, windows).
        file: PathBuf,
    },
    /// Print delivery statistics for every campaign.
    Stats {
        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Validate configuration and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => courier_config::load_and_validate_path(path),
        None => courier_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            courier_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Publish { file }) => publish::run_publish(&config, &file).await,
        Some(Commands::Stats { json }) => stats::run_stats(&config, json).await,
        Some(Commands::CheckConfig) => {
            print_config_summary(&config);
            Ok(())
        }
        None => {
            println!("courier: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_config_summary(config: &CourierConfig) {
    println!("configuration OK");
    println!("  service:   {}", config.service.name);
    println!(
        "  broker:    {} ({} / {})",
        config.broker.kind, config.broker.group_subject, config.broker.pool_subject
    );
    println!("  database:  {}", config.storage.database_path);
    println!("  delivery:  {}", config.delivery.base_url);
    println!(
        "  retries:   up to {} attempts, sweep every {}s",
        config.scheduler.max_attempts, config.scheduler.sweep_interval_secs
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = courier_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.service.name, "courier");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::parse_from(["courier", "--config", "c.toml", "stats", "--json"]);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(cli.command, Some(Commands::Stats { json: true })));

        let cli = Cli::parse_from(["courier", "publish", "spring.json"]);
        assert!(matches!(cli.command, Some(Commands::Publish { .. })));
    }
}
