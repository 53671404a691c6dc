// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orderlink - order-group provisioning and contractor notifications.
//!
//! This is the binary entry point. One binary runs either service:
//! `orderlink userbot` (MTProto user account) or `orderlink notify`
//! (Bot API notify bot).

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod config_cmd;
#[cfg(feature = "mtproto")]
mod mtproto;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use orderlink_config::OrderlinkConfig;

/// Orderlink - order-group provisioning and contractor notifications.
#[derive(Parser, Debug)]
#[command(name = "orderlink", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the userbot service (group provisioning and fallback delivery).
    Userbot,
    /// Run the notify bot service.
    Notify,
    /// Validate the configuration and print a redacted summary.
    Config,
}

/// Loads and validates configuration, rendering diagnostics on failure.
fn load_config(path: Option<&std::path::Path>) -> Option<OrderlinkConfig> {
    let loaded = match path {
        Some(path) => orderlink_config::load_and_validate_path(path),
        None => orderlink_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(errors) => {
            orderlink_config::render_errors(errors);
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let Some(config) = load_config(cli.config.as_deref()) else {
        std::process::exit(1);
    };

    let result = match cli.command {
        Commands::Userbot => serve::run_userbot(config).await,
        Commands::Notify => serve::run_notify(config).await,
        Commands::Config => {
            print!("{}", config_cmd::summary(&config));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["orderlink", "userbot"]).unwrap();
        assert!(matches!(cli.command, Commands::Userbot));

        let cli = Cli::try_parse_from(["orderlink", "notify", "--config", "/tmp/o.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Notify));
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/o.toml")));

        assert!(Cli::try_parse_from(["orderlink"]).is_err());
        assert!(Cli::try_parse_from(["orderlink", "shell"]).is_err());
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orderlink.toml");
        std::fs::write(&path, "[gateway]\nport = 8002\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.gateway.port, 8002);
    }
}
