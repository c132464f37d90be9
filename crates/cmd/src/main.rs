// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cmd::{config_command, serve_command};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "specserver")]
struct Cli {
    /// Server config file (YAML). Defaults to $SPECSERVER_CONFIG, then built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve replica, commit and rollback upcalls as JSON lines on stdin/stdout
    Serve,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    diagnostics::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => serve_command(cli.config).await,
        Commands::Config => config_command(cli.config),
    }
}
