//! Box Subscription CLI - Database migrations and catalog checks.
//!
//! # Usage
//!
//! ```bash
//! # Create the session and key-value tables
//! boxsub-cli migrate
//!
//! # Validate the catalog fixtures
//! boxsub-cli catalog check --data-dir crates/storefront/data
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run storefront database migrations
//! - `catalog check` - Parse every fixture file and report problems

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "boxsub-cli")]
#[command(author, version, about = "Box Subscription CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Inspect the catalog fixtures
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Load every fixture and check ids and references
    Check {
        /// Fixture directory
        #[arg(short, long, default_value = "crates/storefront/data")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Catalog { action } => match action {
            CatalogAction::Check { data_dir } => commands::catalog::check(data_dir).await?,
        },
    }
    Ok(())
}
