//! Order Desk CLI - migrations, schema export and catalog checks.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! od-cli migrate
//!
//! # Print the GraphQL schema
//! od-cli schema > schema.graphql
//!
//! # Validate a catalog fixture
//! od-cli check-catalog crates/api/fixtures/catalog.yaml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "od-cli")]
#[command(author, version, about = "Order Desk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Print the GraphQL schema (SDL) to stdout
    Schema,
    /// Load a catalog fixture and report what it contains
    CheckCatalog {
        /// Path to the catalog YAML file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Schema => {
            commands::schema::print();
            Ok(())
        }
        Commands::CheckCatalog { path } => commands::catalog::check(&path),
    }
}
