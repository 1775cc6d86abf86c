//! Cineteca CLI - Database setup and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! ct-cli migrate
//!
//! # Validate the embedded movie catalog
//! ct-cli catalog check
//!
//! # List movies on one shelf
//! ct-cli catalog list --shelf kids
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create the `PostgreSQL` session table
//! - `catalog check` - Load and summarize the embedded catalog
//! - `catalog list` - List movies per shelf

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ct-cli")]
#[command(author, version, about = "Cineteca CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the session table
    Migrate,
    /// Inspect the embedded movie catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Validate the dataset and print a summary
    Check,
    /// List movies per shelf
    List {
        /// Shelf slug (`top`, `books`, `kids`, `documentaries`, `asian`)
        #[arg(short, long)]
        shelf: Option<String>,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Catalog { action } => match action {
            CatalogAction::Check => commands::catalog::check()?,
            CatalogAction::List { shelf } => commands::catalog::list(shelf.as_deref())?,
        },
    }
    Ok(())
}
