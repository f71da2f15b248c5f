//! Colibrí CLI - Database migrations and order operations.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! colibri-cli migrate
//!
//! # Seed the catalog with demo products
//! colibri-cli seed
//!
//! # Resolve a pending cancellation request
//! colibri-cli cancellation resolve 42 --approve
//! colibri-cli cancellation resolve 42 --reject
//!
//! # Move a return request along its lifecycle
//! colibri-cli return advance 17 received
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the catalog with demo products
//! - `cancellation resolve` - Approve or reject a cancellation request
//! - `return advance` - Advance a return request to its next status

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "colibri-cli")]
#[command(author, version, about = "Colibrí CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed the catalog with demo products
    Seed,
    /// Manage cancellation requests
    Cancellation {
        #[command(subcommand)]
        action: CancellationAction,
    },
    /// Manage return requests
    Return {
        #[command(subcommand)]
        action: ReturnAction,
    },
}

#[derive(Subcommand)]
enum CancellationAction {
    /// Approve or reject a pending cancellation request
    Resolve {
        /// Cancellation request ID
        id: i32,

        /// Approve the request (cancels the order and refunds captured payments)
        #[arg(long, conflicts_with = "reject")]
        approve: bool,

        /// Reject the request (the order continues unchanged)
        #[arg(long)]
        reject: bool,
    },
}

#[derive(Subcommand)]
enum ReturnAction {
    /// Advance a return request to the given status
    Advance {
        /// Return request ID
        id: i32,

        /// Next status: approved, rejected, in-transit, received, refunded
        status: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Seed => commands::seed::products().await?,
        Commands::Cancellation { action } => match action {
            CancellationAction::Resolve {
                id,
                approve,
                reject,
            } => {
                if approve == reject {
                    return Err("pass exactly one of --approve or --reject".into());
                }
                commands::orders::resolve_cancellation(id, approve).await?;
            }
        },
        Commands::Return { action } => match action {
            ReturnAction::Advance { id, status } => {
                commands::orders::advance_return(id, &status).await?;
            }
        },
    }
    Ok(())
}
