//! Bookstore CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bookstore-cli migrate
//!
//! # Create the single admin account
//! bookstore-cli admin create -n "Store Admin" -e admin@example.com -p 'long passphrase'
//!
//! # Load books from a JSON array
//! bookstore-cli seed books catalog.json
//! ```
//!
//! All commands read `BOOKSTORE_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bookstore-cli")]
#[command(author, version, about = "Bookstore CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the admin account
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create the admin account (only one may exist)
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long, env = "BOOKSTORE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert books from a JSON file containing an array of books
    Books {
        /// Path to the JSON file
        file: String,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                name,
                email,
                password,
            } => {
                commands::admin::create(&name, &email, &password).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Books { file } => {
                commands::seed::books(&file).await?;
            }
        },
    }
    Ok(())
}
