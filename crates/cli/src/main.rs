//! Wholesale CLI - Offline cart and category tree tools.
//!
//! # Usage
//!
//! ```bash
//! # Add a product to the local cart (repeat to raise the quantity)
//! ws-cli cart add --id 1 --sku A1 --name Widget --price 100
//!
//! # Show, remove from, or empty the local cart
//! ws-cli cart show
//! ws-cli cart remove --id 1
//! ws-cli cart clear
//!
//! # Print the category tree from a file or the live API
//! ws-cli categories tree --file tree.json
//! ws-cli categories tree --api-url http://localhost:8000 --token "$TOKEN"
//! ```
//!
//! # Commands
//!
//! - `cart` - File-backed cart using the same aggregator as the storefront
//! - `categories tree` - Print the category hierarchy, one line per node

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use wholesale_core::ProductId;
use wholesale_core::cart::ProductInput;

mod commands;

#[derive(Parser)]
#[command(name = "ws-cli")]
#[command(author, version, about = "Wholesale client CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the local cart
    Cart {
        #[command(flatten)]
        store: DataDir,

        #[command(subcommand)]
        action: CartAction,
    },
    /// Inspect the category tree
    Categories {
        #[command(subcommand)]
        action: CategoriesAction,
    },
}

#[derive(Args)]
struct DataDir {
    /// Directory holding the cart file
    #[arg(long, global = true, env = "WHOLESALE_DATA_DIR", default_value = ".wholesale")]
    data_dir: PathBuf,
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show,
    /// Add one unit of a product
    Add {
        /// Product id
        #[arg(long)]
        id: ProductId,

        /// Product SKU
        #[arg(long)]
        sku: String,

        /// Product name
        #[arg(long)]
        name: String,

        /// Unit price as a decimal, e.g. `12.50`
        #[arg(long)]
        price: String,
    },
    /// Remove a product
    Remove {
        /// Product id
        #[arg(long)]
        id: ProductId,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum CategoriesAction {
    /// Print the full tree
    Tree {
        /// JSON file with the tree (as returned by `GET /api/categories/`); wins over the API
        #[arg(long)]
        file: Option<PathBuf>,

        /// Wholesale API base URL
        #[arg(long, env = "WHOLESALE_API_URL")]
        api_url: Option<String>,

        /// Access token for the API
        #[arg(long, env = "WHOLESALE_API_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Slug to mark as selected
        #[arg(long)]
        select: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ws_cli=info,wholesale_storefront=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Cart { store, action } => {
            let dir = store.data_dir;
            match action {
                CartAction::Show => commands::cart::show(&dir),
                CartAction::Add {
                    id,
                    sku,
                    name,
                    price,
                } => commands::cart::add(
                    &dir,
                    ProductInput {
                        id,
                        sku,
                        name,
                        base_price: price,
                    },
                )?,
                CartAction::Remove { id } => commands::cart::remove(&dir, id)?,
                CartAction::Clear => commands::cart::clear(&dir)?,
            }
        }
        Commands::Categories { action } => match action {
            CategoriesAction::Tree {
                file,
                api_url,
                token,
                select,
            } => {
                let source = commands::categories::TreeSource::from_options(file, api_url, token)?;
                commands::categories::tree(source, select).await?;
            }
        },
    }
    Ok(())
}
