mod commands;
mod config;
mod openai;
mod server;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::commands::{cmd_debug, cmd_expiring, cmd_inventory, cmd_recipe, parse_date};
use crate::config::Config;
use crate::openai::{DummyGenerator, OpenAiClient};
use crate::store::JsonFileStore;
use pantry_core::cache::RecipeCache;
use pantry_core::service::PantryService;

#[derive(Parser)]
#[command(
    name = "pantry",
    version,
    about = "Find food that is about to expire and get a recipe for it"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on (default: $PORT or 5000)
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind to (use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Directory with static frontend files
        #[arg(long, value_name = "PATH", default_value = "public")]
        public_dir: PathBuf,
    },
    /// Show merged inventory (quantities joined with pantry expiry dates)
    Inventory {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List items expiring within the next three days
    Expiring {
        /// Reference date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Suggest a recipe for the items about to expire
    Recipe {
        /// Reference date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Dump raw table records and the merged view as JSON
    Debug,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn build_service(config: &Config) -> Result<PantryService> {
    let store = Box::new(JsonFileStore::new(&config.store_dir));
    let cache = RecipeCache::new(&config.cache_file);

    let service = match config.openai_api_key.as_deref() {
        Some(key) => {
            let client = OpenAiClient::new(key, &config.openai_base_url)?;
            PantryService::new(store, Box::new(client.clone()), cache, &config.table)
                .with_image_backfill(Box::new(client))
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set, using the offline sample generator");
            PantryService::new(store, Box::new(DummyGenerator), cache, &config.table)
        }
    };
    Ok(service)
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let service = build_service(&config)?;

    match cli.command {
        Commands::Serve {
            port,
            bind,
            public_dir,
        } => {
            let port = port.unwrap_or(config.port);
            server::start_server(service, port, &bind, Some(public_dir), config.development)
                .await
        }
        Commands::Inventory { json } => cmd_inventory(&Arc::new(service), json).await,
        Commands::Expiring { date, json } => {
            cmd_expiring(&Arc::new(service), parse_date(date)?, json).await
        }
        Commands::Recipe { date, json } => {
            cmd_recipe(&Arc::new(service), parse_date(date)?, json).await
        }
        Commands::Debug => cmd_debug(&Arc::new(service)).await,
    }
}
