mod processor;
mod server;

use clap::{Parser, Subcommand};
use courier_core::config::{self, keys};
use courier_providers::OpenAiCompletion;
use courier_store::Store;
use courier_whatsapp::send::CloudApiSender;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "courier",
    version,
    about = "Courier — WhatsApp Business webhook receiver and chat backend"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server.
    Serve,
    /// Show configuration and database status.
    Status,
    /// Set a configuration value. Omit VALUE to clear the entry.
    SetConfig {
        key: String,
        value: Option<String>,
        /// Description stored with the entry.
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Serve => {
            let cfg = config::load(&cli.config)?;
            let store = Store::new(&cfg.store).await?;

            let processor = processor::EventProcessor::new(
                store.clone(),
                Arc::new(OpenAiCompletion::new()),
                Arc::new(CloudApiSender::new()),
            );
            let state = server::AppState {
                store,
                processor: Arc::new(processor),
                uptime: Instant::now(),
            };

            println!("Courier — starting webhook server...");
            server::serve(&cfg.server, state).await;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("Courier — Status Check\n");
            println!("Config: {}", cli.config);
            println!("Listen: {}:{}", cfg.server.host, cfg.server.port);
            println!("Database: {}", cfg.store.db_path);

            let store = Store::new(&cfg.store).await?;
            println!("Database size: {} bytes", store.db_size().await?);
            println!();

            let map = store.config_map().await?;
            for key in [
                keys::VERIFY_TOKEN,
                keys::WEBHOOK_SECRET,
                keys::WHATSAPP_API_URL,
                keys::WHATSAPP_ACCESS_TOKEN,
                keys::COMPLETION_API_KEY,
                keys::COMPLETION_MODEL,
                keys::SYSTEM_PROMPT,
            ] {
                println!(
                    "  {key}: {}",
                    if map.get(key).is_some() { "set" } else { "unset" }
                );
            }
        }
        Commands::SetConfig {
            key,
            value,
            description,
        } => {
            let cfg = config::load(&cli.config)?;
            let store = Store::new(&cfg.store).await?;

            let value = value.filter(|v| !v.is_empty());
            store.set_config(&key, value.as_deref(), &description).await?;
            println!(
                "{key} {}",
                if value.is_some() { "updated" } else { "cleared" }
            );
        }
    }

    Ok(())
}
