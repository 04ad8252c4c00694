//! localchat relay server
//!
//! Serves `POST /api/chat` and `GET /api/models` in front of a local Ollama
//! instance so that browser or terminal front-ends never talk to it directly.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use localchat_core::{Config, OllamaClient, Relay};

mod routes;

#[derive(Parser)]
#[command(name = "localchat-server")]
#[command(about = "Relay chat requests to a local Ollama server")]
struct Cli {
    /// Config file (defaults to <config dir>/localchat/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Address to listen on, overriding the config file
    #[arg(short, long)]
    bind: Option<String>,
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let relay = Relay::new(OllamaClient::new(config.ollama_url()))
        .with_default_model(config.default_model());

    let bind_addr = cli.bind.as_deref().unwrap_or(config.bind_addr());
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        ollama = relay.ollama_url(),
        default_model = relay.default_model(),
        "localchat relay listening"
    );

    axum::serve(listener, routes::router(relay)).await?;
    Ok(())
}
