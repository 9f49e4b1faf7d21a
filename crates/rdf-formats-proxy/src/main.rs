//! rdf-formats-proxy daemon - HTTP proxy that transcodes RDF on the fly

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use rdf_formats_proxy::config::Config;
use rdf_formats_proxy::error::Result;
use rdf_formats_proxy::formats::Formats;
use rdf_formats_proxy::proxy::ProxyServer;

/// rdf-formats-proxy - fetch RDF documents in the serialization you accept
#[derive(Parser)]
#[command(name = "rdf-formats-proxy")]
#[command(about = "An HTTP proxy that transcodes RDF documents to the format the client accepts")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Listen address, overriding the config file (e.g. 0.0.0.0:8000)
    #[arg(long, short = 'l', global = true)]
    pub listen: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the proxy server (default command)
    #[command(name = "serve")]
    Serve,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => serve(cli.config, cli.listen).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rdf_formats_proxy=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(config_path: Option<PathBuf>, listen: Option<String>) -> Result<()> {
    tracing::info!("Starting rdf-formats-proxy");

    let mut config = Config::load(config_path.as_deref())?;
    if let Some(listen) = listen {
        config.proxy.listen_addr = listen;
    }
    tracing::debug!("Config loaded: {:?}", config);

    let formats = Formats::common();
    tracing::debug!("Format registry: {:?}", formats);

    let server = ProxyServer::new(config.proxy, Arc::new(formats));
    server.serve().await?;

    tracing::info!("rdf-formats-proxy stopped");
    Ok(())
}
