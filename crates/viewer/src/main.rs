mod layer_server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::WrapErr;
use mpk_viewer_core::map::SharedLayerStore;
use mpk_viewer_core::transit::{HttpFetcher, RemoteTransitSource};
use mpk_viewer_core::{LiveMap, ViewerConfig};
use tracing::Level;

use crate::layer_server::{LayerServer, ViewerState};

#[derive(Parser, Debug)]
#[command(
    name = "mpk-viewer",
    version,
    about = "Run the live transit map and expose its layers over HTTP"
)]
struct Args {
    /// JSON config file; every field is optional
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the data server, overrides the config file
    #[arg(long)]
    api: Option<String>,

    /// Vehicle poll interval in seconds, overrides the config file
    #[arg(long)]
    poll_secs: Option<u64>,

    /// Address for the layer server
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn load_config(args: &Args) -> eyre::Result<ViewerConfig> {
    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path)
            .wrap_err_with(|| format!("failed to load config from {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    if let Some(api) = &args.api {
        config.api_base_url = api.clone();
    }
    if let Some(poll_secs) = args.poll_secs {
        config.poll_interval_secs = poll_secs;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let config = load_config(&args)?;

    let fetcher = HttpFetcher::new(config.request_timeout())?;
    let source = RemoteTransitSource::new(fetcher, &config.api_base_url)?;
    tracing::info!(api = %source.base_url(), "Using data server");

    let layers = SharedLayerStore::new(config.initial_view.layer_store());
    let (live, map) = LiveMap::new(layers.clone(), Arc::new(source), &config)?;
    let live_task = tokio::spawn(live.run());

    let server = LayerServer::start(args.bind, ViewerState { layers, map })
        .await
        .wrap_err_with(|| format!("failed to bind {}", args.bind))?;
    tracing::info!(addr = %server.addr(), "Layer server listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    drop(server);
    live_task.abort();
    Ok(())
}
