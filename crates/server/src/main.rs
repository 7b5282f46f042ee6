mod routes;
mod upstream;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use mpk_transit::{RouteCatalog, StaticTransitProvider};
use tracing::Level;

use crate::routes::SharedSource;
use crate::upstream::{DEFAULT_FEED_URL, MpkLiveSource};

#[derive(Parser, Debug)]
#[command(
    name = "mpk-viewer-server",
    version,
    about = "Serve live vehicle positions and scraped route data"
)]
struct Args {
    /// Scraped route catalog
    #[arg(short, long, default_value = "data/routes.json")]
    routes: PathBuf,

    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:5000")]
    bind: SocketAddr,

    /// Upstream vehicle position feed
    #[arg(long, default_value = DEFAULT_FEED_URL)]
    feed_url: String,

    /// Serve routes only; the vehicle list is always empty
    #[arg(long)]
    offline: bool,

    /// Upstream request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

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

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let catalog = RouteCatalog::load(&args.routes)
        .wrap_err_with(|| format!("failed to load {}", args.routes.display()))?;
    tracing::info!(lines = catalog.len(), path = %args.routes.display(), "Loaded route catalog");

    let provider = StaticTransitProvider::from_catalog(&catalog);
    let source: SharedSource = if args.offline {
        tracing::warn!("Running offline, no live vehicles will be served");
        Arc::new(provider)
    } else {
        Arc::new(MpkLiveSource::new(
            provider,
            catalog.summaries(),
            args.feed_url.clone(),
            Duration::from_secs(args.timeout_secs),
        )?)
    };

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .wrap_err_with(|| format!("failed to bind {}", args.bind))?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, routes::create_router(source))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
