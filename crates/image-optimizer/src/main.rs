use anyhow::Result;
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::oneshot;
use tracing::{error, info};

use disk_cache_store::{CleanupScheduler, DiskCacheStore};
use image_optimizer::{
    config::Config,
    observability::init_tracing,
    services::{HttpImageDownloader, ImageOptimizer},
    utils::format_megabytes,
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "image-optimizer")]
#[command(version)]
#[command(about = "On-the-fly image resizing proxy with a bounded disk cache")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (defaults to config.toml; a missing file is fine)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Cache directory
    #[arg(short = 'd', long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;

    // Override config with CLI arguments
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(cache_dir) = cli.cache_dir {
        config.cache.dir = cache_dir;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.log_json {
        config.logging.json = true;
    }
    let config = config.validate()?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_tracing(&config.logging.level, config.logging.json)?;
    info!("Starting Image Optimizer v{}", env!("CARGO_PKG_VERSION"));

    let policy = config.cache.retention_policy();
    let store = DiskCacheStore::builder()
        .base_directory(&config.cache.dir)
        .retention(policy)
        .build()
        .await?;

    let scheduler = CleanupScheduler::for_store(store.clone());
    info!(
        "Cache configuration: ttl={}, directory={}, max_size={}, sweep_every={}",
        humantime::format_duration(policy.ttl),
        config.cache.dir.display(),
        format_megabytes(policy.max_size_bytes),
        humantime::format_duration(scheduler.period())
    );
    let cleanup = scheduler.start();

    let fetcher = Arc::new(HttpImageDownloader::with_timeout(config.upstream.timeout)?);
    info!(
        "Upstream fetch timeout: {}",
        humantime::format_duration(fetcher.timeout())
    );
    let optimizer = Arc::new(ImageOptimizer::new(store, fetcher));

    let state = AppState::new(optimizer, config.web.api_token.as_deref());
    if state.api_token.is_none() {
        info!("No API token configured, /api routes are open");
    }

    let server = WebServer::new(state, config.web.socket_addr()?);
    let (ready_tx, ready_rx) = oneshot::channel();
    let serve = tokio::spawn(server.serve_with_cancellation(ready_tx, None));

    match ready_rx.await {
        Ok(Ok(addr)) => info!("Image optimizer ready on http://{}", addr),
        Ok(Err(e)) => error!("Web server failed to start: {}", e),
        Err(_) => error!("Web server exited before signalling readiness"),
    }

    let result = serve.await;
    cleanup.stop().await;
    info!("Image optimizer stopped");

    result?
}
