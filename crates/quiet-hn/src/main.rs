use axum::routing::get;
use clap::Parser;
use quiet_hn::config::Config;
use quiet_hn::id_cache::IdListCache;
use quiet_hn::item_cache::ItemCache;
use quiet_hn::web::{router, AppState};
use quiet_hn::{Dispatcher, HttpFetcher};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Quiet Hacker News: the top link stories, without the noise.
#[derive(Parser)]
#[command(name = "quiet-hn")]
struct Args {
    /// Path to the TOML config file (defaults are used if it is missing)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Port to serve on, overriding server.listen_addr
    #[arg(long)]
    port: Option<u16>,

    /// Number of stories on the front page, overriding server.num_stories
    #[arg(long)]
    num_stories: Option<usize>,

    /// Base URL of the item API, overriding upstream.base_url
    #[arg(long)]
    upstream: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.listen_addr = format!("0.0.0.0:{port}");
        }
        if let Some(n) = self.num_stories {
            config.server.num_stories = n;
        }
        if let Some(url) = &self.upstream {
            config.upstream.base_url = url.clone();
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let args = Args::parse();
    let mut config = Config::load_or_default(&args.config);
    args.apply(&mut config);

    let fetcher = HttpFetcher::new(&config.upstream.base_url, config.upstream.timeout())
        .unwrap_or_else(|e| panic!("failed to build HTTP client: {e}"));

    let items = Arc::new(ItemCache::new(config.cache.item_capacity));
    let ids = Arc::new(IdListCache::new(
        config.cache.ids_ttl(),
        config.cache.ids_refresh_buffer(),
    ));
    let dispatcher =
        Dispatcher::new(fetcher, items, ids).with_width(config.dispatcher.max_concurrent);

    let state = Arc::new(AppState {
        dispatcher,
        num_stories: config.server.num_stories,
    });

    let mut app = router(state);
    match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            app = app.route(
                "/metrics",
                get(move || {
                    let h = handle.clone();
                    async move { h.render() }
                }),
            );
        }
        Err(e) => tracing::warn!(error = %e, "prometheus recorder unavailable, /metrics disabled"),
    }

    let addr = config.server.listen_addr.clone();
    tracing::info!(
        addr = %addr,
        upstream = %config.upstream.base_url,
        num_stories = config.server.num_stories,
        max_concurrent = config.dispatcher.max_concurrent,
        item_capacity = config.cache.item_capacity,
        ids_ttl_s = config.cache.ids_ttl_seconds,
        ids_refresh_buffer_s = config.cache.ids_refresh_buffer_seconds,
        "quiet-hn starting"
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {addr}: {e}"));

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("quiet-hn shut down");
}

/// Listen for SIGINT (Ctrl+C) or SIGTERM and cancel the shutdown token.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C only");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    tracing::info!("shutdown signal received, draining connections...");
    token.cancel();
}
