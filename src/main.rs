use std::{net::SocketAddr, sync::Arc, time::Duration};

use tracing::{info, warn};
use tunestream::{
    cache::{DiskCache, EvictionPolicy, LruSizeCap, Unbounded},
    catalog::CatalogFacade,
    common::{AnyResult, logger},
    configs::{Config, EvictionKind},
    fetcher::TrackFetcher,
    resolver::SourceResolver,
    server::AppState,
    sources::{AudioResolver, CatalogService, SpotifyCatalog, YtDlpResolver},
    transport,
};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = Config::load()?;
    logger::init(&config.logging);
    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let spotify = SpotifyCatalog::new(&config.spotify)?;
    spotify.token_tracker().spawn_refresh_loop();
    let catalog: Arc<dyn CatalogService> = Arc::new(spotify);
    let audio: Arc<dyn AudioResolver> = Arc::new(YtDlpResolver::new(&config.resolver));

    let policy: Box<dyn EvictionPolicy> = match config.cache.eviction {
        EvictionKind::Unbounded => Box::new(Unbounded),
        EvictionKind::Lru => Box::new(LruSizeCap::new(config.cache.max_size_bytes())),
    };
    let cache = Arc::new(DiskCache::new(config.cache.root(), policy));
    match cache.seed().await {
        Ok(count) => info!(
            "Cache at {} holds {} blob(s), {} eviction",
            cache.root().display(),
            count,
            cache.policy_name()
        ),
        Err(e) => warn!("Failed to scan cache at {}: {}", cache.root().display(), e),
    }

    let resolver = SourceResolver::new(
        catalog.clone(),
        audio,
        Duration::from_secs(config.cache.resolution_ttl_secs),
    );
    let address: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = Arc::new(AppState {
        fetcher: TrackFetcher::new(resolver, cache, config.resolver.audio_format),
        catalog: CatalogFacade::new(catalog, config.spotify.search_limit),
        config,
    });

    let app = transport::http_server::router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Listening on {}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
