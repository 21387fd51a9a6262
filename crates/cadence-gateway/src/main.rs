use cadence_cache::TieredCache;
use cadence_core::Context;
use cadence_fallback::{FallbackCoordinator, SourceHealth};
use cadence_gateway::config::GatewayConfig;
use cadence_gateway::http::{app, AppState};
use cadence_gateway::{Orchestrator, TtlConfig};
use cadence_kv::KvAdapter;
use cadence_l1cache::L1Cache;
use cadence_maintenance::{ReadinessAggregator, SweepScheduler, Warmup};
use cadence_upstream::{HttpUpstreamAdapter, UpstreamAdapter, UpstreamDescriptor};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cadence-gateway", about = "Song gateway reliability fabric")]
struct Cli {
    /// Path to a TOML config file; missing is not an error, defaults apply.
    #[arg(long)]
    config: Option<String>,

    /// Overrides `server.listen_addr` from the config file/env.
    #[arg(long)]
    port: Option<u16>,

    /// Overrides `RUST_LOG` for the tracing-subscriber env filter.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    let mut config = GatewayConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        let host = config
            .server
            .listen_addr
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("127.0.0.1");
        config.server.listen_addr = format!("{host}:{port}");
    }

    let root_ctx = Context::background();

    let l1 = L1Cache::builder()
        .name("l1")
        .max_size(config.cache.l1_max_size)
        .ttl(Duration::from_secs(config.cache.l1_ttl_secs))
        .build();
    let l2 = KvAdapter::connect(&config.cache.redis_url, config.cache.redis_prefix.clone()).await?;
    let cache = Arc::new(
        TieredCache::builder(l1, l2.clone())
            .stale_ttl(Duration::from_secs(config.cache.stale_ttl_secs))
            .build(),
    );

    let upstreams: Vec<Arc<dyn UpstreamAdapter>> = config
        .upstreams
        .iter()
        .map(|entry| {
            let descriptor: UpstreamDescriptor = entry.into();
            Arc::new(HttpUpstreamAdapter::new(descriptor)) as Arc<dyn UpstreamAdapter>
        })
        .collect();

    let primary = upstreams
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("at least one upstream must be configured"))?;

    let fallback = Arc::new(FallbackCoordinator::new(upstreams.clone()));
    let source_health = Arc::new(SourceHealth::new(upstreams.iter().map(|u| u.name().to_string())));

    let ttl = TtlConfig {
        content_url: Duration::from_secs(config.cache.ttl_content_url_secs),
        catalog: Duration::from_secs(config.cache.ttl_catalog_secs),
    };
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&cache),
        primary,
        Arc::clone(&fallback),
        ttl,
    ));

    let readiness = Arc::new(ReadinessAggregator::new(l2, upstreams, source_health));

    let sweep = SweepScheduler::new(cache.l1(), Duration::from_secs(config.maintenance.sweep_interval_secs));
    let sweep_ctx = root_ctx.child();
    tokio::spawn(async move { sweep.run(&sweep_ctx).await });

    let warmup = Warmup::new(Arc::clone(&cache), Vec::new(), Duration::from_secs(config.maintenance.warmup_interval_secs));
    let warmup_ctx = root_ctx.child();
    tokio::spawn(async move { warmup.run(&warmup_ctx).await });

    let state = AppState {
        orchestrator,
        readiness,
    };

    let router = app(state).layer(TraceLayer::new_for_http()).layer(TimeoutLayer::new(
        Duration::from_secs(config.server.request_timeout_secs),
    ));

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
    tracing::info!(addr = %config.server.listen_addr, "cadence-gateway listening");

    let shutdown_grace = Duration::from_secs(config.maintenance.shutdown_grace_secs);
    let (grace_start_tx, grace_start_rx) = tokio::sync::oneshot::channel();
    let signal_ctx = root_ctx.clone();

    let serve = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(async move {
        wait_for_termination_signal().await;
        tracing::info!("shutdown signal received, draining in-flight requests");
        signal_ctx.cancel();
        let _ = grace_start_tx.send(());
    });

    tokio::select! {
        result = serve => result?,
        _ = grace_deadline(grace_start_rx, shutdown_grace) => {
            tracing::warn!("shutdown grace period elapsed, forcing exit with requests still in flight");
        }
    }

    Ok(())
}

/// Resolves on SIGINT or SIGTERM. Stops axum from accepting new connections
/// the moment it returns; in-flight draining and the grace bound are handled
/// by the caller, not inside this future.
async fn wait_for_termination_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Waits for the shutdown signal to fire, then sleeps `grace` before
/// resolving. Never resolves if no signal arrives, so it only races against
/// `serve` once a shutdown is actually underway.
async fn grace_deadline(start: tokio::sync::oneshot::Receiver<()>, grace: Duration) {
    if start.await.is_ok() {
        tokio::time::sleep(grace).await;
    } else {
        std::future::pending::<()>().await;
    }
}
