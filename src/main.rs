//! news-herald binary entrypoint.
//!
//! `news-herald [monitor|once]`: `monitor` (default) loops until ctrl-c,
//! `once` runs a single diagnostic cycle and exits.

use std::net::SocketAddr;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_herald::{api, build_orchestrator, metrics::Metrics, HeraldConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Monitor,
    Once,
}

fn parse_mode(arg: Option<&str>) -> Mode {
    match arg {
        Some("once") => Mode::Once,
        _ => Mode::Monitor,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_herald=info,warn"));
    let json = std::env::var("HERALD_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = match HeraldConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "fatal configuration error");
            return Err(e.into());
        }
    };

    info!(
        interval_secs = cfg.check_interval.as_secs(),
        max_posts_per_day = cfg.max_posts_per_day,
        telegram = cfg.telegram_enabled(),
        x = cfg.x_enabled(),
        linkedin = cfg.linkedin_enabled(),
        cms = cfg.cms_enabled(),
        submissions = cfg.submissions_dir.is_some(),
        "news-herald starting"
    );

    let mode = parse_mode(std::env::args().nth(1).as_deref());
    let mut orchestrator = build_orchestrator(&cfg)?;
    orchestrator.probe_channels().await;

    if mode == Mode::Once {
        let report = orchestrator.run_once().await;
        info!(
            fetched = report.fetched,
            new = report.new,
            enqueued = report.enqueued,
            "single run complete"
        );
        return Ok(());
    }

    let metrics = Metrics::init()?;
    let app = api::router(api::AppState::new(
        orchestrator.scheduler(),
        orchestrator.subscribe(),
    ))
    .merge(metrics.router());

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "health server listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!(error = ?e, "health server stopped");
        }
    });

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("stop requested, finishing current cycle");
            let _ = stop_tx.send(true);
        }
    });

    orchestrator.run_continuous(stop_rx).await;
    Ok(())
}
