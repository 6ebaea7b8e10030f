//! Liveness surface: `/`, `/health` and `/stats`. `/metrics` is merged in by
//! the binary from [`crate::metrics::Metrics::router`].

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tokio::sync::watch;

use crate::orchestrator::StatusSnapshot;
use crate::scheduler::{PublicationScheduler, SchedulerStats};

pub const ALIVE_BODY: &str = "news-herald is active";

#[derive(Clone)]
pub struct AppState {
    scheduler: Arc<PublicationScheduler>,
    status: watch::Receiver<StatusSnapshot>,
}

impl AppState {
    pub fn new(scheduler: Arc<PublicationScheduler>, status: watch::Receiver<StatusSnapshot>) -> Self {
        Self { scheduler, status }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/health", get(alive))
        .route("/stats", get(stats))
        .with_state(state)
}

async fn alive() -> &'static str {
    ALIVE_BODY
}

#[derive(Serialize)]
struct StatsOut {
    scheduler: SchedulerStats,
    #[serde(flatten)]
    status: StatusSnapshot,
}

async fn stats(State(state): State<AppState>) -> Json<StatsOut> {
    Json(StatsOut {
        scheduler: state.scheduler.stats(),
        status: state.status.borrow().clone(),
    })
}
