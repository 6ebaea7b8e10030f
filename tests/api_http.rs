// tests/api_http.rs
//
// Liveness router exercised in-process via tower::ServiceExt::oneshot.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::sync::watch;
use tower::ServiceExt as _;

use news_herald::api::{self, AppState, ALIVE_BODY};
use news_herald::config::DelayWindows;
use news_herald::herald::Channel;
use news_herald::ledger::Ledger;
use news_herald::orchestrator::StatusSnapshot;
use news_herald::scheduler::PublicationScheduler;

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router(scheduler: Arc<PublicationScheduler>) -> Router {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::open(dir.path().join("seen.json"));
    let (_tx, rx) = watch::channel(StatusSnapshot {
        cycles: 4,
        last_cycle_at: None,
        ledger: ledger.stats(),
    });
    api::router(AppState::new(scheduler, rx))
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn root_and_health_report_alive() {
    let scheduler = Arc::new(PublicationScheduler::new(15, DelayWindows::default()));
    for uri in ["/", "/health"] {
        let (status, body) = get(test_router(scheduler.clone()), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, ALIVE_BODY);
    }
}

#[tokio::test]
async fn stats_reports_scheduler_and_cycle_counters() {
    let scheduler = Arc::new(PublicationScheduler::new(15, DelayWindows::default()));
    scheduler.enqueue(Channel::X, "bn-1", || async { Ok(()) });

    let (status, body) = get(test_router(scheduler), "/stats").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["scheduler"]["pending_length"], 1);
    assert_eq!(json["scheduler"]["max_per_day"], 15);
    assert_eq!(json["scheduler"]["is_draining"], false);
    assert_eq!(json["cycles"], 4);
    assert_eq!(json["ledger"]["total_processed"], 0);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let scheduler = Arc::new(PublicationScheduler::new(15, DelayWindows::default()));
    let (status, _) = get(test_router(scheduler), "/decide").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
