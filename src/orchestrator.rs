// src/orchestrator.rs
//! The cycle loop: fetch, dedupe, score, generate, enqueue, drain, persist.
//!
//! One cycle always runs to completion. A stop request is only observed
//! between cycles.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cms::StubCreator;
use crate::editor::ContentGenerator;
use crate::herald::retry::RetryPolicy;
use crate::herald::{publish_with_retry, Channel, Publisher};
use crate::ingest::enrich::Enricher;
use crate::ingest::fetch_all;
use crate::ingest::types::{Candidate, SourceProvider};
use crate::janitor::IdleCleanup;
use crate::ledger::{Ledger, LedgerStats};
use crate::relevance::{RelevanceGate, RelevanceVerdict};
use crate::scheduler::{DrainReport, PublicationScheduler};

/// Everything a cycle talks to besides the ledger and the scheduler.
pub struct Collaborators {
    pub sources: Vec<Box<dyn SourceProvider>>,
    pub enricher: Arc<dyn Enricher>,
    pub gate: RelevanceGate,
    pub stubs: Arc<dyn StubCreator>,
    pub generator: Arc<dyn ContentGenerator>,
    /// One per enabled channel. A channel without a publisher is disabled.
    pub publishers: Vec<Arc<dyn Publisher>>,
    pub cleanups: Vec<Arc<dyn IdleCleanup>>,
}

/// Running totals shared with the liveness endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub cycles: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub ledger: LedgerStats,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct CycleReport {
    pub fetched: usize,
    pub new: usize,
    pub enqueued: usize,
    /// `None` when there was nothing new and the drain was skipped.
    pub drain: Option<DrainReport>,
}

pub struct Orchestrator {
    ledger: Ledger,
    scheduler: Arc<PublicationScheduler>,
    collab: Collaborators,
    retry: RetryPolicy,
    check_interval: Duration,
    cycles: u64,
    status: watch::Sender<StatusSnapshot>,
}

impl Orchestrator {
    pub fn new(
        ledger: Ledger,
        scheduler: Arc<PublicationScheduler>,
        collab: Collaborators,
        check_interval: Duration,
    ) -> Self {
        let (status, _) = watch::channel(StatusSnapshot {
            cycles: 0,
            last_cycle_at: None,
            ledger: ledger.stats(),
        });
        Self {
            ledger,
            scheduler,
            collab,
            retry: RetryPolicy::default(),
            check_interval,
            cycles: 0,
            status,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn scheduler(&self) -> Arc<PublicationScheduler> {
        self.scheduler.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.subscribe()
    }

    /// Check every publisher once. Failures are logged and never fatal.
    pub async fn probe_channels(&self) {
        for p in &self.collab.publishers {
            match p.probe().await {
                Ok(identity) => info!(target: "orchestrator", channel = %p.channel(), %identity, "connection ok"),
                Err(e) => warn!(target: "orchestrator", channel = %p.channel(), error = ?e, "connection check failed"),
            }
        }
    }

    /// Single-shot mode.
    pub async fn run_once(&mut self) -> CycleReport {
        self.run_cycle().await
    }

    /// Continuous mode: cycle, sleep, repeat until `stop` turns true (or its
    /// sender goes away). The sleep ends early on stop; a cycle never does.
    pub async fn run_continuous(&mut self, mut stop: watch::Receiver<bool>) {
        info!(
            target: "orchestrator",
            interval_secs = self.check_interval.as_secs(),
            "monitoring started"
        );
        loop {
            if *stop.borrow() {
                break;
            }
            self.run_cycle().await;
            if *stop.borrow() {
                break;
            }

            debug!(target: "orchestrator", secs = self.check_interval.as_secs(), "sleeping until next check");
            tokio::select! {
                _ = tokio::time::sleep(self.check_interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!(target: "orchestrator", cycles = self.cycles, "monitoring stopped");
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let t0 = Instant::now();
        info!(target: "orchestrator", cycle = self.cycles, "cycle started");

        let fetched = fetch_all(&self.collab.sources).await;
        let mut report = CycleReport {
            fetched: fetched.len(),
            ..CycleReport::default()
        };

        let fresh = self.ledger.filter_new(fetched);
        report.new = fresh.len();
        if fresh.is_empty() {
            info!(target: "orchestrator", "no new candidates");
            self.finish(t0);
            return report;
        }
        counter!("herald_candidates_new_total").increment(fresh.len() as u64);

        let mut processed = Vec::with_capacity(fresh.len());
        for candidate in fresh {
            let candidate = if candidate.full_body.is_none() {
                self.collab.enricher.enrich(candidate).await
            } else {
                candidate
            };
            report.enqueued += self.process(&candidate).await;
            processed.push(candidate);
        }

        let drain = self.scheduler.drain().await;

        self.ledger.mark_seen(&processed);
        for item in &drain.executed {
            self.ledger
                .record_publication_event(&item.candidate_id, item.channel.as_str());
        }
        report.drain = Some(drain);

        self.run_cleanups();
        self.finish(t0);
        report
    }

    /// Score, link, generate and enqueue one candidate. Returns the number of
    /// queue items created.
    async fn process(&self, candidate: &Candidate) -> usize {
        info!(target: "orchestrator", id = %candidate.id, title = %candidate.title, "processing");

        let verdict = self.collab.gate.evaluate(candidate).await;
        let stub_url = self.collab.stubs.create_stub(candidate).await;
        let content = self.collab.generator.generate(candidate, &stub_url).await;

        let mut enqueued = 0;
        for publisher in &self.collab.publishers {
            let channel = publisher.channel();
            if !channel_allowed(&channel, &verdict) {
                info!(
                    target: "orchestrator",
                    channel = %channel,
                    score = %verdict.score,
                    reason = %verdict.reason,
                    "channel skipped by relevance"
                );
                continue;
            }
            let Some(payload) = content.payload_for(&channel) else {
                debug!(target: "orchestrator", channel = %channel, "no content for channel");
                continue;
            };

            let publisher = publisher.clone();
            let retry = self.retry;
            self.scheduler.enqueue(channel, candidate.id.clone(), move || async move {
                publish_with_retry(publisher.as_ref(), &payload, &retry)
                    .await
                    .map_err(anyhow::Error::from)
            });
            enqueued += 1;
        }
        enqueued
    }

    fn run_cleanups(&self) {
        for task in &self.collab.cleanups {
            let task = task.clone();
            tokio::task::spawn_blocking(move || {
                let removed = task.sweep();
                debug!(target: "orchestrator", task = task.name(), removed, "cleanup done");
            });
        }
    }

    fn finish(&mut self, t0: Instant) {
        let now = Utc::now();
        histogram!("herald_cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("herald_last_cycle_ts").set(now.timestamp() as f64);

        let ledger = self.ledger.stats();
        let sched = self.scheduler.stats();
        info!(
            target: "orchestrator",
            total_processed = ledger.total_processed,
            seen_keys = ledger.total_seen_keys,
            daily_count = sched.daily_count,
            max_per_day = sched.max_per_day,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "cycle finished"
        );
        self.status.send_replace(StatusSnapshot {
            cycles: self.cycles,
            last_cycle_at: Some(now),
            ledger,
        });
    }
}

/// Telegram is the broadcast channel and is never gated.
fn channel_allowed(channel: &Channel, verdict: &RelevanceVerdict) -> bool {
    match channel {
        Channel::Telegram => true,
        Channel::X => verdict.publish_to_x,
        Channel::LinkedIn => verdict.publish_to_linkedin,
        Channel::Other(_) => true,
    }
}
