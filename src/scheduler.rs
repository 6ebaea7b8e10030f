// src/scheduler.rs
//! Publication scheduler: a strictly sequential FIFO of channel-tagged
//! deferred actions with per-channel jitter and a rolling daily cap.
//!
//! The queue is shared behind a mutex that is never held across an await.
//! Re-entrant drains are refused by the `draining` flag.

use chrono::NaiveDate;
use metrics::{counter, gauge};
use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{DelayWindow, DelayWindows};
use crate::herald::{Channel, DelayClass};

pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
pub type Action = Box<dyn FnOnce() -> ActionFuture + Send>;

/// Source of the calendar day used for the daily cap.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar day.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Fixed per-channel delay policy.
#[derive(Debug, Clone, Copy)]
pub struct DelayPolicy {
    windows: DelayWindows,
}

impl DelayPolicy {
    pub fn new(windows: DelayWindows) -> Self {
        Self { windows }
    }

    pub fn sample<R: Rng>(&self, channel: &Channel, rng: &mut R) -> Duration {
        let window = match channel.delay_class() {
            DelayClass::Instant => return Duration::ZERO,
            DelayClass::BoundedBurst => self.windows.bounded_burst,
            DelayClass::SlowCadence => self.windows.slow_cadence,
            DelayClass::Fallback => self.windows.fallback,
        };
        sample_window(window, rng)
    }
}

fn sample_window<R: Rng>(w: DelayWindow, rng: &mut R) -> Duration {
    Duration::from_millis(rng.random_range(w.min_ms..=w.max_ms))
}

pub struct QueueItem {
    pub channel: Channel,
    /// Candidate the action publishes, for the drain report.
    pub candidate_id: String,
    pub delay: Duration,
    action: Action,
}

impl std::fmt::Debug for QueueItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueItem")
            .field("channel", &self.channel)
            .field("candidate_id", &self.candidate_id)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct SchedulerState {
    pending: VecDeque<QueueItem>,
    daily_count: u32,
    daily_count_day: NaiveDate,
}

/// One queue item as seen by the drain report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRef {
    pub channel: Channel,
    pub candidate_id: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub executed: Vec<ItemRef>,
    /// Dropped because the daily cap was reached, in queue order.
    pub skipped: Vec<ItemRef>,
    pub failed: Vec<ItemRef>,
    /// True when the call found another drain in progress and did nothing.
    pub already_draining: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub pending_length: usize,
    pub is_draining: bool,
    pub daily_count: u32,
    pub max_per_day: u32,
}

pub struct PublicationScheduler {
    state: Mutex<SchedulerState>,
    draining: AtomicBool,
    max_per_day: u32,
    policy: DelayPolicy,
    clock: Arc<dyn Clock>,
}

/// Clears the draining flag however the drain ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PublicationScheduler {
    pub fn new(max_per_day: u32, windows: DelayWindows) -> Self {
        Self::with_clock(max_per_day, windows, Arc::new(LocalClock))
    }

    pub fn with_clock(max_per_day: u32, windows: DelayWindows, clock: Arc<dyn Clock>) -> Self {
        let today = clock.today();
        Self {
            state: Mutex::new(SchedulerState {
                pending: VecDeque::new(),
                daily_count: 0,
                daily_count_day: today,
            }),
            draining: AtomicBool::new(false),
            max_per_day,
            policy: DelayPolicy::new(windows),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        // A panic inside a critical section cannot leave the queue half-updated.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Append a deferred action for `channel`, with a delay drawn from the
    /// channel's window.
    pub fn enqueue<F, Fut>(&self, channel: Channel, candidate_id: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let delay = self.policy.sample(&channel, &mut rand::rng());
        let candidate_id = candidate_id.into();
        info!(
            target: "scheduler",
            channel = %channel,
            id = %candidate_id,
            delay_secs = delay.as_secs(),
            "queued"
        );
        let item = QueueItem {
            channel,
            candidate_id,
            delay,
            action: Box::new(move || Box::pin(action()) as ActionFuture),
        };
        self.lock().pending.push_back(item);
    }

    /// Channel and delay of every pending item, in queue order.
    pub fn pending(&self) -> Vec<(Channel, Duration)> {
        self.lock()
            .pending
            .iter()
            .map(|i| (i.channel.clone(), i.delay))
            .collect()
    }

    /// Execute every pending item in FIFO order. Once the daily cap is hit,
    /// every remaining item is dropped. A failing action never stops the drain.
    pub async fn drain(&self) -> DrainReport {
        if self.draining.swap(true, Ordering::AcqRel) {
            warn!(target: "scheduler", "drain already in progress, skipping");
            return DrainReport {
                already_draining: true,
                ..DrainReport::default()
            };
        }
        let _guard = DrainGuard(&self.draining);

        self.reset_if_new_day();

        let mut report = DrainReport::default();
        info!(target: "scheduler", pending = self.lock().pending.len(), "draining");

        loop {
            let (item, capped) = {
                let mut st = self.lock();
                let Some(item) = st.pending.pop_front() else {
                    break;
                };
                (item, st.daily_count >= self.max_per_day)
            };
            let item_ref = ItemRef {
                channel: item.channel.clone(),
                candidate_id: item.candidate_id.clone(),
            };

            if capped {
                warn!(
                    target: "scheduler",
                    channel = %item.channel,
                    max_per_day = self.max_per_day,
                    "daily limit reached, dropping item"
                );
                counter!("herald_quota_skipped_total").increment(1);
                report.skipped.push(item_ref);
                continue;
            }

            if !item.delay.is_zero() {
                info!(target: "scheduler", channel = %item.channel, wait_secs = item.delay.as_secs(), "waiting");
                tokio::time::sleep(item.delay).await;
            }

            match (item.action)().await {
                Ok(()) => {
                    let count = {
                        let mut st = self.lock();
                        st.daily_count += 1;
                        st.daily_count
                    };
                    gauge!("herald_daily_count").set(f64::from(count));
                    counter!("herald_published_total", "channel" => item_ref.channel.to_string()).increment(1);
                    info!(
                        target: "scheduler",
                        channel = %item_ref.channel,
                        today = count,
                        max_per_day = self.max_per_day,
                        "published"
                    );
                    report.executed.push(item_ref);
                }
                Err(e) => {
                    counter!("herald_publish_failures_total", "channel" => item_ref.channel.to_string()).increment(1);
                    warn!(target: "scheduler", channel = %item_ref.channel, error = ?e, "publish failed");
                    report.failed.push(item_ref);
                }
            }
        }

        info!(
            target: "scheduler",
            executed = report.executed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "queue empty"
        );
        report
    }

    fn reset_if_new_day(&self) {
        let today = self.clock.today();
        let mut st = self.lock();
        if st.daily_count_day != today {
            info!(target: "scheduler", previous = st.daily_count, "daily counter reset");
            st.daily_count = 0;
            st.daily_count_day = today;
            gauge!("herald_daily_count").set(0.0);
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        let st = self.lock();
        SchedulerStats {
            pending_length: st.pending.len(),
            is_draining: self.draining.load(Ordering::Acquire),
            daily_count: st.daily_count,
            max_per_day: self.max_per_day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn instant_channel_has_no_delay() {
        let p = DelayPolicy::new(DelayWindows::default());
        let mut rng = rand::rng();
        assert_eq!(p.sample(&Channel::Telegram, &mut rng), Duration::ZERO);
    }

    #[test]
    fn every_window_is_respected() {
        let windows = DelayWindows::default();
        let p = DelayPolicy::new(windows);
        let mut rng = rand::rng();
        for _ in 0..500 {
            let slow = p.sample(&Channel::LinkedIn, &mut rng);
            assert!(slow >= windows.slow_cadence.min() && slow <= windows.slow_cadence.max());
            let other = p.sample(&Channel::Other("rss-mirror".into()), &mut rng);
            assert!(other >= windows.fallback.min() && other <= windows.fallback.max());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_stop_the_drain_or_count() {
        let s = PublicationScheduler::new(10, DelayWindows::default());
        s.enqueue(Channel::Telegram, "a", || async { Err(anyhow!("down")) });
        s.enqueue(Channel::Telegram, "b", || async { Ok(()) });
        let r = s.drain().await;
        assert_eq!(r.failed.len(), 1);
        assert_eq!(r.executed.len(), 1);
        assert_eq!(r.executed[0].candidate_id, "b");
        assert_eq!(s.stats().daily_count, 1);
        assert!(!s.stats().is_draining);
    }

    #[tokio::test(start_paused = true)]
    async fn reentrant_drain_is_a_noop() {
        let s = Arc::new(PublicationScheduler::new(10, DelayWindows::default()));
        let inner = s.clone();
        let (tx, rx) = tokio::sync::oneshot::channel();
        s.enqueue(Channel::Telegram, "outer", move || async move {
            let nested = inner.drain().await;
            let _ = tx.send(nested);
            Ok(())
        });
        s.enqueue(Channel::Telegram, "after", || async { Ok(()) });

        let outer = s.drain().await;
        let nested = rx.await.unwrap();
        assert!(nested.already_draining);
        assert!(nested.executed.is_empty());
        assert_eq!(outer.executed.len(), 2);
    }
}
