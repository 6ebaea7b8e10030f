// tests/scheduler_quota.rs
//
// Publication scheduler: daily cap, day rollover, FIFO order and delay bounds.

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use chrono::NaiveDate;
use news_herald::config::{DelayWindow, DelayWindows};
use news_herald::herald::Channel;
use news_herald::scheduler::{Clock, DelayPolicy, PublicationScheduler};

struct ManualClock(Mutex<NaiveDate>);

impl ManualClock {
    fn new(y: i32, m: u32, d: u32) -> Arc<Self> {
        Arc::new(Self(Mutex::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())))
    }

    fn advance_day(&self) {
        let mut day = self.0.lock().unwrap();
        *day = day.succ_opt().unwrap();
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.0.lock().unwrap()
    }
}

fn scheduler(max: u32, clock: Arc<ManualClock>) -> PublicationScheduler {
    PublicationScheduler::with_clock(max, DelayWindows::default(), clock)
}

fn push_recorded(s: &PublicationScheduler, channel: Channel, id: &str, log: &Arc<Mutex<Vec<String>>>) {
    let log = log.clone();
    let tag = id.to_string();
    s.enqueue(channel, id, move || async move {
        log.lock().unwrap().push(tag);
        Ok(())
    });
}

#[tokio::test(start_paused = true)]
async fn daily_cap_executes_n_and_skips_the_rest_in_order() {
    let n = 4;
    let s = scheduler(n, ManualClock::new(2026, 3, 1));
    let log = Arc::new(Mutex::new(Vec::new()));
    let ids: Vec<String> = (0..n + 3).map(|i| format!("item-{i}")).collect();
    for id in &ids {
        push_recorded(&s, Channel::Telegram, id, &log);
    }

    let report = s.drain().await;

    assert_eq!(report.executed.len(), n as usize);
    assert_eq!(*log.lock().unwrap(), ids[..n as usize].to_vec());
    let skipped: Vec<&str> = report.skipped.iter().map(|i| i.candidate_id.as_str()).collect();
    assert_eq!(skipped, vec!["item-4", "item-5", "item-6"]);

    let stats = s.stats();
    assert_eq!(stats.daily_count, n);
    assert_eq!(stats.pending_length, 0);
    assert!(!stats.is_draining);
}

#[tokio::test(start_paused = true)]
async fn day_rollover_resets_the_counter_on_next_drain() {
    let clock = ManualClock::new(2026, 3, 1);
    let s = scheduler(2, clock.clone());
    let log = Arc::new(Mutex::new(Vec::new()));

    for cycle in 0..3 {
        push_recorded(&s, Channel::Telegram, &format!("d1-{cycle}"), &log);
        s.drain().await;
    }
    assert_eq!(s.stats().daily_count, 2);

    push_recorded(&s, Channel::Telegram, "d1-late", &log);
    let same_day = s.drain().await;
    assert_eq!(same_day.skipped.len(), 1);

    clock.advance_day();
    // Counter is only reset by a drain, not by the clock moving.
    assert_eq!(s.stats().daily_count, 2);

    push_recorded(&s, Channel::Telegram, "d2-0", &log);
    let next_day = s.drain().await;
    assert_eq!(next_day.executed.len(), 1);
    assert_eq!(s.stats().daily_count, 1);
}

#[tokio::test(start_paused = true)]
async fn drain_is_fifo_across_channels_and_survives_failures() {
    let s = scheduler(15, ManualClock::new(2026, 3, 1));
    let log = Arc::new(Mutex::new(Vec::new()));

    push_recorded(&s, Channel::Telegram, "tg", &log);
    s.enqueue(Channel::X, "x-broken", || async { Err(anyhow!("403 forbidden")) });
    push_recorded(&s, Channel::LinkedIn, "li", &log);
    push_recorded(&s, Channel::Other("mastodon".into()), "other", &log);

    let report = s.drain().await;

    assert_eq!(*log.lock().unwrap(), vec!["tg", "li", "other"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].channel, Channel::X);
    assert_eq!(s.stats().daily_count, 3);
}

#[tokio::test(start_paused = true)]
async fn drain_waits_out_the_item_delay() {
    let s = scheduler(15, ManualClock::new(2026, 3, 1));
    s.enqueue(Channel::LinkedIn, "li", || async { Ok(()) });
    let delay = s.pending()[0].1;

    let t0 = tokio::time::Instant::now();
    s.drain().await;
    assert!(t0.elapsed() >= delay);
}

#[test]
fn bounded_burst_delays_stay_in_window() {
    let windows = DelayWindows {
        bounded_burst: DelayWindow::new(30_000, 90_000),
        ..DelayWindows::default()
    };
    let policy = DelayPolicy::new(windows);
    let mut rng = rand::rng();
    for _ in 0..1000 {
        let ms = policy.sample(&Channel::X, &mut rng).as_millis();
        assert!((30_000..=90_000).contains(&ms), "delay {ms}ms out of window");
    }
}

#[test]
fn enqueue_records_channel_delays() {
    let s = PublicationScheduler::new(15, DelayWindows::default());
    s.enqueue(Channel::Telegram, "a", || async { Ok(()) });
    s.enqueue(Channel::X, "a", || async { Ok(()) });

    let pending = s.pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].0, Channel::Telegram);
    assert!(pending[0].1.is_zero());
    assert!(pending[1].1.as_millis() >= 30_000);
    assert_eq!(s.stats().pending_length, 2);
}
