// src/config/delays.rs
use serde::Deserialize;
use std::time::Duration;

/// Inclusive `[min, max]` window in milliseconds for anti-spam jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DelayWindow {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayWindow {
    /// Builds a window, swapping the bounds if they arrive inverted.
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        if min_ms > max_ms {
            Self {
                min_ms: max_ms,
                max_ms: min_ms,
            }
        } else {
            Self { min_ms, max_ms }
        }
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

/// Per-channel delay bounds. Instant channels have no window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindows {
    pub bounded_burst: DelayWindow,
    pub slow_cadence: DelayWindow,
    pub fallback: DelayWindow,
}

impl Default for DelayWindows {
    fn default() -> Self {
        Self {
            bounded_burst: DelayWindow::new(30_000, 90_000),
            slow_cadence: DelayWindow::new(180_000, 300_000),
            fallback: DelayWindow::new(10_000, 30_000),
        }
    }
}
