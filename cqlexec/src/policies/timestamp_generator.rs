use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::{Duration, Instant};
use tracing::warn;

/// Generates client-side timestamps, in microseconds since the unix epoch.
///
/// Timestamps are only attached to requests when the negotiated protocol
/// version supports them (v3 and newer).
pub trait TimestampGenerator: Send + Sync + Debug {
    fn next_timestamp(&self) -> i64;
}

fn now_micros() -> Option<i64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_micros() as i64)
}

/// Reads the system clock. Provides no monotonicity guarantee.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleTimestampGenerator;

impl SimpleTimestampGenerator {
    pub fn new() -> Self {
        SimpleTimestampGenerator
    }
}

impl TimestampGenerator for SimpleTimestampGenerator {
    fn next_timestamp(&self) -> i64 {
        now_micros().unwrap_or_default()
    }
}

#[derive(Debug)]
struct SkewWarnings {
    threshold: Duration,
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl SkewWarnings {
    fn maybe_warn(&self, current: i64, last: i64) {
        if last - current <= self.threshold.as_micros() as i64 {
            return;
        }
        let mut last_warn = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        if last_warn.is_some_and(|at| now.duration_since(at) < self.interval) {
            return;
        }
        *last_warn = Some(now);
        drop(last_warn);
        warn!(
            "Clock skew detected. The current time ({}) was {} microseconds behind \
             the last generated timestamp ({}). The next generated timestamp will be \
             artificially incremented to guarantee monotonicity.",
            current,
            last - current,
            last
        );
    }
}

/// Guarantees strictly increasing timestamps within one instance.
///
/// When the clock does not move forward, the previous timestamp is
/// incremented by one microsecond. If the clock lags behind by more than the
/// warning threshold (1 second by default), a warning is logged, at most once
/// per warning interval (1 second by default).
#[derive(Debug)]
pub struct MonotonicTimestampGenerator {
    last: AtomicI64,
    warnings: Option<SkewWarnings>,
}

impl MonotonicTimestampGenerator {
    pub fn new() -> Self {
        MonotonicTimestampGenerator {
            last: AtomicI64::new(0),
            warnings: Some(SkewWarnings {
                threshold: Duration::from_secs(1),
                interval: Duration::from_secs(1),
                last: Mutex::new(None),
            }),
        }
    }

    pub fn with_warning_times(mut self, threshold: Duration, interval: Duration) -> Self {
        self.warnings = Some(SkewWarnings {
            threshold,
            interval,
            last: Mutex::new(None),
        });
        self
    }

    pub fn without_warnings(mut self) -> Self {
        self.warnings = None;
        self
    }

    fn compute_next(&self, last: i64) -> i64 {
        match now_micros() {
            Some(current) if current > last => return current,
            Some(current) => {
                if let Some(warnings) = &self.warnings {
                    warnings.maybe_warn(current, last);
                }
            }
            None => warn!("Clock skew detected. The current time was behind UNIX epoch."),
        }
        last + 1
    }
}

impl Default for MonotonicTimestampGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TimestampGenerator for MonotonicTimestampGenerator {
    fn next_timestamp(&self) -> i64 {
        loop {
            let last = self.last.load(Ordering::SeqCst);
            let next = self.compute_next(last);
            if self
                .last
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return next;
            }
        }
    }
}
