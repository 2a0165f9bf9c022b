// ABOUTME: Timestamp helpers for payloads and row bookkeeping.
// ABOUTME: Provides RFC3339 strings, unix seconds, and a monotonic timer.
use ::time::OffsetDateTime;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Convert a SystemTime to a fixed-width RFC3339 UTC string.
///
/// Always six fractional digits, so lexical order matches time order.
///
/// # Examples
///
/// ```
/// use tl_core::time::to_rfc3339;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let time = UNIX_EPOCH + Duration::from_secs(1_609_459_200);
/// assert_eq!(to_rfc3339(time), "2021-01-01T00:00:00.000000Z");
/// ```
pub fn to_rfc3339(time: SystemTime) -> String {
    let t = OffsetDateTime::from(time);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:06}Z",
        t.year(),
        u8::from(t.month()),
        t.day(),
        t.hour(),
        t.minute(),
        t.second(),
        t.microsecond()
    )
}

/// Current time as RFC3339, used for `updated_at` / `created_at` columns
pub fn now_iso8601() -> String {
    to_rfc3339(SystemTime::now())
}

/// Seconds since the unix epoch, as reported in health payloads
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Monotonic duration measurer for request and health check latency
///
/// # Examples
///
/// ```
/// use tl_core::MonotonicTimer;
/// use std::time::Duration;
///
/// let timer = MonotonicTimer::new();
/// std::thread::sleep(Duration::from_millis(1));
/// assert!(timer.elapsed() >= Duration::from_millis(1));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTimer {
    start: Instant,
}

impl MonotonicTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time in fractional seconds, the unit histograms are kept in
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}
