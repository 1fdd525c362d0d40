//! Injectable clock and business-timezone helpers
//!
//! Storage holds `i64` Unix millis; share tokens use whole Unix seconds.
//! Conversion to the business timezone happens only where a calendar date
//! or period prefix is needed.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Injectable time source so token expiry, document dates and period
/// prefixes are deterministic in tests.
pub trait Clock: Send + Sync {
    /// Current Unix timestamp in milliseconds.
    fn now_millis(&self) -> i64;

    /// Current Unix timestamp in whole seconds.
    fn now_secs(&self) -> i64 {
        self.now_millis() / 1000
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        shared::util::now_millis()
    }
}

/// Settable clock for deterministic tests.
#[derive(Debug, Default)]
pub struct FixedClock {
    millis: std::sync::atomic::AtomicI64,
}

impl FixedClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: std::sync::atomic::AtomicI64::new(millis),
        }
    }

    /// Jump to an absolute instant.
    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, std::sync::atomic::Ordering::SeqCst);
    }

    /// Move forward by a delta.
    pub fn advance_secs(&self, secs: i64) {
        self.millis
            .fetch_add(secs * 1000, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Business-timezone calendar date for a Unix-millis instant.
pub fn local_date(millis: i64, tz: Tz) -> NaiveDate {
    utc_datetime(millis).with_timezone(&tz).date_naive()
}

/// `YYMM` period prefix used by quote/invoice numbers.
pub fn period_yymm(millis: i64, tz: Tz) -> String {
    utc_datetime(millis).with_timezone(&tz).format("%y%m").to_string()
}

/// `YYMMDD` date prefix used by booking references.
pub fn period_yymmdd(millis: i64, tz: Tz) -> String {
    utc_datetime(millis).with_timezone(&tz).format("%y%m%d").to_string()
}

/// Unix seconds at local midnight of a business-timezone date.
///
/// DST gap fallback: if local midnight does not exist, fall back to UTC.
pub fn date_start_secs(date: NaiveDate, tz: Tz) -> i64 {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| naive.and_utc().timestamp())
}

fn utc_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
}
