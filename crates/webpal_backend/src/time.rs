use chrono::{Datelike, Local, Timelike, Utc};

use webpal_base::pal::HostHandle;

/// Milliseconds between 0001-01-01 and the Unix epoch.
pub const UNIX_EPOCH_MS: u64 = 62_135_596_800_000;

/// Broken-down local calendar time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub year: i32,
    /// 1-based.
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

/// Current UTC time as milliseconds since 0001-01-01.
pub fn current_utc_ms() -> u64 {
    let unix_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    unix_ms + UNIX_EPOCH_MS
}

pub fn current_local() -> DateTime {
    let now = Local::now();
    DateTime {
        year: now.year(),
        month: now.month(),
        day: now.day(),
        hour: now.hour(),
        minute: now.minute(),
        second: now.second(),
    }
}

/// Microsecond timestamps from the host's monotonic clock.
pub struct Stopwatch;

impl Stopwatch {
    /// The host clock is a millisecond float; fractions below a microsecond are dropped.
    pub fn measure(host: &HostHandle) -> u64 {
        (host.now_ms() * 1000.0) as u64
    }

    /// Microseconds from `begin` to `end`, or zero if the clock appears to have gone back.
    pub fn elapsed_micros(begin: u64, end: u64) -> u64 {
        end.saturating_sub(begin)
    }
}
