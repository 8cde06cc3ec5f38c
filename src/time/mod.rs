//! Wall-clock helpers for the time-source arbiter.
//!
//! The modem learns the time either from a GPS fix or from the cellular
//! network. Both arrive as broken-down calendar fields, are converted to a
//! UNIX timestamp here and then rendered in the configured POSIX zone.

use chrono::{Datelike, NaiveDate, Timelike};
use core::fmt::Write as _;
use heapless::String;
use serde::Serialize;

pub mod tz;

pub use tz::{TzError, TzRule};

/// Timestamps before this year are treated as "clock not set".
pub const MIN_VALID_YEAR: u16 = 2020;

/// Date the modem reports for network time before it has received any.
pub const NETWORK_TIME_SENTINEL: &str = "80/01/06";

/// Rendered local time, e.g. `2024-04-02 13:39:57 CEST`.
pub type LocalTime = String<40>;

/// Progress of wall-clock synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeSyncState {
    /// No attempt made yet.
    Off,
    /// Attempted, not yet confirmed.
    Syncing,
    /// System time set and a localized time could be rendered.
    Synced,
}

/// Broken-down calendar time with a four digit year and 1-based month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CalendarTime {
    /// Year, e.g. 2024.
    pub year: u16,
    /// Month, 1 to 12.
    pub month: u8,
    /// Day of month, 1 to 31.
    pub day: u8,
    /// Hour, 0 to 23.
    pub hour: u8,
    /// Minute, 0 to 59.
    pub minute: u8,
    /// Second, 0 to 59.
    pub second: u8,
}

impl CalendarTime {
    /// Interpret the fields as UTC. `None` if they do not form a valid date.
    pub fn to_unix(&self) -> Option<i64> {
        let date = NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )?;
        let datetime = date.and_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )?;
        Some(datetime.and_utc().timestamp())
    }

    /// Calendar fields of a UNIX timestamp.
    pub fn from_unix(unix: i64) -> Option<Self> {
        let t = chrono::DateTime::from_timestamp(unix, 0)?;
        Some(Self {
            year: u16::try_from(t.year()).ok()?,
            month: t.month() as u8,
            day: t.day() as u8,
            hour: t.hour() as u8,
            minute: t.minute() as u8,
            second: t.second() as u8,
        })
    }
}

/// Time as reported by the cellular network (`+CCLK`).
///
/// The calendar fields are local to the network's zone; `tz_hours` is that
/// zone's offset east of UTC, in hours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkTime {
    /// Local calendar time.
    pub time: CalendarTime,
    /// Zone offset east of UTC, hours.
    pub tz_hours: f32,
}

impl NetworkTime {
    /// The UTC instant this reading names.
    pub fn to_unix(&self) -> Option<i64> {
        let offset = (self.tz_hours * 3600.0) as i64;
        Some(self.time.to_unix()? - offset)
    }
}

/// A wall-clock reading anchored to the platform's monotonic counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    unix: i64,
    at_ms: u64,
}

impl WallClock {
    /// Record that it was `unix` when the monotonic counter read `at_ms`.
    pub fn new(unix: i64, at_ms: u64) -> Self {
        Self { unix, at_ms }
    }

    /// Current UNIX time given the current monotonic counter.
    pub fn now(&self, now_ms: u64) -> i64 {
        self.unix + (now_ms.saturating_sub(self.at_ms) / 1000) as i64
    }
}

/// Render `unix` in `rule`'s zone.
///
/// Returns an empty string when the instant is before [`MIN_VALID_YEAR`], the
/// same way an unset clock renders.
pub fn localize(unix: i64, rule: &TzRule) -> LocalTime {
    let mut out = LocalTime::new();
    let (offset, abbrev) = rule.offset_at(unix);
    let Some(t) = CalendarTime::from_unix(unix + i64::from(offset)) else {
        return out;
    };
    if t.year < MIN_VALID_YEAR {
        return out;
    }
    if write!(
        out,
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} {}",
        t.year, t.month, t.day, t.hour, t.minute, t.second, abbrev
    )
    .is_err()
    {
        out.clear();
    }
    out
}
