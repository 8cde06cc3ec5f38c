//! POSIX `TZ` rule strings such as `CET-1CEST,M3.5.0,M10.5.0/3`.
//!
//! Offsets in the rule are written west-positive (`EST5` is five hours
//! *behind* UTC); [`TzRule`] stores them east-positive, in seconds. A rule with
//! a DST name but no transition dates uses the US defaults
//! (`M3.2.0,M11.1.0`).

use chrono::{Datelike, NaiveDate};
use heapless::String;

/// Longest zone abbreviation kept.
pub const MAX_ABBREV_LEN: usize = 8;

/// Zone abbreviation, e.g. `CEST`.
pub type Abbrev = String<MAX_ABBREV_LEN>;

const DEFAULT_TRANSITION_SECS: i32 = 2 * 3600;

/// Why a rule string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TzError {
    /// Zone name missing, too short, too long or unterminated.
    InvalidName,
    /// Offset missing or out of range.
    InvalidOffset,
    /// Transition date malformed.
    InvalidRule,
    /// Unparsed input after the rule.
    TrailingInput,
}

impl core::fmt::Display for TzError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TzError::InvalidName => write!(f, "invalid zone name"),
            TzError::InvalidOffset => write!(f, "invalid offset"),
            TzError::InvalidRule => write!(f, "invalid transition rule"),
            TzError::TrailingInput => write!(f, "trailing input"),
        }
    }
}

/// Day a DST transition happens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDay {
    /// `Jn`: day 1 to 365, February 29th never counted.
    Julian(u16),
    /// `n`: day 0 to 365, February 29th counted in leap years.
    Ordinal(u16),
    /// `Mm.w.d`: weekday `d` (0 = Sunday) of week `w` (5 = last) of month `m`.
    MonthWeekDay {
        /// Month, 1 to 12.
        month: u8,
        /// Week, 1 to 5.
        week: u8,
        /// Day of week, 0 (Sunday) to 6.
        weekday: u8,
    },
}

/// A DST start or end: a day and a local wall-clock time on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Day of the transition.
    pub day: TransitionDay,
    /// Seconds after local midnight, may be negative or past 24h.
    pub time: i32,
}

/// Daylight saving part of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dst {
    /// Abbreviation while DST is in effect.
    pub abbrev: Abbrev,
    /// Offset east of UTC while DST is in effect, in seconds.
    pub offset: i32,
    /// Switch to DST, in standard local time.
    pub start: Transition,
    /// Switch back, in daylight local time.
    pub end: Transition,
}

/// A parsed POSIX timezone rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TzRule {
    /// Standard time abbreviation.
    pub abbrev: Abbrev,
    /// Standard offset east of UTC, in seconds.
    pub offset: i32,
    /// Daylight saving, if the zone observes it.
    pub dst: Option<Dst>,
}

impl Default for TzRule {
    fn default() -> Self {
        Self::utc()
    }
}

impl TzRule {
    /// Plain UTC, the rule used when nothing valid is configured.
    pub fn utc() -> Self {
        let mut abbrev = Abbrev::new();
        let _ = abbrev.push_str("UTC");
        Self {
            abbrev,
            offset: 0,
            dst: None,
        }
    }

    /// Parse a rule string.
    pub fn parse(rule: &str) -> Result<Self, TzError> {
        let mut cursor = Cursor::new(rule);

        let abbrev = cursor.name()?;
        let offset = -cursor.offset()?;

        let dst = if cursor.is_empty() {
            None
        } else {
            let dst_abbrev = cursor.name()?;
            let dst_offset = match cursor.peek() {
                None | Some(b',') => offset + 3600,
                Some(_) => -cursor.offset()?,
            };
            let (start, end) = if cursor.eat(b',') {
                let start = cursor.transition()?;
                if !cursor.eat(b',') {
                    return Err(TzError::InvalidRule);
                }
                (start, cursor.transition()?)
            } else {
                (
                    Transition {
                        day: TransitionDay::MonthWeekDay {
                            month: 3,
                            week: 2,
                            weekday: 0,
                        },
                        time: DEFAULT_TRANSITION_SECS,
                    },
                    Transition {
                        day: TransitionDay::MonthWeekDay {
                            month: 11,
                            week: 1,
                            weekday: 0,
                        },
                        time: DEFAULT_TRANSITION_SECS,
                    },
                )
            };
            Some(Dst {
                abbrev: dst_abbrev,
                offset: dst_offset,
                start,
                end,
            })
        };

        if !cursor.is_empty() {
            return Err(TzError::TrailingInput);
        }

        Ok(Self {
            abbrev,
            offset,
            dst,
        })
    }

    /// Offset east of UTC and abbreviation in effect at `unix` (UTC seconds).
    pub fn offset_at(&self, unix: i64) -> (i32, &str) {
        let Some(dst) = &self.dst else {
            return (self.offset, self.abbrev.as_str());
        };

        let Some(year) = year_of(unix + i64::from(self.offset)) else {
            return (self.offset, self.abbrev.as_str());
        };

        let start = transition_utc(year, &dst.start, self.offset);
        let end = transition_utc(year, &dst.end, dst.offset);
        let in_dst = match (start, end) {
            (Some(start), Some(end)) if start < end => unix >= start && unix < end,
            // Southern hemisphere: DST spans the new year.
            (Some(start), Some(end)) => !(unix >= end && unix < start),
            _ => false,
        };

        if in_dst {
            (dst.offset, dst.abbrev.as_str())
        } else {
            (self.offset, self.abbrev.as_str())
        }
    }
}

fn year_of(unix: i64) -> Option<i32> {
    chrono::DateTime::from_timestamp(unix, 0).map(|t| t.year())
}

fn transition_utc(year: i32, transition: &Transition, offset: i32) -> Option<i64> {
    let date = match transition.day {
        TransitionDay::Julian(n) => {
            let leap = NaiveDate::from_ymd_opt(year, 2, 29).is_some();
            let ordinal = u32::from(n) + u32::from(leap && n >= 60);
            NaiveDate::from_yo_opt(year, ordinal)?
        }
        TransitionDay::Ordinal(n) => NaiveDate::from_yo_opt(year, u32::from(n) + 1)?,
        TransitionDay::MonthWeekDay {
            month,
            week,
            weekday,
        } => {
            let first = NaiveDate::from_ymd_opt(year, u32::from(month), 1)?;
            let first_weekday = first.weekday().num_days_from_sunday();
            let mut day = 1 + (u32::from(weekday) + 7 - first_weekday) % 7 + (u32::from(week) - 1) * 7;
            while NaiveDate::from_ymd_opt(year, u32::from(month), day).is_none() {
                day -= 7;
            }
            NaiveDate::from_ymd_opt(year, u32::from(month), day)?
        }
    };
    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc().timestamp();
    Some(midnight + i64::from(transition.time) - i64::from(offset))
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            bytes: s.as_bytes(),
            pos: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn name(&mut self) -> Result<Abbrev, TzError> {
        let quoted = self.eat(b'<');
        let start = self.pos;
        while let Some(b) = self.peek() {
            let ok = if quoted {
                b.is_ascii_alphanumeric() || b == b'+' || b == b'-'
            } else {
                b.is_ascii_alphabetic()
            };
            if !ok {
                break;
            }
            self.pos += 1;
        }
        let end = self.pos;
        if quoted && !self.eat(b'>') {
            return Err(TzError::InvalidName);
        }
        if end - start < 3 {
            return Err(TzError::InvalidName);
        }
        let name = core::str::from_utf8(&self.bytes[start..end]).map_err(|_| TzError::InvalidName)?;
        Abbrev::try_from(name).map_err(|_| TzError::InvalidName)
    }

    fn number(&mut self, max_digits: usize) -> Option<u32> {
        let start = self.pos;
        let mut value = 0u32;
        while let Some(b) = self.peek() {
            if !b.is_ascii_digit() || self.pos - start == max_digits {
                break;
            }
            value = value * 10 + u32::from(b - b'0');
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }

    /// `[+-]hh[:mm[:ss]]`, returned as signed seconds.
    fn clock(&mut self, max_hours: u32) -> Option<i32> {
        let negative = if self.eat(b'-') {
            true
        } else {
            self.eat(b'+');
            false
        };
        let hours = self.number(3)?;
        if hours > max_hours {
            return None;
        }
        let mut secs = hours * 3600;
        if self.eat(b':') {
            let minutes = self.number(2).filter(|m| *m < 60)?;
            secs += minutes * 60;
            if self.eat(b':') {
                secs += self.number(2).filter(|s| *s < 60)?;
            }
        }
        let secs = secs as i32;
        Some(if negative { -secs } else { secs })
    }

    fn offset(&mut self) -> Result<i32, TzError> {
        self.clock(24).ok_or(TzError::InvalidOffset)
    }

    fn transition(&mut self) -> Result<Transition, TzError> {
        let day = if self.eat(b'M') {
            let month = self.number(2).filter(|m| (1..=12).contains(m));
            let week = self.eat(b'.').then(|| self.number(1)).flatten().filter(|w| (1..=5).contains(w));
            let weekday = self.eat(b'.').then(|| self.number(1)).flatten().filter(|d| *d <= 6);
            match (month, week, weekday) {
                (Some(month), Some(week), Some(weekday)) => TransitionDay::MonthWeekDay {
                    month: month as u8,
                    week: week as u8,
                    weekday: weekday as u8,
                },
                _ => return Err(TzError::InvalidRule),
            }
        } else if self.eat(b'J') {
            let n = self.number(3).filter(|n| (1..=365).contains(n)).ok_or(TzError::InvalidRule)?;
            TransitionDay::Julian(n as u16)
        } else {
            let n = self.number(3).filter(|n| *n <= 365).ok_or(TzError::InvalidRule)?;
            TransitionDay::Ordinal(n as u16)
        };

        let time = if self.eat(b'/') {
            self.clock(167).ok_or(TzError::InvalidRule)?
        } else {
            DEFAULT_TRANSITION_SECS
        };

        Ok(Transition { day, time })
    }
}
