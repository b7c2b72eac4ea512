//! # Store-Local Time
//!
//! Date windows are expressed by operators in store-local dates; every
//! timestamp in the ledger is compared in UTC.
//!
//! ## Window Conversion
//! ```text
//! Operator asks for 2026-03-10 .. 2026-03-11  (store offset UTC-06)
//!      │
//!      ▼
//! [2026-03-10T06:00:00Z, 2026-03-12T06:00:00Z)   ← half-open, UTC
//! ```
//!
//! ## Mixed Timestamp Forms
//! Older rows carry naive local timestamps (`2026-03-10 18:30:00`), newer
//! rows carry offset-aware RFC 3339. [`parse_timestamp`] accepts both and
//! always returns UTC.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, SecondsFormat,
    TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};

/// Default store offset: UTC−06 (central Mexico).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = -360;

/// Largest offset accepted (UTC±14:00).
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

// =============================================================================
// Store Offset
// =============================================================================

/// Fixed offset of the store's wall clock, in minutes east of UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOffset(i32);

impl StoreOffset {
    /// Creates an offset, rejecting values outside ±14h.
    pub fn from_minutes(minutes: i32) -> CoreResult<Self> {
        if minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ValidationError::OutOfRange {
                field: "utc_offset_minutes".to_string(),
                min: -(MAX_OFFSET_MINUTES as i64),
                max: MAX_OFFSET_MINUTES as i64,
            }
            .into());
        }
        Ok(StoreOffset(minutes))
    }

    #[inline]
    pub const fn minutes(&self) -> i32 {
        self.0
    }

    /// The offset as a chrono `FixedOffset`.
    pub fn fixed(&self) -> FixedOffset {
        FixedOffset::east_opt(self.0 * 60).unwrap_or_else(|| Utc.fix())
    }

    /// UTC instant of local midnight at the start of `date`.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.local_to_utc(date.and_time(NaiveTime::MIN))
    }

    /// Interprets a naive local wall-clock value.
    pub fn local_to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(local - Duration::minutes(self.0 as i64)))
    }

    /// Store-local calendar date of an instant.
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        (ts.naive_utc() + Duration::minutes(self.0 as i64)).date()
    }
}

impl Default for StoreOffset {
    fn default() -> Self {
        StoreOffset(DEFAULT_UTC_OFFSET_MINUTES)
    }
}

// =============================================================================
// Date Window
// =============================================================================

/// Inclusive local date range, resolved to a half-open UTC interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    from: NaiveDate,
    to: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateWindow {
    /// Builds the window `[from 00:00 local, to+1 00:00 local)`.
    ///
    /// ## Errors
    /// `CoreError::InvalidWindow` when `from > to`.
    pub fn new(from: NaiveDate, to: NaiveDate, offset: StoreOffset) -> CoreResult<Self> {
        if from > to {
            return Err(CoreError::InvalidWindow { from, to });
        }
        Ok(DateWindow {
            from,
            to,
            start: offset.start_of_day(from),
            end: offset.start_of_day(to + Duration::days(1)),
        })
    }

    /// Window covering exactly one local day.
    pub fn single_day(date: NaiveDate, offset: StoreOffset) -> Self {
        DateWindow {
            from: date,
            to: date,
            start: offset.start_of_day(date),
            end: offset.start_of_day(date + Duration::days(1)),
        }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Half-open membership test.
    #[inline]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Every local date in the window, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let to = self.to;
        self.from.iter_days().take_while(move |d| *d <= to)
    }

    /// Padded `YYYY-MM-DD` bounds for a coarse SQL prefilter on the date
    /// prefix of stored timestamps.
    ///
    /// Stored values may be local or UTC; one day of padding on each side
    /// covers any offset, the exact test runs after [`parse_timestamp`].
    pub fn coarse_bounds(&self) -> (String, String) {
        let lo = self.from - Duration::days(1);
        let hi = self.to + Duration::days(1);
        (lo.format("%Y-%m-%d").to_string(), hi.format("%Y-%m-%d").to_string())
    }
}

// =============================================================================
// Timestamp Normalization
// =============================================================================

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses a stored timestamp into UTC.
///
/// ## Accepted Forms
/// - RFC 3339 / offset-aware: `2026-03-10T18:30:00-06:00`, `...Z`
/// - Naive local: `2026-03-10 18:30:00[.ffffff]` (store-local wall clock)
/// - Bare date: `2026-03-10` (local midnight)
pub fn parse_timestamp(raw: &str, offset: StoreOffset) -> CoreResult<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let zulu_fixed;
    let candidate = match raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        Some(stripped) => {
            zulu_fixed = format!("{}+00:00", stripped);
            zulu_fixed.as_str()
        }
        None => raw,
    };

    for fmt in AWARE_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(candidate, fmt) {
            return Ok(ts.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(offset.local_to_utc(naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(offset.start_of_day(date));
    }

    Err(CoreError::InvalidTimestamp(raw.to_string()))
}

/// Canonical storage form: RFC 3339, microseconds, `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// =============================================================================
// Clock
// =============================================================================

/// Source of "now". The database layer provides the wall clock; tests pin it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_window_is_half_open_in_local_time() {
        let offset = StoreOffset::default();
        let window = DateWindow::new(date("2026-03-10"), date("2026-03-11"), offset).unwrap();

        assert_eq!(format_timestamp(window.start()), "2026-03-10T06:00:00.000000Z");
        assert_eq!(format_timestamp(window.end()), "2026-03-12T06:00:00.000000Z");
        assert!(window.contains(window.start()));
        assert!(!window.contains(window.end()));
        assert_eq!(window.days().count(), 2);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let err = DateWindow::new(date("2026-03-11"), date("2026-03-10"), StoreOffset::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidWindow { .. }));
    }

    #[test]
    fn test_naive_and_aware_agree() {
        let offset = StoreOffset::default();
        let naive = parse_timestamp("2026-03-10 18:30:00", offset).unwrap();
        let aware = parse_timestamp("2026-03-11T00:30:00Z", offset).unwrap();
        let aware_local = parse_timestamp("2026-03-10T18:30:00-06:00", offset).unwrap();
        let spaced = parse_timestamp("2026-03-11 00:30:00.250+00:00", offset).unwrap();

        assert_eq!(naive, aware);
        assert_eq!(naive, aware_local);
        assert_eq!(spaced.timestamp(), aware.timestamp());
    }

    #[test]
    fn test_late_evening_local_sale_belongs_to_local_day() {
        let offset = StoreOffset::default();
        // 23:30 local on the 10th is already the 11th in UTC
        let ts = parse_timestamp("2026-03-11T05:30:00Z", offset).unwrap();
        assert_eq!(offset.local_date(ts), date("2026-03-10"));
        assert!(DateWindow::single_day(date("2026-03-10"), offset).contains(ts));
        assert!(!DateWindow::single_day(date("2026-03-11"), offset).contains(ts));
    }

    #[test]
    fn test_garbage_timestamp_rejected() {
        assert!(matches!(
            parse_timestamp("ayer", StoreOffset::default()),
            Err(CoreError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_offset_range() {
        assert!(StoreOffset::from_minutes(-360).is_ok());
        assert!(StoreOffset::from_minutes(15 * 60).is_err());
    }

    #[test]
    fn test_coarse_bounds_are_padded() {
        let window =
            DateWindow::new(date("2026-03-10"), date("2026-03-10"), StoreOffset::default()).unwrap();
        assert_eq!(
            window.coarse_bounds(),
            ("2026-03-09".to_string(), "2026-03-11".to_string())
        );
    }
}
