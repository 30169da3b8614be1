//! Friday delivery scheduling.
//!
//! The business delivers on Fridays only. An order placed before the weekly
//! cutoff targets the coming Friday; after it, the Friday after that.

use chrono::{
    DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc,
    Weekday,
};

use crate::order::OrderError;

/// Latest local times at which an order may still target the imminent Friday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffPolicy {
    /// From this time on Thursday the imminent Friday is closed.
    pub thursday: NaiveTime,

    /// From this time on Friday the same-day delivery is closed.
    pub friday: NaiveTime,
}

impl CutoffPolicy {
    pub fn new(thursday: NaiveTime, friday: NaiveTime) -> Self {
        Self { thursday, friday }
    }

    /// Parses an `HH:MM` cutoff time.
    pub fn parse_time(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(raw.trim(), "%H:%M")
    }
}

impl Default for CutoffPolicy {
    /// Thursday 18:00 and Friday 12:00.
    fn default() -> Self {
        Self {
            thursday: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            friday: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Computes and validates delivery dates.
///
/// Instants are converted to business-local time with a fixed UTC offset
/// before the cutoff rules are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryScheduler {
    policy: CutoffPolicy,
    utc_offset: FixedOffset,
}

impl Default for DeliveryScheduler {
    fn default() -> Self {
        Self::new(CutoffPolicy::default(), Utc.fix())
    }
}

impl DeliveryScheduler {
    pub fn new(policy: CutoffPolicy, utc_offset: FixedOffset) -> Self {
        Self { policy, utc_offset }
    }

    pub fn policy(&self) -> CutoffPolicy {
        self.policy
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Converts an instant to business-local wall-clock time.
    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.utc_offset).naive_local()
    }

    /// Returns the first Friday an order placed at local time `now` can target.
    pub fn next_available_date(&self, now: NaiveDateTime) -> NaiveDate {
        let today = now.date();
        let time = now.time();

        let days_ahead = match today.weekday() {
            Weekday::Thu if time >= self.policy.thursday => 8,
            Weekday::Thu => 1,
            Weekday::Fri if time >= self.policy.friday => 7,
            Weekday::Fri => 0,
            weekday => (5 + 7 - weekday.num_days_from_sunday() as u64) % 7,
        };

        today
            .checked_add_days(Days::new(days_ahead))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Same as [`next_available_date`](Self::next_available_date) for a UTC instant.
    pub fn next_available_date_at(&self, now: DateTime<Utc>) -> NaiveDate {
        self.next_available_date(self.local_time(now))
    }

    /// True iff `date` is a Friday. Cutoff does not apply.
    pub fn is_valid_delivery_date(&self, date: NaiveDate) -> bool {
        date.weekday() == Weekday::Fri
    }

    /// Rejects anything but a Friday.
    pub fn validate(&self, date: NaiveDate) -> Result<NaiveDate, OrderError> {
        if self.is_valid_delivery_date(date) {
            Ok(date)
        } else {
            Err(OrderError::NotAFriday {
                date,
                weekday: date.weekday(),
            })
        }
    }

    /// The next `count` selectable Fridays, starting at the next available one.
    pub fn available_dates(&self, now: DateTime<Utc>, count: usize) -> AvailableDates {
        AvailableDates {
            next: Some(self.next_available_date_at(now)),
            remaining: count,
        }
    }
}

/// Finite sequence of Fridays, one week apart.
///
/// Cloning yields an independent iterator that restarts from the same point.
#[derive(Debug, Clone)]
pub struct AvailableDates {
    next: Option<NaiveDate>,
    remaining: usize,
}

impl Iterator for AvailableDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = current.checked_add_days(Days::new(7));
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(_) => (0, Some(self.remaining)),
            None => (0, Some(0)),
        }
    }
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
