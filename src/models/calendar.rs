//! Quarter calendar and shift-slot enumeration.
//!
//! A quarter starts on the first day of January, April, July, or October
//! and ends on the last day of its third month. Every date in range
//! emits one night slot; Saturdays and Sundays additionally emit the
//! three daytime slots of their day.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::shift::{ShiftKind, Slot};

/// Rejected quarter start dates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuarterError {
    #[error("quarter must start on Jan 1, Apr 1, Jul 1 or Oct 1, got {0}")]
    NotAQuarterStart(NaiveDate),
}

/// A validated planning quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quarter {
    start: NaiveDate,
}

impl Quarter {
    /// Validates and wraps a quarter start date.
    pub fn starting(start: NaiveDate) -> Result<Self, QuarterError> {
        if start.day() == 1 && matches!(start.month(), 1 | 4 | 7 | 10) {
            Ok(Self { start })
        } else {
            Err(QuarterError::NotAQuarterStart(start))
        }
    }

    /// First day of the quarter.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the quarter (last day of the third month).
    pub fn end(&self) -> NaiveDate {
        let (year, month) = if self.start.month() == 10 {
            (self.start.year() + 1, 1)
        } else {
            (self.start.year(), self.start.month() + 3)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(self.start)
    }

    /// Number of calendar days covered.
    pub fn days(&self) -> u32 {
        (self.end() - self.start).num_days() as u32 + 1
    }

    /// All dates of the quarter in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.days() as usize)
    }

    /// The full slot list the roster must cover.
    pub fn slots(&self) -> Vec<Slot> {
        slots_in_range(self.start, self.end())
    }
}

/// Enumerates the slots to cover between two dates (inclusive).
///
/// The validator uses this on arbitrary schedule ranges; the engine
/// always passes a full quarter.
pub fn slots_in_range(start: NaiveDate, end: NaiveDate) -> Vec<Slot> {
    let mut slots = Vec::new();
    let mut date = start;
    while date <= end {
        match date.weekday() {
            Weekday::Sat => {
                for kind in ShiftKind::SATURDAY {
                    slots.push(Slot::new(date, kind));
                }
            }
            Weekday::Sun => {
                for kind in ShiftKind::SUNDAY {
                    slots.push(Slot::new(date, kind));
                }
            }
            _ => {}
        }
        slots.push(Slot::night_on(date));
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_valid_quarter_starts() {
        for (m, day) in [(1, 1), (4, 1), (7, 1), (10, 1)] {
            assert!(Quarter::starting(d(2026, m, day)).is_ok());
        }
        assert!(Quarter::starting(d(2026, 2, 1)).is_err());
        assert!(Quarter::starting(d(2026, 4, 2)).is_err());
    }

    #[test]
    fn test_quarter_bounds() {
        let q2 = Quarter::starting(d(2026, 4, 1)).unwrap();
        assert_eq!(q2.end(), d(2026, 6, 30));
        assert_eq!(q2.days(), 91);

        let q4 = Quarter::starting(d(2026, 10, 1)).unwrap();
        assert_eq!(q4.end(), d(2026, 12, 31));
        assert_eq!(q4.days(), 92);

        let q1 = Quarter::starting(d(2026, 1, 1)).unwrap();
        assert_eq!(q1.end(), d(2026, 3, 31));
        assert_eq!(q1.days(), 90);
    }

    #[test]
    fn test_quarter_slot_counts() {
        let q = Quarter::starting(d(2026, 4, 1)).unwrap();
        let slots = q.slots();

        let nights = slots.iter().filter(|s| s.is_night()).count();
        assert_eq!(nights, 91);

        let saturdays = q.dates().filter(|d| d.weekday() == Weekday::Sat).count();
        let saturday_slots = slots
            .iter()
            .filter(|s| s.kind.is_saturday_day())
            .count();
        assert_eq!(saturday_slots, saturdays * 3);

        let sunday_slots = slots.iter().filter(|s| s.kind.is_sunday_day()).count();
        let sundays = q.dates().filter(|d| d.weekday() == Weekday::Sun).count();
        assert_eq!(sunday_slots, sundays * 3);
    }

    #[test]
    fn test_night_kind_matches_weekday() {
        let q = Quarter::starting(d(2026, 4, 1)).unwrap();
        for slot in q.slots().iter().filter(|s| s.is_night()) {
            assert_eq!(slot.kind, ShiftKind::night_for(slot.date.weekday()));
        }
    }

    #[test]
    fn test_range_week_has_weekend_slots() {
        // Apr 1 (Wed) through Apr 7 2026 contains one Saturday and one Sunday.
        let slots = slots_in_range(d(2026, 4, 1), d(2026, 4, 7));
        assert_eq!(slots.iter().filter(|s| s.is_night()).count(), 7);
        assert_eq!(
            slots.iter().filter(|s| s.is_weekend_day()).count(),
            6
        );
    }
}
