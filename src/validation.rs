//! Input validation for roster problems.
//!
//! Checks structural integrity of the staff list and the vacation map
//! before any model is built. Detects:
//! - Duplicate staff identifiers
//! - Contracted hours outside 1..=40
//! - Zero minimum-consecutive-nights overrides
//! - Birthdays and weekday ordinals that cannot exist
//! - Vacation entries referencing unknown staff

use chrono::NaiveDate;
use std::collections::HashSet;
use thiserror::Error;

use crate::eligibility::VacationMap;
use crate::models::Staff;

/// Validation result: all detected problems, not just the first.
pub type InputResult = Result<(), Vec<InputError>>;

/// A structural problem in the solve inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("duplicate staff identifier '{0}'")]
    DuplicateIdentifier(String),
    #[error("staff '{staff}' has contracted hours {hours}, expected 1..=40")]
    HoursOutOfRange { staff: String, hours: u32 },
    #[error("staff '{staff}' overrides minimum consecutive nights to 0")]
    MinConsecutiveZero { staff: String },
    #[error("staff '{staff}' has impossible birthday {month:02}-{day:02}")]
    InvalidBirthday { staff: String, month: u32, day: u32 },
    #[error("staff '{staff}' blocks weekday ordinal {ordinal}, expected 1..=7")]
    InvalidWeekdayOrdinal { staff: String, ordinal: u8 },
    #[error("vacation entry references unknown staff '{0}'")]
    UnknownVacationStaff(String),
    #[error("staff roster is empty")]
    EmptyRoster,
}

/// Validates the solve inputs.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with every detected issue.
pub fn validate_input(staff: &[Staff], vacations: &VacationMap) -> InputResult {
    let mut errors = Vec::new();

    if staff.is_empty() {
        errors.push(InputError::EmptyRoster);
    }

    let mut seen = HashSet::new();
    for person in staff {
        if !seen.insert(person.identifier.as_str()) {
            errors.push(InputError::DuplicateIdentifier(person.identifier.clone()));
        }

        if person.hours == 0 || person.hours > 40 {
            errors.push(InputError::HoursOutOfRange {
                staff: person.identifier.clone(),
                hours: person.hours,
            });
        }

        if person.min_consecutive_override() == Some(0) {
            errors.push(InputError::MinConsecutiveZero {
                staff: person.identifier.clone(),
            });
        }

        if let Some((month, day)) = person.birthday {
            // Validity probe in a leap year accepts Feb 29.
            if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
                errors.push(InputError::InvalidBirthday {
                    staff: person.identifier.clone(),
                    month,
                    day,
                });
            }
        }

        for &ordinal in &person.blocked_start_weekdays {
            if !(1..=7).contains(&ordinal) {
                errors.push(InputError::InvalidWeekdayOrdinal {
                    staff: person.identifier.clone(),
                    ordinal,
                });
            }
        }
    }

    for staff_id in vacations.keys() {
        if !seen.contains(staff_id.as_str()) {
            errors.push(InputError::UnknownVacationStaff(staff_id.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample_staff() -> Vec<Staff> {
        vec![
            Staff::new("aa", "Anna Arnold"),
            Staff::new("bb", "Bea Brandt").with_hours(20),
        ]
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_input(&sample_staff(), &VacationMap::new()).is_ok());
    }

    #[test]
    fn test_empty_roster() {
        let errors = validate_input(&[], &VacationMap::new()).unwrap_err();
        assert!(errors.contains(&InputError::EmptyRoster));
    }

    #[test]
    fn test_duplicate_identifier() {
        let staff = vec![Staff::new("aa", "Anna"), Staff::new("aa", "Arne")];
        let errors = validate_input(&staff, &VacationMap::new()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, InputError::DuplicateIdentifier(id) if id == "aa")));
    }

    #[test]
    fn test_hours_out_of_range() {
        let staff = vec![
            Staff::new("z", "Zero").with_hours(0),
            Staff::new("h", "Heavy").with_hours(41),
        ];
        let errors = validate_input(&staff, &VacationMap::new()).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, InputError::HoursOutOfRange { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_min_consecutive_zero() {
        let staff = vec![Staff::new("m", "M").with_min_consecutive_nights(0)];
        let errors = validate_input(&staff, &VacationMap::new()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, InputError::MinConsecutiveZero { .. })));
    }

    #[test]
    fn test_invalid_birthday() {
        let staff = vec![Staff::new("b", "B").with_birthday(13, 1)];
        let errors = validate_input(&staff, &VacationMap::new()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, InputError::InvalidBirthday { .. })));

        // Feb 29 is a real birthday.
        let leap = vec![Staff::new("l", "L").with_birthday(2, 29)];
        assert!(validate_input(&leap, &VacationMap::new()).is_ok());
    }

    #[test]
    fn test_invalid_weekday_ordinal() {
        let staff = vec![Staff::new("w", "W").with_blocked_start_weekdays([0, 8])];
        let errors = validate_input(&staff, &VacationMap::new()).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, InputError::InvalidWeekdayOrdinal { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_unknown_vacation_staff() {
        let mut vacations = VacationMap::new();
        vacations.insert("ghost".into(), BTreeSet::new());
        let errors = validate_input(&sample_staff(), &vacations).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, InputError::UnknownVacationStaff(id) if id == "ghost")));
    }

    #[test]
    fn test_multiple_errors_reported() {
        let staff = vec![
            Staff::new("x", "X").with_hours(0),
            Staff::new("x", "X2").with_birthday(2, 30),
        ];
        let errors = validate_input(&staff, &VacationMap::new()).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
