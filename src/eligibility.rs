//! Eligibility oracle.
//!
//! Answers the pure question "may staff *s* work shift kind *t* on date
//! *d*": role eligibility per shift kind, the minor Sunday ban, the
//! intern weekend ban, per-staff blocked night weekdays, and the folded
//! absence set (vacations plus an in-range birthday).
//!
//! Absences are folded once, before the decision variables are created;
//! forbidden combinations never enter the model at all.

use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{Role, ShiftKind, Staff};

/// Caller-provided unavailability: staff identifier to blocked dates.
pub type VacationMap = BTreeMap<String, BTreeSet<NaiveDate>>;

/// Role and weekday eligibility, independent of absences.
///
/// | Kind | Eligible |
/// |------|----------|
/// | `Sa_10-22`, `So_8-20`, `So_10-22` | TFA only |
/// | `Sa_10-19` | apprentices only |
/// | `So_8-20:30` | adult apprentices only |
/// | `Sa_10-21` | TFA, or apprentice with reception capability |
/// | nights | anyone night-capable, start weekday not blocked |
pub fn role_permits(staff: &Staff, kind: ShiftKind, date: NaiveDate) -> bool {
    if !staff.adult && kind.is_sunday_day() {
        return false;
    }
    if staff.role == Role::Intern && kind.is_weekend_day() {
        return false;
    }
    if kind.is_night() {
        if !staff.night_possible {
            return false;
        }
        let ordinal = date.weekday().number_from_monday() as u8;
        if staff.blocked_start_weekdays.contains(&ordinal) {
            return false;
        }
    }
    match kind {
        ShiftKind::Sat10To19 => staff.role == Role::Azubi,
        ShiftKind::Sat10To21 => {
            if staff.role == Role::Azubi {
                staff.reception
            } else {
                staff.role == Role::Tfa
            }
        }
        ShiftKind::Sat10To22 | ShiftKind::Sun8To20 | ShiftKind::Sun10To22 => {
            staff.role == Role::Tfa
        }
        ShiftKind::Sun8To2030 => staff.role == Role::Azubi && staff.adult,
        _ => true,
    }
}

/// The full oracle for one planning period: role rules plus per-staff
/// absence sets with pre-computed availability counts.
#[derive(Debug, Clone)]
pub struct Eligibility {
    absences: HashMap<String, BTreeSet<NaiveDate>>,
    available_days: HashMap<String, u32>,
    total_days: u32,
}

impl Eligibility {
    /// Folds vacations and in-range birthdays into per-staff absence
    /// sets for the period `[start, end]`.
    pub fn build(
        staff: &[Staff],
        start: NaiveDate,
        end: NaiveDate,
        vacations: &VacationMap,
    ) -> Self {
        let total_days = (end - start).num_days().max(0) as u32 + 1;
        let mut absences: HashMap<String, BTreeSet<NaiveDate>> = HashMap::new();
        let mut available_days = HashMap::new();

        for person in staff {
            let mut blocked: BTreeSet<NaiveDate> = vacations
                .get(&person.identifier)
                .map(|dates| {
                    dates
                        .iter()
                        .copied()
                        .filter(|d| *d >= start && *d <= end)
                        .collect()
                })
                .unwrap_or_default();

            for year in [start.year(), end.year()] {
                if let Some(birthday) = person.birthday_in(year) {
                    if birthday >= start && birthday <= end {
                        blocked.insert(birthday);
                    }
                }
            }

            available_days.insert(
                person.identifier.clone(),
                total_days - blocked.len() as u32,
            );
            absences.insert(person.identifier.clone(), blocked);
        }

        Self {
            absences,
            available_days,
            total_days,
        }
    }

    /// Whether the staff member may work the given kind on the given
    /// date: role rules and the absence set, conjunctively.
    pub fn may_work(&self, staff: &Staff, kind: ShiftKind, date: NaiveDate) -> bool {
        !self.is_absent(&staff.identifier, date) && role_permits(staff, kind, date)
    }

    /// Whether the date is in the staff member's absence set.
    pub fn is_absent(&self, staff_id: &str, date: NaiveDate) -> bool {
        self.absences
            .get(staff_id)
            .is_some_and(|dates| dates.contains(&date))
    }

    /// Non-absent days in the period for this staff member.
    pub fn available_days(&self, staff_id: &str) -> u32 {
        self.available_days
            .get(staff_id)
            .copied()
            .unwrap_or(self.total_days)
    }

    /// Length of the period in days.
    pub fn total_days(&self) -> u32 {
        self.total_days
    }
}
