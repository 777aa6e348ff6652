//! Staff model.
//!
//! A staff member carries the eligibility attributes that drive the
//! roster rules: role, department, contracted hours, night capabilities,
//! and per-person overrides for the consecutive-night bounds.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Staff role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full veterinary assistant.
    #[serde(rename = "TFA")]
    Tfa,
    /// Apprentice.
    Azubi,
    /// Veterinary intern.
    Intern,
}

/// Department assignment.
///
/// Station and op staff are thin on the ground; the roster must not
/// drain either department on the same or consecutive nights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Station,
    Op,
    Other,
}

/// A staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    /// Unique short code.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Minors are barred from Sunday daytime shifts.
    pub adult: bool,
    /// Contracted weekly hours (1..=40).
    pub hours: u32,
    pub role: Role,
    pub department: Department,
    /// Can staff the reception desk (opens `Sa_10-21` to apprentices).
    pub reception: bool,
    /// Can work night shifts at all.
    pub night_possible: bool,
    /// True: must work regular nights solo. False: must be paired.
    pub night_alone: bool,
    /// Upper bound on consecutive nights; `None` is unbounded.
    pub max_consecutive_nights: Option<u32>,
    /// Per-person override of the minimum consecutive nights.
    /// `None` falls back to the role default (1 for apprentices, else 2).
    min_consecutive_override: Option<u32>,
    /// ISO weekday ordinals (1=Mon..7=Sun) on which this person will not
    /// start a night.
    pub blocked_start_weekdays: BTreeSet<u8>,
    /// Birthday as (month, day); the date is blocked within the quarter.
    pub birthday: Option<(u32, u32)>,
}

impl Staff {
    /// Creates a full-time TFA with open night availability.
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            adult: true,
            hours: 40,
            role: Role::Tfa,
            department: Department::Other,
            reception: false,
            night_possible: true,
            night_alone: false,
            max_consecutive_nights: None,
            min_consecutive_override: None,
            blocked_start_weekdays: BTreeSet::new(),
            birthday: None,
        }
    }

    /// Sets the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Sets the department.
    pub fn with_department(mut self, department: Department) -> Self {
        self.department = department;
        self
    }

    /// Sets the adulthood flag.
    pub fn with_adult(mut self, adult: bool) -> Self {
        self.adult = adult;
        self
    }

    /// Sets contracted weekly hours.
    pub fn with_hours(mut self, hours: u32) -> Self {
        self.hours = hours;
        self
    }

    /// Sets the reception capability.
    pub fn with_reception(mut self, reception: bool) -> Self {
        self.reception = reception;
        self
    }

    /// Sets whether nights are possible at all.
    pub fn with_night_possible(mut self, possible: bool) -> Self {
        self.night_possible = possible;
        self
    }

    /// Sets the lone-worker preference for regular nights.
    pub fn with_night_alone(mut self, alone: bool) -> Self {
        self.night_alone = alone;
        self
    }

    /// Caps consecutive nights.
    pub fn with_max_consecutive_nights(mut self, max: u32) -> Self {
        self.max_consecutive_nights = Some(max);
        self
    }

    /// Overrides the minimum consecutive nights for this person.
    pub fn with_min_consecutive_nights(mut self, min: u32) -> Self {
        self.min_consecutive_override = Some(min);
        self
    }

    /// Blocks night starts on the given ISO weekdays (1=Mon..7=Sun).
    pub fn with_blocked_start_weekdays(mut self, weekdays: impl IntoIterator<Item = u8>) -> Self {
        self.blocked_start_weekdays = weekdays.into_iter().collect();
        self
    }

    /// Sets the birthday as (month, day).
    pub fn with_birthday(mut self, month: u32, day: u32) -> Self {
        self.birthday = Some((month, day));
        self
    }

    /// Effective minimum consecutive nights: the per-person override, or
    /// the role default (apprentices may work single nights).
    pub fn min_consecutive_nights(&self) -> u32 {
        self.min_consecutive_override.unwrap_or(match self.role {
            Role::Azubi => 1,
            Role::Tfa | Role::Intern => 2,
        })
    }

    /// The explicit override, if any (used by input validation).
    pub fn min_consecutive_override(&self) -> Option<u32> {
        self.min_consecutive_override
    }

    /// This person's birthday in the given year, `None` if unset or the
    /// date does not exist that year (Feb 29 outside leap years).
    pub fn birthday_in(&self, year: i32) -> Option<NaiveDate> {
        let (month, day) = self.birthday?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// Fractional night workload for fairness accounting. Apprentices
    /// always earn full credit; others earn half when the night is paired.
    pub fn night_weight(&self, paired: bool) -> f64 {
        if self.role == Role::Azubi {
            1.0
        } else if paired {
            0.5
        } else {
            1.0
        }
    }

    /// Number of weekday ordinals on which this person may start a night.
    pub fn permitted_night_weekdays(&self) -> u32 {
        7 - self.blocked_start_weekdays.len() as u32
    }
}
