//! Schedule rule validator.
//!
//! Re-checks every roster rule against a finished schedule,
//! independently of the CP encoding. The validator never short-circuits:
//! all hard violations are reported, and soft rules are folded into a
//! penalty breakdown. Divergence between this module and the CP model
//! is treated as an engine defect, so the rule set here is the reference
//! formulation.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::eligibility::{Eligibility, VacationMap};
use crate::models::{slots_in_range, Department, Role, Schedule, ShiftKind, Staff};

/// Hard-rule tags, serialized as stable snake_case identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTag {
    /// A slot is under- or over-covered.
    Coverage,
    /// An assignee fails the eligibility oracle (role, absence, weekday).
    Eligibility,
    /// One person holds two slots on the same date.
    DoubleBooking,
    /// An apprentice works a night with no non-apprentice present.
    AzubiNeedsPairing,
    /// Two apprentices share a night.
    MultipleAzubis,
    /// A must-pair person works a regular night alone.
    PairingRequired,
    /// A must-work-alone person shares a regular night.
    SoloRequired,
    /// A vet-on-site night deviates from one non-apprentice plus at most
    /// one apprentice.
    VetNightCapacity,
    /// A night block is shorter than the person's minimum.
    MinConsecViolation,
    /// Two shift blocks start within 14 days of each other.
    BlockSpacingViolation,
    /// A daytime shift follows a night too closely.
    RestAfterNight,
    /// A weekend daytime shift is calendar-adjacent to another shift.
    WeekendIsolation,
    /// Two people of the same restricted department on the same or
    /// adjacent nights.
    DepartmentClash,
    /// A paired flag contradicts the night's actual occupancy.
    PairFlag,
    /// A weekend-eligible person works no weekend slot all quarter.
    MissingWeekendParticipation,
    /// A night-eligible person works no night all quarter.
    MissingNightParticipation,
}

/// One hard-rule violation with the staff and dates involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: RuleTag,
    pub staff: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub message: String,
}

impl Violation {
    fn new(
        rule: RuleTag,
        staff: impl IntoIterator<Item = String>,
        dates: impl IntoIterator<Item = NaiveDate>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            staff: staff.into_iter().collect(),
            dates: dates.into_iter().collect(),
            message: message.into(),
        }
    }
}

/// Soft-penalty totals by category. Lower is better.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltyBreakdown {
    /// Squared deviation of per-person normalized load from the group mean.
    pub fairness_deviation: f64,
    /// 10x the standard deviation of normalized loads, summed over groups.
    pub fairness_spread: f64,
    /// 100 per excess night over the person's maximum block length.
    pub max_consecutive: f64,
}

impl PenaltyBreakdown {
    /// Total penalty across all categories.
    pub fn total(&self) -> f64 {
        self.fairness_deviation + self.fairness_spread + self.max_consecutive
    }
}

/// Validator switches, mirroring the solve options that affect rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleOptions {
    /// Check the minimum-participation rules.
    pub enforce_min_participation: bool,
    /// Drop staff whose permitted night weekdays cannot host their
    /// minimum block from the fairness groups.
    pub exclude_restricted_from_fairness: bool,
}

/// Validation outcome: hard violations plus the soft penalty breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleReport {
    pub violations: Vec<Violation>,
    pub penalties: PenaltyBreakdown,
}

impl RuleReport {
    /// Whether the schedule satisfies every hard rule.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// All violations carrying a given tag.
    pub fn with_tag(&self, tag: RuleTag) -> Vec<&Violation> {
        self.violations.iter().filter(|v| v.rule == tag).collect()
    }
}

/// Minimum days between two block starts of the same person.
pub const BLOCK_SPACING_DAYS: i64 = 14;

/// Penalty per excess night over the person's maximum block length.
const MAX_CONSECUTIVE_PENALTY: f64 = 100.0;

/// FTE reference: loads are normalized to a 40-hour contract.
const FULL_TIME_HOURS: f64 = 40.0;

/// Validates a schedule against every roster rule.
pub fn validate(
    schedule: &Schedule,
    staff: &[Staff],
    vacations: &VacationMap,
    options: RuleOptions,
) -> RuleReport {
    let staff_map: HashMap<&str, &Staff> =
        staff.iter().map(|s| (s.identifier.as_str(), s)).collect();
    let oracle = Eligibility::build(staff, schedule.start, schedule.end, vacations);

    let mut violations = Vec::new();
    violations.extend(check_coverage(schedule, &staff_map));
    violations.extend(check_eligibility(schedule, &staff_map, &oracle));
    violations.extend(check_double_booking(schedule));
    violations.extend(check_night_pairing(schedule, &staff_map));
    violations.extend(check_rest_after_night(schedule, staff));
    violations.extend(check_weekend_isolation(schedule, staff));
    violations.extend(check_block_spacing(schedule, staff));
    violations.extend(check_min_consecutive(schedule, staff));
    violations.extend(check_department_nights(schedule, &staff_map));
    violations.extend(check_pair_flags(schedule));
    if options.enforce_min_participation {
        violations.extend(check_participation(schedule, staff, &oracle));
    }

    let mut penalties = PenaltyBreakdown::default();
    penalties.max_consecutive = max_consecutive_penalty(schedule, staff);
    fairness_penalty(schedule, staff, &oracle, options, &mut penalties);

    RuleReport {
        violations,
        penalties,
    }
}

/// Maximal runs of consecutive dates.
fn consecutive_runs(dates: &BTreeSet<NaiveDate>) -> Vec<Vec<NaiveDate>> {
    let mut runs: Vec<Vec<NaiveDate>> = Vec::new();
    for &date in dates {
        match runs.last_mut() {
            Some(run) if run.last().map(|d| (date - *d).num_days()) == Some(1) => {
                run.push(date);
            }
            _ => runs.push(vec![date]),
        }
    }
    runs
}

fn night_dates(schedule: &Schedule, staff_id: &str) -> BTreeSet<NaiveDate> {
    schedule
        .for_staff(staff_id)
        .filter(|a| a.is_night())
        .map(|a| a.date)
        .collect()
}

fn check_coverage(schedule: &Schedule, staff_map: &HashMap<&str, &Staff>) -> Vec<Violation> {
    let mut violations = Vec::new();

    for slot in slots_in_range(schedule.start, schedule.end) {
        let on = schedule.on_slot(slot.date, slot.kind);
        if slot.kind.is_weekend_day() {
            if on.len() != 1 {
                violations.push(Violation::new(
                    RuleTag::Coverage,
                    on.iter().map(|a| a.staff_id.clone()),
                    [slot.date],
                    format!(
                        "{} on {} has {} staff, expected exactly 1",
                        slot.kind, slot.date, on.len()
                    ),
                ));
            }
            continue;
        }

        // Night slot.
        if slot.kind.is_vet_on_site() {
            let non_azubis: Vec<&str> = on
                .iter()
                .filter(|a| {
                    staff_map
                        .get(a.staff_id.as_str())
                        .is_some_and(|s| s.role != Role::Azubi)
                })
                .map(|a| a.staff_id.as_str())
                .collect();
            if non_azubis.len() != 1 {
                violations.push(Violation::new(
                    RuleTag::Coverage,
                    on.iter().map(|a| a.staff_id.clone()),
                    [slot.date],
                    format!(
                        "vet-on-site night {} on {} has {} non-apprentices, expected exactly 1",
                        slot.kind,
                        slot.date,
                        non_azubis.len()
                    ),
                ));
            }
        } else if on.is_empty() || on.len() > 2 {
            violations.push(Violation::new(
                RuleTag::Coverage,
                on.iter().map(|a| a.staff_id.clone()),
                [slot.date],
                format!(
                    "night {} on {} has {} staff, expected 1 or 2",
                    slot.kind,
                    slot.date,
                    on.len()
                ),
            ));
        }
    }

    violations
}

fn check_eligibility(
    schedule: &Schedule,
    staff_map: &HashMap<&str, &Staff>,
    oracle: &Eligibility,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for assignment in &schedule.assignments {
        match staff_map.get(assignment.staff_id.as_str()) {
            None => violations.push(Violation::new(
                RuleTag::Eligibility,
                [assignment.staff_id.clone()],
                [assignment.date],
                format!("unknown staff '{}'", assignment.staff_id),
            )),
            Some(person) => {
                if !oracle.may_work(person, assignment.kind, assignment.date) {
                    violations.push(Violation::new(
                        RuleTag::Eligibility,
                        [assignment.staff_id.clone()],
                        [assignment.date],
                        format!(
                            "{} is not eligible for {} on {}",
                            person.name, assignment.kind, assignment.date
                        ),
                    ));
                }
            }
        }
    }
    violations
}

fn check_double_booking(schedule: &Schedule) -> Vec<Violation> {
    let mut per_day: BTreeMap<(&str, NaiveDate), Vec<ShiftKind>> = BTreeMap::new();
    for a in &schedule.assignments {
        per_day
            .entry((a.staff_id.as_str(), a.date))
            .or_default()
            .push(a.kind);
    }

    per_day
        .into_iter()
        .filter(|(_, kinds)| kinds.len() > 1)
        .map(|((staff_id, date), kinds)| {
            let kinds: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
            Violation::new(
                RuleTag::DoubleBooking,
                [staff_id.to_string()],
                [date],
                format!("{} holds multiple slots on {}: {}", staff_id, date, kinds.join(", ")),
            )
        })
        .collect()
}

fn check_night_pairing(
    schedule: &Schedule,
    staff_map: &HashMap<&str, &Staff>,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    let night_dates: BTreeSet<NaiveDate> = schedule
        .assignments
        .iter()
        .filter(|a| a.is_night())
        .map(|a| a.date)
        .collect();

    for date in night_dates {
        let on = schedule.night_staff(date);
        let kind = ShiftKind::night_for(date.weekday());

        let mut azubis: Vec<&Staff> = Vec::new();
        let mut non_azubis: Vec<&Staff> = Vec::new();
        for a in &on {
            if let Some(person) = staff_map.get(a.staff_id.as_str()).copied() {
                if person.role == Role::Azubi {
                    azubis.push(person);
                } else {
                    non_azubis.push(person);
                }
            }
        }

        if azubis.len() > 1 {
            violations.push(Violation::new(
                RuleTag::MultipleAzubis,
                azubis.iter().map(|s| s.identifier.clone()),
                [date],
                format!("night on {date} has {} apprentices, at most 1 allowed", azubis.len()),
            ));
        }

        if !azubis.is_empty() && non_azubis.is_empty() {
            violations.push(Violation::new(
                RuleTag::AzubiNeedsPairing,
                azubis.iter().map(|s| s.identifier.clone()),
                [date],
                format!("apprentice works the night on {date} with no TFA or intern present"),
            ));
        }

        if kind.is_vet_on_site() {
            if non_azubis.len() > 1 {
                violations.push(Violation::new(
                    RuleTag::VetNightCapacity,
                    non_azubis.iter().map(|s| s.identifier.clone()),
                    [date],
                    format!(
                        "vet-on-site night on {date} has {} non-apprentices, expected exactly 1",
                        non_azubis.len()
                    ),
                ));
            }
            // Lone-worker rules do not apply when the vet is on-site.
            continue;
        }

        for person in &non_azubis {
            if person.night_alone && on.len() > 1 {
                let others: Vec<String> = on
                    .iter()
                    .filter(|a| a.staff_id != person.identifier)
                    .map(|a| a.staff_id.clone())
                    .collect();
                violations.push(Violation::new(
                    RuleTag::SoloRequired,
                    std::iter::once(person.identifier.clone()).chain(others),
                    [date],
                    format!("{} must work the night on {date} alone", person.name),
                ));
            }
            if !person.night_alone && on.len() < 2 {
                violations.push(Violation::new(
                    RuleTag::PairingRequired,
                    [person.identifier.clone()],
                    [date],
                    format!("{} must be paired on the night on {date}", person.name),
                ));
            }
        }
    }

    violations
}

fn check_rest_after_night(schedule: &Schedule, staff: &[Staff]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for person in staff {
        let nights = night_dates(schedule, &person.identifier);
        if nights.is_empty() {
            continue;
        }
        for a in schedule.for_staff(&person.identifier) {
            if a.is_night() {
                continue;
            }
            // A daytime shift on the night's start date or the morning
            // after collides with the rest window. The night itself may
            // continue into the next night.
            let clashes = nights.contains(&a.date)
                || a.date
                    .pred_opt()
                    .is_some_and(|prev| nights.contains(&prev));
            if clashes {
                violations.push(Violation::new(
                    RuleTag::RestAfterNight,
                    [person.identifier.clone()],
                    [a.date],
                    format!(
                        "{} has a daytime shift on {} inside a night rest window",
                        person.name, a.date
                    ),
                ));
            }
        }
    }
    violations
}

fn check_weekend_isolation(schedule: &Schedule, staff: &[Staff]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for person in staff {
        let worked = schedule.dates_worked(&person.identifier);
        for a in schedule.for_staff(&person.identifier) {
            if !a.is_weekend_day() {
                continue;
            }
            let mut adjacent: Vec<NaiveDate> = Vec::new();
            if let Some(prev) = a.date.pred_opt() {
                if worked.contains(&prev) {
                    adjacent.push(prev);
                }
            }
            if let Some(next) = a.date.succ_opt() {
                if worked.contains(&next) {
                    adjacent.push(next);
                }
            }
            if !adjacent.is_empty() {
                violations.push(Violation::new(
                    RuleTag::WeekendIsolation,
                    [person.identifier.clone()],
                    std::iter::once(a.date).chain(adjacent),
                    format!(
                        "{}'s weekend shift {} on {} is adjacent to other shifts",
                        person.name, a.kind, a.date
                    ),
                ));
            }
        }
    }
    violations
}

fn check_block_spacing(schedule: &Schedule, staff: &[Staff]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for person in staff {
        let worked = schedule.dates_worked(&person.identifier);
        let runs = consecutive_runs(&worked);
        let starts: Vec<NaiveDate> = runs.iter().filter_map(|r| r.first().copied()).collect();

        for (i, &first) in starts.iter().enumerate() {
            for &second in &starts[i + 1..] {
                let gap = (second - first).num_days();
                if gap >= BLOCK_SPACING_DAYS {
                    break;
                }
                violations.push(Violation::new(
                    RuleTag::BlockSpacingViolation,
                    [person.identifier.clone()],
                    [first, second],
                    format!(
                        "{} starts blocks on {} and {}, only {} days apart",
                        person.name, first, second, gap
                    ),
                ));
                // One report per earlier block is enough.
                break;
            }
        }
    }
    violations
}

fn check_min_consecutive(schedule: &Schedule, staff: &[Staff]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for person in staff {
        // Apprentices may work single nights.
        if person.role == Role::Azubi {
            continue;
        }
        let min = person.min_consecutive_nights() as usize;
        if min <= 1 {
            continue;
        }
        let nights = night_dates(schedule, &person.identifier);
        for run in consecutive_runs(&nights) {
            if run.len() < min {
                violations.push(Violation::new(
                    RuleTag::MinConsecViolation,
                    [person.identifier.clone()],
                    run.clone(),
                    format!(
                        "{} works only {} consecutive night(s) from {}, minimum is {}",
                        person.name,
                        run.len(),
                        run[0],
                        min
                    ),
                ));
            }
        }
    }
    violations
}

fn check_department_nights(
    schedule: &Schedule,
    staff_map: &HashMap<&str, &Staff>,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    // Restricted-department staff per night date.
    let mut per_night: BTreeMap<NaiveDate, BTreeMap<Department, BTreeSet<String>>> =
        BTreeMap::new();
    for a in &schedule.assignments {
        if !a.is_night() {
            continue;
        }
        if let Some(person) = staff_map.get(a.staff_id.as_str()) {
            if matches!(person.department, Department::Station | Department::Op) {
                per_night
                    .entry(a.date)
                    .or_default()
                    .entry(person.department)
                    .or_default()
                    .insert(person.identifier.clone());
            }
        }
    }

    let dates: Vec<NaiveDate> = per_night.keys().copied().collect();
    for (i, &date) in dates.iter().enumerate() {
        for (department, ids) in &per_night[&date] {
            if ids.len() >= 2 {
                violations.push(Violation::new(
                    RuleTag::DepartmentClash,
                    ids.iter().cloned(),
                    [date],
                    format!("multiple {department:?} staff share the night on {date}"),
                ));
            }
        }

        // Adjacent nights: different people of the same department.
        let Some(&next) = dates.get(i + 1) else {
            continue;
        };
        if (next - date).num_days() != 1 {
            continue;
        }
        for department in [Department::Station, Department::Op] {
            let today = per_night[&date].get(&department);
            let tomorrow = per_night[&next].get(&department);
            if let (Some(today), Some(tomorrow)) = (today, tomorrow) {
                let different: Vec<&String> =
                    today.symmetric_difference(tomorrow).collect();
                if !different.is_empty() {
                    violations.push(Violation::new(
                        RuleTag::DepartmentClash,
                        today.union(tomorrow).cloned(),
                        [date, next],
                        format!(
                            "{department:?} staff on consecutive nights {date} and {next}"
                        ),
                    ));
                }
            }
        }
    }

    violations
}

fn check_pair_flags(schedule: &Schedule) -> Vec<Violation> {
    let mut violations = Vec::new();
    for a in &schedule.assignments {
        let expected = a.is_night() && schedule.night_staff(a.date).len() == 2;
        if a.paired != expected {
            violations.push(Violation::new(
                RuleTag::PairFlag,
                [a.staff_id.clone()],
                [a.date],
                format!(
                    "paired flag on {} {} is {}, occupancy says {}",
                    a.kind, a.date, a.paired, expected
                ),
            ));
        }
    }
    violations
}

fn check_participation(
    schedule: &Schedule,
    staff: &[Staff],
    oracle: &Eligibility,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let slots = slots_in_range(schedule.start, schedule.end);

    for person in staff {
        let weekend_eligible = person.role != Role::Intern
            && slots
                .iter()
                .any(|s| s.is_weekend_day() && oracle.may_work(person, s.kind, s.date));
        if weekend_eligible && schedule.weekend_count(&person.identifier) == 0 {
            violations.push(Violation::new(
                RuleTag::MissingWeekendParticipation,
                [person.identifier.clone()],
                Vec::new(),
                format!("{} works no weekend shift in the quarter", person.name),
            ));
        }

        // People whose permitted start weekdays cannot host their minimum
        // block are exempt from the night requirement.
        let night_eligible = person.night_possible
            && person.permitted_night_weekdays() >= person.min_consecutive_nights()
            && slots
                .iter()
                .any(|s| s.is_night() && oracle.may_work(person, s.kind, s.date));
        if night_eligible && night_dates(schedule, &person.identifier).is_empty() {
            violations.push(Violation::new(
                RuleTag::MissingNightParticipation,
                [person.identifier.clone()],
                Vec::new(),
                format!("{} works no night shift in the quarter", person.name),
            ));
        }
    }
    violations
}

fn max_consecutive_penalty(schedule: &Schedule, staff: &[Staff]) -> f64 {
    let mut penalty = 0.0;
    for person in staff {
        let Some(limit) = person.max_consecutive_nights else {
            continue;
        };
        let nights = night_dates(schedule, &person.identifier);
        for run in consecutive_runs(&nights) {
            if run.len() > limit as usize {
                // One charge per excess night, matching the model's
                // count of violated sliding windows.
                penalty += (run.len() - limit as usize) as f64 * MAX_CONSECUTIVE_PENALTY;
            }
        }
    }
    penalty
}

/// Per-person FTE- and presence-normalized duty load.
pub fn normalized_load(schedule: &Schedule, person: &Staff, oracle: &Eligibility) -> f64 {
    let available = oracle.available_days(&person.identifier).max(1) as f64;
    let presence = oracle.total_days() as f64 / available;
    schedule.total_duties(person) * (FULL_TIME_HOURS / person.hours as f64) * presence
}

fn fairness_penalty(
    schedule: &Schedule,
    staff: &[Staff],
    oracle: &Eligibility,
    options: RuleOptions,
    penalties: &mut PenaltyBreakdown,
) {
    for role in [Role::Tfa, Role::Azubi, Role::Intern] {
        let group: Vec<&Staff> = staff
            .iter()
            .filter(|s| s.role == role)
            .filter(|s| {
                !options.exclude_restricted_from_fairness
                    || s.permitted_night_weekdays() >= s.min_consecutive_nights()
            })
            .collect();
        if group.len() < 2 {
            continue;
        }

        let loads: Vec<f64> = group
            .iter()
            .map(|s| normalized_load(schedule, s, oracle))
            .collect();
        let mean = loads.iter().sum::<f64>() / loads.len() as f64;
        let squared: f64 = loads.iter().map(|l| (l - mean).powi(2)).sum();
        let std_dev = (squared / loads.len() as f64).sqrt();

        penalties.fairness_deviation += squared;
        penalties.fairness_spread += std_dev * 10.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, Slot};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn tfa(id: &str) -> Staff {
        Staff::new(id, id.to_uppercase())
    }

    fn no_vacations() -> VacationMap {
        VacationMap::new()
    }

    #[test]
    fn test_consecutive_runs() {
        let dates = BTreeSet::from([
            d(2026, 4, 3),
            d(2026, 4, 4),
            d(2026, 4, 5),
            d(2026, 4, 17),
            d(2026, 4, 18),
        ]);
        let runs = consecutive_runs(&dates);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 3);
        assert_eq!(runs[1], vec![d(2026, 4, 17), d(2026, 4, 18)]);
    }

    #[test]
    fn test_weekend_isolation_before_night_block() {
        // Saturday daytime followed by the Sun->Mon night the next day:
        // weekend isolation fires, rest-after-night does not (the night
        // starts after the Saturday).
        let mut schedule = Schedule::new(d(2026, 4, 4), d(2026, 4, 6));
        schedule.add(Assignment::new("x", d(2026, 4, 4), ShiftKind::Sat10To21));
        schedule.add(Assignment::new("x", d(2026, 4, 5), ShiftKind::NightSunMon));
        schedule.add(Assignment::new("x", d(2026, 4, 6), ShiftKind::NightMonTue));

        let staff = vec![tfa("x")];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());

        assert!(!report.with_tag(RuleTag::WeekendIsolation).is_empty());
        assert!(report.with_tag(RuleTag::RestAfterNight).is_empty());
    }

    #[test]
    fn test_rest_after_night() {
        // Fri->Sat night, then a Saturday daytime shift the next day.
        let mut schedule = Schedule::new(d(2026, 4, 3), d(2026, 4, 4));
        schedule.add(Assignment::new("x", d(2026, 4, 2), ShiftKind::NightThuFri));
        schedule.add(Assignment::new("x", d(2026, 4, 3), ShiftKind::NightFriSat));
        schedule.add(Assignment::new("x", d(2026, 4, 4), ShiftKind::Sat10To21));

        let staff = vec![tfa("x")];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());

        assert!(!report.with_tag(RuleTag::RestAfterNight).is_empty());
        // Two consecutive nights are a legal block, not a rest breach.
        assert!(report.with_tag(RuleTag::MinConsecViolation).is_empty());
    }

    #[test]
    fn test_min_consecutive_violation() {
        // Minimum of 3, but only Tue->Wed and Wed->Thu worked.
        let mut schedule = Schedule::new(d(2026, 4, 6), d(2026, 4, 12));
        schedule.add(
            Assignment::new("y", d(2026, 4, 7), ShiftKind::NightTueWed).with_paired(false),
        );
        schedule.add(
            Assignment::new("y", d(2026, 4, 8), ShiftKind::NightWedThu).with_paired(false),
        );

        let staff = vec![tfa("y").with_min_consecutive_nights(3).with_night_alone(true)];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());

        let hits = report.with_tag(RuleTag::MinConsecViolation);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].message.contains("only 2 consecutive"));
    }

    #[test]
    fn test_block_spacing_accepts_14_day_gap() {
        let mut schedule = Schedule::new(d(2026, 4, 1), d(2026, 4, 30));
        for day in [3, 4, 17, 18] {
            schedule.add(Assignment::new("z", d(2026, 4, day), Slot::night_on(d(2026, 4, day)).kind));
        }
        let staff = vec![tfa("z").with_night_alone(true)];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!(report.with_tag(RuleTag::BlockSpacingViolation).is_empty());
    }

    #[test]
    fn test_block_spacing_rejects_13_day_gap() {
        let mut schedule = Schedule::new(d(2026, 4, 1), d(2026, 4, 30));
        for day in [3, 4, 16, 17] {
            schedule.add(Assignment::new("z", d(2026, 4, day), Slot::night_on(d(2026, 4, day)).kind));
        }
        let staff = vec![tfa("z").with_night_alone(true)];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!(!report.with_tag(RuleTag::BlockSpacingViolation).is_empty());
    }

    #[test]
    fn test_azubi_needs_pairing_and_multiple_azubis() {
        let mut schedule = Schedule::new(d(2026, 4, 7), d(2026, 4, 8));
        schedule.add(
            Assignment::new("a1", d(2026, 4, 7), ShiftKind::NightTueWed).with_paired(true),
        );
        schedule.add(
            Assignment::new("a2", d(2026, 4, 7), ShiftKind::NightTueWed).with_paired(true),
        );

        let staff = vec![
            tfa("a1").with_role(Role::Azubi),
            tfa("a2").with_role(Role::Azubi),
        ];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!(!report.with_tag(RuleTag::MultipleAzubis).is_empty());
        assert!(!report.with_tag(RuleTag::AzubiNeedsPairing).is_empty());
    }

    #[test]
    fn test_pairing_required_and_solo_required() {
        // Must-pair TFA alone on a regular night.
        let mut schedule = Schedule::new(d(2026, 4, 7), d(2026, 4, 7));
        schedule.add(Assignment::new("p", d(2026, 4, 7), ShiftKind::NightTueWed));
        let staff = vec![tfa("p")];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!(!report.with_tag(RuleTag::PairingRequired).is_empty());

        // Must-work-alone TFA sharing a regular night.
        let mut schedule = Schedule::new(d(2026, 4, 7), d(2026, 4, 7));
        schedule.add(
            Assignment::new("w", d(2026, 4, 7), ShiftKind::NightTueWed).with_paired(true),
        );
        schedule.add(
            Assignment::new("p", d(2026, 4, 7), ShiftKind::NightTueWed).with_paired(true),
        );
        let staff = vec![tfa("w").with_night_alone(true), tfa("p")];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!(!report.with_tag(RuleTag::SoloRequired).is_empty());
    }

    #[test]
    fn test_lone_worker_rules_skip_vet_nights() {
        // Sun->Mon night: a must-pair TFA may be alone there.
        let mut schedule = Schedule::new(d(2026, 4, 5), d(2026, 4, 6));
        schedule.add(Assignment::new("p", d(2026, 4, 5), ShiftKind::NightSunMon));
        schedule.add(Assignment::new("p", d(2026, 4, 6), ShiftKind::NightMonTue));
        let staff = vec![tfa("p")];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!(report.with_tag(RuleTag::PairingRequired).is_empty());
        assert!(report.with_tag(RuleTag::SoloRequired).is_empty());
    }

    #[test]
    fn test_vet_night_capacity() {
        let mut schedule = Schedule::new(d(2026, 4, 5), d(2026, 4, 5));
        schedule.add(
            Assignment::new("t1", d(2026, 4, 5), ShiftKind::NightSunMon).with_paired(true),
        );
        schedule.add(
            Assignment::new("t2", d(2026, 4, 5), ShiftKind::NightSunMon).with_paired(true),
        );
        let staff = vec![tfa("t1"), tfa("t2")];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!(!report.with_tag(RuleTag::VetNightCapacity).is_empty());
    }

    #[test]
    fn test_department_clash_same_and_adjacent_nights() {
        let station = |id: &str| tfa(id).with_department(Department::Station);

        // Same night.
        let mut schedule = Schedule::new(d(2026, 4, 7), d(2026, 4, 8));
        schedule.add(
            Assignment::new("s1", d(2026, 4, 7), ShiftKind::NightTueWed).with_paired(true),
        );
        schedule.add(
            Assignment::new("s2", d(2026, 4, 7), ShiftKind::NightTueWed).with_paired(true),
        );
        let staff = vec![station("s1"), station("s2")];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!(!report.with_tag(RuleTag::DepartmentClash).is_empty());

        // Adjacent nights, different people.
        let mut schedule = Schedule::new(d(2026, 4, 7), d(2026, 4, 8));
        schedule.add(Assignment::new("s1", d(2026, 4, 7), ShiftKind::NightTueWed));
        schedule.add(Assignment::new("s2", d(2026, 4, 8), ShiftKind::NightWedThu));
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!(!report.with_tag(RuleTag::DepartmentClash).is_empty());

        // The same person continuing their block is allowed.
        let mut schedule = Schedule::new(d(2026, 4, 7), d(2026, 4, 8));
        schedule.add(Assignment::new("s1", d(2026, 4, 7), ShiftKind::NightTueWed));
        schedule.add(Assignment::new("s1", d(2026, 4, 8), ShiftKind::NightWedThu));
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!(report.with_tag(RuleTag::DepartmentClash).is_empty());
    }

    #[test]
    fn test_pair_flag_consistency() {
        let mut schedule = Schedule::new(d(2026, 4, 7), d(2026, 4, 7));
        // Solo night wrongly flagged as paired.
        schedule.add(
            Assignment::new("w", d(2026, 4, 7), ShiftKind::NightTueWed).with_paired(true),
        );
        let staff = vec![tfa("w").with_night_alone(true)];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert_eq!(report.with_tag(RuleTag::PairFlag).len(), 1);
    }

    #[test]
    fn test_double_booking() {
        let mut schedule = Schedule::new(d(2026, 4, 4), d(2026, 4, 4));
        schedule.add(Assignment::new("x", d(2026, 4, 4), ShiftKind::Sat10To21));
        schedule.add(Assignment::new("x", d(2026, 4, 4), ShiftKind::Sat10To22));
        let report = validate(&schedule, &vec![tfa("x")], &no_vacations(), RuleOptions::default());
        assert_eq!(report.with_tag(RuleTag::DoubleBooking).len(), 1);
    }

    #[test]
    fn test_eligibility_vacation_and_unknown() {
        let mut schedule = Schedule::new(d(2026, 4, 7), d(2026, 4, 7));
        schedule.add(Assignment::new("v", d(2026, 4, 7), ShiftKind::NightTueWed));
        schedule.add(Assignment::new("ghost", d(2026, 4, 7), ShiftKind::NightTueWed));

        let staff = vec![tfa("v").with_night_alone(true)];
        let mut vacations = VacationMap::new();
        vacations.insert("v".into(), BTreeSet::from([d(2026, 4, 7)]));

        let report = validate(&schedule, &staff, &vacations, RuleOptions::default());
        assert_eq!(report.with_tag(RuleTag::Eligibility).len(), 2);
    }

    #[test]
    fn test_participation_only_when_requested() {
        // Empty schedule over one week: the TFA misses both duties.
        let schedule = Schedule::new(d(2026, 4, 1), d(2026, 4, 7));
        let staff = vec![tfa("t")];

        let silent = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!(silent.with_tag(RuleTag::MissingWeekendParticipation).is_empty());
        assert!(silent.with_tag(RuleTag::MissingNightParticipation).is_empty());

        let opts = RuleOptions {
            enforce_min_participation: true,
            ..RuleOptions::default()
        };
        let checked = validate(&schedule, &staff, &no_vacations(), opts);
        assert_eq!(checked.with_tag(RuleTag::MissingWeekendParticipation).len(), 1);
        assert_eq!(checked.with_tag(RuleTag::MissingNightParticipation).len(), 1);
    }

    #[test]
    fn test_participation_exempts_restricted_nights() {
        // Only one permitted start weekday, but minimum block of 2:
        // exempt from the night requirement.
        let schedule = Schedule::new(d(2026, 4, 1), d(2026, 4, 7));
        let staff = vec![tfa("r").with_blocked_start_weekdays([1, 2, 3, 4, 5, 6])];
        let opts = RuleOptions {
            enforce_min_participation: true,
            ..RuleOptions::default()
        };
        let report = validate(&schedule, &staff, &no_vacations(), opts);
        assert!(report.with_tag(RuleTag::MissingNightParticipation).is_empty());
    }

    #[test]
    fn test_max_consecutive_soft_penalty() {
        let mut schedule = Schedule::new(d(2026, 4, 6), d(2026, 4, 12));
        for day in 7..=9 {
            schedule.add(Assignment::new(
                "m",
                d(2026, 4, day),
                Slot::night_on(d(2026, 4, day)).kind,
            ));
        }
        let staff = vec![tfa("m").with_night_alone(true).with_max_consecutive_nights(2)];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!((report.penalties.max_consecutive - 100.0).abs() < 1e-10);
        // Soft rule: no hard violation is added.
        assert!(report.with_tag(RuleTag::MinConsecViolation).is_empty());
    }

    #[test]
    fn test_max_consecutive_penalty_scales_with_excess() {
        // Five nights against a limit of two: three excess nights, one
        // charge each (the same count the model's sliding windows give).
        let mut schedule = Schedule::new(d(2026, 4, 6), d(2026, 4, 12));
        for day in 6..=10 {
            schedule.add(Assignment::new(
                "m",
                d(2026, 4, day),
                Slot::night_on(d(2026, 4, day)).kind,
            ));
        }
        let staff = vec![tfa("m").with_night_alone(true).with_max_consecutive_nights(2)];
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());
        assert!((report.penalties.max_consecutive - 300.0).abs() < 1e-10);
    }

    #[test]
    fn test_fairness_on_uniform_roster() {
        // Five identical TFAs, one week of nights starting Tue Apr 7.
        // Regular nights paired, vet nights solo. Blocks:
        //   a: 7-9, b: 7-8, c: 9-11, e: 10-11, f: 12-13 (vet, solo)
        let mut schedule = Schedule::new(d(2026, 4, 7), d(2026, 4, 13));
        let paired_nights = [
            ("a", 7),
            ("b", 7),
            ("a", 8),
            ("b", 8),
            ("a", 9),
            ("c", 9),
            ("e", 10),
            ("c", 10),
            ("e", 11),
            ("c", 11),
        ];
        for (id, day) in paired_nights {
            let date = d(2026, 4, day);
            schedule.add(Assignment::new(id, date, Slot::night_on(date).kind).with_paired(true));
        }
        for day in [12, 13] {
            let date = d(2026, 4, day);
            schedule.add(Assignment::new("f", date, Slot::night_on(date).kind));
        }

        let staff: Vec<Staff> = ["a", "b", "c", "e", "f"].map(tfa).to_vec();
        let report = validate(&schedule, &staff, &no_vacations(), RuleOptions::default());

        // Only the unfilled weekend daytime slots are flagged; every
        // night rule holds.
        assert!(report
            .violations
            .iter()
            .all(|v| v.rule == RuleTag::Coverage));

        // Effective nights: 1.5, 1.0, 1.5, 1.0, 2.0 (mean 1.4); every
        // member is within 0.6 of the mean.
        let oracle = Eligibility::build(&staff, schedule.start, schedule.end, &no_vacations());
        let loads: Vec<f64> = staff
            .iter()
            .map(|s| normalized_load(&schedule, s, &oracle))
            .collect();
        let mean = loads.iter().sum::<f64>() / loads.len() as f64;
        assert!((mean - 1.4).abs() < 1e-9);
        for load in &loads {
            assert!((load - mean).abs() <= 0.6 + 1e-9);
        }

        assert!((report.penalties.fairness_deviation - 0.7).abs() < 1e-9);
        assert!((report.penalties.fairness_spread - 3.7417).abs() < 1e-3);
    }

    #[test]
    fn test_fairness_presence_scaling() {
        // Same duties, half presence: the normalized load doubles.
        let mut schedule = Schedule::new(d(2026, 4, 1), d(2026, 4, 14));
        schedule.add(Assignment::new("v", d(2026, 4, 7), Slot::night_on(d(2026, 4, 7)).kind));
        let staff = vec![tfa("v")];
        let mut vacations = VacationMap::new();
        vacations.insert(
            "v".into(),
            (1..=7).map(|day| d(2026, 4, day)).collect(),
        );

        let oracle = Eligibility::build(&staff, schedule.start, schedule.end, &vacations);
        let load = normalized_load(&schedule, &staff[0], &oracle);
        assert!((load - 2.0).abs() < 1e-9);
    }
}
