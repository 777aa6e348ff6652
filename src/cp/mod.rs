//! CP formulation of the roster problem.
//!
//! Builds a [`CpModel`] from staff, slots, and the eligibility oracle,
//! then decodes a solver assignment back into a [`Schedule`]. One
//! decision variable exists per (staff, date, kind) that passes the
//! oracle; combinations ruled out by role or absence never enter the
//! model.
//!
//! Every hard rule of the validator has exactly one encoding here; the
//! two formulations are kept deliberately redundant so that divergence
//! shows up as an internal error instead of a bad roster.

pub mod model;
pub mod solver;

pub use model::{BoolVar, CpModel, LinExpr, Lit};
pub use solver::{CpSolution, CpSolver, SearchStatus, SolverConfig};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::RangeInclusive;

use crate::eligibility::Eligibility;
use crate::models::{Assignment, Role, Schedule, ShiftKind, Slot, Staff};
use crate::rules::BLOCK_SPACING_DAYS;

/// Integer scale for FTE-normalized loads (hours factor).
const SCALE: i64 = 400;

/// Integer scale for the presence (vacation) factor.
const PRESENCE_SCALE: i64 = 1000;

/// Soft cost per window exceeding a person's maximum consecutive nights.
const MAX_CONSECUTIVE_COST: i64 = 100;

/// Weight of the secondary night-balance objective.
const NIGHT_BALANCE_WEIGHT: i64 = 1;

/// A reason the model cannot be satisfied, reported without solving or
/// after an exhausted search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsatisfiableConstraint {
    /// A mandatory slot has no eligible staff at all.
    EmptySlot { date: NaiveDate, kind: ShiftKind },
    /// A night has apprentice candidates but nobody to pair them with.
    AzubiNeedsPairing { date: NaiveDate },
    /// Permitted start weekdays cannot host the minimum night block.
    MinConsecutiveUnreachable {
        staff: String,
        permitted: u32,
        required: u32,
    },
    /// A participation requirement collides with tight availability.
    ParticipationConflict { staff: String },
    /// No more specific cause could be derived.
    Generic,
}

/// Rule switches consumed by the model builder.
#[derive(Debug, Clone, Default)]
pub struct RosterOptions {
    /// Require one weekend and one night per eligible person.
    pub enforce_min_participation: bool,
    /// Per-quarter night-count bounds for each intern.
    pub intern_night_quota: Option<RangeInclusive<u32>>,
    /// Hard ceiling on each group's normalized load range, in duties.
    pub fairness_cap: Option<f64>,
    /// Drop staff who cannot host their minimum night block from the
    /// fairness groups.
    pub exclude_restricted_from_fairness: bool,
}

/// Builds a CP model for a roster problem.
///
/// # Example
/// ```no_run
/// use notdienst::cp::{CpSolver, RosterCpBuilder, SolverConfig};
/// use notdienst::eligibility::{Eligibility, VacationMap};
/// use notdienst::models::{Quarter, Staff};
///
/// let staff = vec![Staff::new("aa", "Anna")];
/// let quarter = Quarter::starting("2026-04-01".parse().unwrap()).unwrap();
/// let slots = quarter.slots();
/// let oracle = Eligibility::build(&staff, quarter.start(), quarter.end(), &VacationMap::new());
///
/// let builder = RosterCpBuilder::new(&staff, &slots, &oracle);
/// let roster = builder.build().unwrap();
/// let solution = CpSolver::new().solve(&roster.model, &SolverConfig::default());
/// let schedule = roster.decode(&solution);
/// ```
pub struct RosterCpBuilder<'a> {
    staff: &'a [Staff],
    slots: &'a [Slot],
    eligibility: &'a Eligibility,
    options: RosterOptions,
}

/// A built model plus the variable tables needed to decode solutions.
#[derive(Debug)]
pub struct RosterModel {
    pub model: CpModel,
    x: HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
    staff_ids: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
}

impl<'a> RosterCpBuilder<'a> {
    /// Creates a builder over staff, the slots to cover, and the oracle.
    pub fn new(staff: &'a [Staff], slots: &'a [Slot], eligibility: &'a Eligibility) -> Self {
        Self {
            staff,
            slots,
            eligibility,
            options: RosterOptions::default(),
        }
    }

    /// Sets the rule switches.
    pub fn with_options(mut self, options: RosterOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the model, or reports slots that cannot be covered.
    pub fn build(&self) -> Result<RosterModel, Vec<UnsatisfiableConstraint>> {
        let (Some(start), Some(end)) = (
            self.slots.iter().map(|s| s.date).min(),
            self.slots.iter().map(|s| s.date).max(),
        ) else {
            return Err(vec![UnsatisfiableConstraint::Generic]);
        };

        let mut model = CpModel::new();
        let mut x: HashMap<(usize, NaiveDate, ShiftKind), BoolVar> = HashMap::new();

        // Decision variables, slot-major so the search runs chronologically.
        for slot in self.slots {
            for (index, person) in self.staff.iter().enumerate() {
                if self.eligibility.may_work(person, slot.kind, slot.date) {
                    let var = model.new_bool(format!(
                        "x_{}_{}_{}",
                        person.identifier, slot.date, slot.kind
                    ));
                    x.insert((index, slot.date, slot.kind), var);
                }
            }
        }

        let night_dates: Vec<NaiveDate> = self
            .slots
            .iter()
            .filter(|s| s.is_night())
            .map(|s| s.date)
            .collect();

        let mut unsatisfiable = self.check_coverage_candidates(&x);
        if !unsatisfiable.is_empty() {
            unsatisfiable.sort_by_key(|u| match u {
                UnsatisfiableConstraint::EmptySlot { date, .. } => (*date, 0),
                UnsatisfiableConstraint::AzubiNeedsPairing { date } => (*date, 1),
                _ => (end, 2),
            });
            return Err(unsatisfiable);
        }

        self.add_one_slot_per_day(&mut model, &x);
        self.add_weekend_coverage(&mut model, &x);
        let sum2 = self.add_night_coverage(&mut model, &x, &night_dates);
        let paired = self.add_pairing_link(&mut model, &x, &sum2, &night_dates);
        self.add_azubi_rules(&mut model, &x, &night_dates);
        self.add_lone_worker_rules(&mut model, &x, &sum2, &night_dates);
        self.add_rest_after_night(&mut model, &x);
        self.add_weekend_isolation(&mut model, &x);
        self.add_min_consecutive(&mut model, &x, &night_dates);
        self.add_block_spacing(&mut model, &x);
        self.add_max_consecutive(&mut model, &x, &night_dates);
        self.add_department_rules(&mut model, &x, &night_dates);
        self.add_intern_quota(&mut model, &x, &night_dates);
        self.add_participation(&mut model, &x);
        self.add_objective(&mut model, &x, &paired, &night_dates);

        Ok(RosterModel {
            model,
            x,
            staff_ids: self
                .staff
                .iter()
                .map(|s| s.identifier.clone())
                .collect(),
            start,
            end,
        })
    }

    /// Slots that no eligible person can fill, before any search.
    fn check_coverage_candidates(
        &self,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
    ) -> Vec<UnsatisfiableConstraint> {
        let mut unsatisfiable = Vec::new();
        for slot in self.slots {
            let candidates: Vec<usize> = (0..self.staff.len())
                .filter(|&i| x.contains_key(&(i, slot.date, slot.kind)))
                .collect();
            if slot.is_weekend_day() {
                if candidates.is_empty() {
                    unsatisfiable.push(UnsatisfiableConstraint::EmptySlot {
                        date: slot.date,
                        kind: slot.kind,
                    });
                }
            } else {
                // Every night needs at least one non-apprentice.
                let has_non_azubi = candidates
                    .iter()
                    .any(|&i| self.staff[i].role != Role::Azubi);
                if !has_non_azubi {
                    if candidates.is_empty() {
                        unsatisfiable.push(UnsatisfiableConstraint::EmptySlot {
                            date: slot.date,
                            kind: slot.kind,
                        });
                    } else {
                        unsatisfiable.push(UnsatisfiableConstraint::AzubiNeedsPairing {
                            date: slot.date,
                        });
                    }
                }
            }
        }
        unsatisfiable
    }

    fn vars_on_date(
        &self,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
        index: usize,
        date: NaiveDate,
    ) -> Vec<BoolVar> {
        ShiftKind::ALL
            .iter()
            .filter_map(|&kind| x.get(&(index, date, kind)).copied())
            .collect()
    }

    fn night_var(
        &self,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
        index: usize,
        date: NaiveDate,
    ) -> Option<BoolVar> {
        x.get(&(index, date, ShiftKind::night_for(date.weekday())))
            .copied()
    }

    /// At most one slot per person per calendar date.
    fn add_one_slot_per_day(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
    ) {
        let dates: BTreeSet<NaiveDate> = self.slots.iter().map(|s| s.date).collect();
        for index in 0..self.staff.len() {
            for &date in &dates {
                let vars = self.vars_on_date(x, index, date);
                if vars.len() > 1 {
                    model.add_at_most(&vars, 1);
                }
            }
        }
    }

    /// Each weekend daytime slot holds exactly one person.
    fn add_weekend_coverage(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
    ) {
        for slot in self.slots.iter().filter(|s| s.is_weekend_day()) {
            let vars: Vec<BoolVar> = (0..self.staff.len())
                .filter_map(|i| x.get(&(i, slot.date, slot.kind)).copied())
                .collect();
            model.add_exactly(&vars, 1);
        }
    }

    /// Night occupancy bounds, returning the per-night "two on duty"
    /// indicator used by the pairing link.
    fn add_night_coverage(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
        night_dates: &[NaiveDate],
    ) -> BTreeMap<NaiveDate, BoolVar> {
        let mut sum2 = BTreeMap::new();
        for &date in night_dates {
            let kind = ShiftKind::night_for(date.weekday());
            let mut azubi_vars = Vec::new();
            let mut non_azubi_vars = Vec::new();
            for (index, person) in self.staff.iter().enumerate() {
                if let Some(&var) = x.get(&(index, date, kind)) {
                    if person.role == Role::Azubi {
                        azubi_vars.push(var);
                    } else {
                        non_azubi_vars.push(var);
                    }
                }
            }

            if kind.is_vet_on_site() {
                // Exactly one non-apprentice; at most one apprentice.
                model.add_exactly(&non_azubi_vars, 1);
                if !azubi_vars.is_empty() {
                    model.add_at_most(&azubi_vars, 1);
                }
            } else {
                let all: Vec<BoolVar> = non_azubi_vars
                    .iter()
                    .chain(azubi_vars.iter())
                    .copied()
                    .collect();
                model.add_sum_within(&all, 1, 2);
                model.add_at_least(&non_azubi_vars, 1);
            }

            // two_on_duty <=> total occupancy == 2.
            let all: Vec<(i64, BoolVar)> = non_azubi_vars
                .iter()
                .chain(azubi_vars.iter())
                .map(|&v| (1, v))
                .collect();
            let indicator = model.new_bool(format!("two_on_duty_{date}"));
            model.add_linear_if(Lit::pos(indicator), all.clone(), 2, 2);
            model.add_linear_if(Lit::neg(indicator), all, 0, 1);
            sum2.insert(date, indicator);
        }
        sum2
    }

    /// `paired[s, d] <=> assigned(s, d) and two_on_duty(d)`.
    fn add_pairing_link(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
        sum2: &BTreeMap<NaiveDate, BoolVar>,
        night_dates: &[NaiveDate],
    ) -> HashMap<(usize, NaiveDate), BoolVar> {
        let mut paired = HashMap::new();
        for &date in night_dates {
            let Some(&indicator) = sum2.get(&date) else {
                continue;
            };
            for (index, person) in self.staff.iter().enumerate() {
                if let Some(var) = self.night_var(x, index, date) {
                    let pair_var =
                        model.new_bool(format!("paired_{}_{}", person.identifier, date));
                    model.add_and_equals(pair_var, &[Lit::pos(var), Lit::pos(indicator)]);
                    paired.insert((index, date), pair_var);
                }
            }
        }
        paired
    }

    /// Apprentices pair with a non-apprentice, never with each other.
    fn add_azubi_rules(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
        night_dates: &[NaiveDate],
    ) {
        for &date in night_dates {
            let mut azubi_vars = Vec::new();
            let mut non_azubi_vars = Vec::new();
            for (index, person) in self.staff.iter().enumerate() {
                if let Some(var) = self.night_var(x, index, date) {
                    if person.role == Role::Azubi {
                        azubi_vars.push(var);
                    } else {
                        non_azubi_vars.push(var);
                    }
                }
            }
            if azubi_vars.len() > 1 {
                model.add_at_most(&azubi_vars, 1);
            }
            for &azubi in &azubi_vars {
                let terms: Vec<(i64, BoolVar)> =
                    non_azubi_vars.iter().map(|&v| (1, v)).collect();
                model.add_linear_if(Lit::pos(azubi), terms, 1, model::UNBOUNDED);
            }
        }
    }

    /// H5/H6 lone-worker policies on regular nights.
    fn add_lone_worker_rules(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
        sum2: &BTreeMap<NaiveDate, BoolVar>,
        night_dates: &[NaiveDate],
    ) {
        for &date in night_dates {
            let kind = ShiftKind::night_for(date.weekday());
            if kind.is_vet_on_site() {
                continue;
            }
            for (index, person) in self.staff.iter().enumerate() {
                if person.role == Role::Azubi {
                    continue;
                }
                let Some(var) = self.night_var(x, index, date) else {
                    continue;
                };
                if person.night_alone {
                    // No company at all on this night.
                    for other in 0..self.staff.len() {
                        if other == index {
                            continue;
                        }
                        if let Some(other_var) = self.night_var(x, other, date) {
                            model.add_at_most(&[var, other_var], 1);
                        }
                    }
                } else if let Some(&indicator) = sum2.get(&date) {
                    // Working implies the night is fully paired.
                    model.add_implication(Lit::pos(var), Lit::pos(indicator));
                }
            }
        }
    }

    /// No daytime shift the morning after a night.
    ///
    /// The same-date exclusion is already part of the one-slot-per-day
    /// constraint; a following night is a legal block continuation.
    fn add_rest_after_night(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
    ) {
        let day_slots: Vec<&Slot> = self.slots.iter().filter(|s| !s.is_night()).collect();
        for slot in self.slots.iter().filter(|s| s.is_night()) {
            let next = slot.next_day();
            for index in 0..self.staff.len() {
                let Some(night) = x.get(&(index, slot.date, slot.kind)).copied() else {
                    continue;
                };
                for day in day_slots.iter().filter(|d| d.date == next) {
                    if let Some(&day_var) = x.get(&(index, day.date, day.kind)) {
                        model.add_at_most(&[night, day_var], 1);
                    }
                }
            }
        }
    }

    /// Weekend daytime shifts are isolated from adjacent days.
    fn add_weekend_isolation(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
    ) {
        for slot in self.slots.iter().filter(|s| s.is_weekend_day()) {
            let neighbors: Vec<NaiveDate> = [slot.date.pred_opt(), slot.date.succ_opt()]
                .into_iter()
                .flatten()
                .collect();
            for index in 0..self.staff.len() {
                let Some(&weekend) = x.get(&(index, slot.date, slot.kind)) else {
                    continue;
                };
                for &neighbor in &neighbors {
                    for var in self.vars_on_date(x, index, neighbor) {
                        model.add_at_most(&[weekend, var], 1);
                    }
                }
            }
        }
    }

    /// A started night block runs for the person's minimum length.
    fn add_min_consecutive(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
        night_dates: &[NaiveDate],
    ) {
        for (index, person) in self.staff.iter().enumerate() {
            let min = person.min_consecutive_nights() as i64;
            if min <= 1 || !person.night_possible {
                continue;
            }

            let vars: Vec<(NaiveDate, BoolVar)> = night_dates
                .iter()
                .filter_map(|&d| self.night_var(x, index, d).map(|v| (d, v)))
                .collect();

            if min == 2 {
                // Each worked night needs a worked neighbor.
                for (i, &(date, var)) in vars.iter().enumerate() {
                    let mut adjacent = Vec::new();
                    if i > 0 {
                        let (prev_date, prev_var) = vars[i - 1];
                        if (date - prev_date).num_days() == 1 {
                            adjacent.push((1, prev_var));
                        }
                    }
                    if i + 1 < vars.len() {
                        let (next_date, next_var) = vars[i + 1];
                        if (next_date - date).num_days() == 1 {
                            adjacent.push((1, next_var));
                        }
                    }
                    if adjacent.is_empty() {
                        model.add_fixed(var, false);
                    } else {
                        model.add_linear_if(Lit::pos(var), adjacent, 1, model::UNBOUNDED);
                    }
                }
            } else {
                self.add_min_block(model, &vars, min as usize);
            }
        }
    }

    /// General minimum-block encoding for minima of three or more: a
    /// worked night must sit inside some fully-worked window of the
    /// minimum length. Windows clipped by the horizon or by absence
    /// gaps do not count, so a night too close to the edge is forced off.
    fn add_min_block(
        &self,
        model: &mut CpModel,
        vars: &[(NaiveDate, BoolVar)],
        min: usize,
    ) {
        for (i, &(date, var)) in vars.iter().enumerate() {
            let mut window_indicators = Vec::new();
            let lowest = i.saturating_sub(min - 1);
            for start in lowest..=i {
                if start + min > vars.len() {
                    break;
                }
                let window = &vars[start..start + min];
                let contiguous = window
                    .windows(2)
                    .all(|pair| (pair[1].0 - pair[0].0).num_days() == 1);
                if !contiguous {
                    continue;
                }
                let indicator =
                    model.new_bool(format!("night_block_{}_{}", date, start));
                let lits: Vec<Lit> = window.iter().map(|&(_, v)| Lit::pos(v)).collect();
                model.add_and_equals(indicator, &lits);
                window_indicators.push(indicator);
            }
            if window_indicators.is_empty() {
                model.add_fixed(var, false);
            } else {
                let terms: Vec<(i64, BoolVar)> =
                    window_indicators.iter().map(|&v| (1, v)).collect();
                model.add_linear_if(Lit::pos(var), terms, 1, model::UNBOUNDED);
            }
        }
    }

    /// Block starts of one person are at least 14 days apart.
    fn add_block_spacing(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
    ) {
        let dates: BTreeSet<NaiveDate> = self.slots.iter().map(|s| s.date).collect();

        for (index, person) in self.staff.iter().enumerate() {
            // works_on[d]: person holds any slot on d.
            let mut works_on: BTreeMap<NaiveDate, BoolVar> = BTreeMap::new();
            for &date in &dates {
                let vars = self.vars_on_date(x, index, date);
                match vars.len() {
                    0 => {}
                    1 => {
                        works_on.insert(date, vars[0]);
                    }
                    _ => {
                        let aux = model
                            .new_bool(format!("works_{}_{}", person.identifier, date));
                        let terms: Vec<(i64, BoolVar)> =
                            vars.iter().map(|&v| (1, v)).collect();
                        model.add_linear_if(Lit::pos(aux), terms.clone(), 1, model::UNBOUNDED);
                        model.add_linear_if(Lit::neg(aux), terms, 0, 0);
                        works_on.insert(date, aux);
                    }
                }
            }

            // block_start[d]: works on d but not on d-1.
            let mut block_starts: BTreeMap<NaiveDate, BoolVar> = BTreeMap::new();
            for (&date, &works) in &works_on {
                let prev = date.pred_opt().and_then(|p| works_on.get(&p).copied());
                match prev {
                    Some(prev_works) => {
                        let start = model
                            .new_bool(format!("block_start_{}_{}", person.identifier, date));
                        model.add_and_equals(
                            start,
                            &[Lit::pos(works), Lit::neg(prev_works)],
                        );
                        block_starts.insert(date, start);
                    }
                    None => {
                        block_starts.insert(date, works);
                    }
                }
            }

            let start_dates: Vec<NaiveDate> = block_starts.keys().copied().collect();
            for (i, &first) in start_dates.iter().enumerate() {
                for &second in &start_dates[i + 1..] {
                    if (second - first).num_days() >= BLOCK_SPACING_DAYS {
                        break;
                    }
                    model.add_at_most(&[block_starts[&first], block_starts[&second]], 1);
                }
            }
        }
    }

    /// Sliding-window soft cap on consecutive nights.
    fn add_max_consecutive(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
        night_dates: &[NaiveDate],
    ) {
        for (index, person) in self.staff.iter().enumerate() {
            let Some(limit) = person.max_consecutive_nights else {
                continue;
            };
            let limit = limit as usize;
            let vars: Vec<(NaiveDate, BoolVar)> = night_dates
                .iter()
                .filter_map(|&d| self.night_var(x, index, d).map(|v| (d, v)))
                .collect();

            for window in vars.windows(limit + 1) {
                let contiguous = window
                    .windows(2)
                    .all(|pair| (pair[1].0 - pair[0].0).num_days() == 1);
                if !contiguous {
                    continue;
                }
                let excess = model.new_bool(format!(
                    "night_excess_{}_{}",
                    person.identifier, window[0].0
                ));
                let mut terms: Vec<(i64, BoolVar)> =
                    window.iter().map(|&(_, v)| (1, v)).collect();
                terms.push((-1, excess));
                model.add_linear(terms, -1, limit as i64);
                model.add_penalty(MAX_CONSECUTIVE_COST, excess);
            }
        }
    }

    /// Department separation on the same and adjacent nights.
    fn add_department_rules(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
        night_dates: &[NaiveDate],
    ) {
        use crate::models::Department;

        for department in [Department::Station, Department::Op] {
            let members: Vec<usize> = self
                .staff
                .iter()
                .enumerate()
                .filter(|(_, s)| s.department == department && s.night_possible)
                .map(|(i, _)| i)
                .collect();
            if members.len() < 2 {
                continue;
            }

            for (pos, &date) in night_dates.iter().enumerate() {
                let tonight: Vec<BoolVar> = members
                    .iter()
                    .filter_map(|&i| self.night_var(x, i, date))
                    .collect();
                if tonight.len() >= 2 {
                    model.add_at_most(&tonight, 1);
                }

                // Different members on back-to-back nights.
                let Some(&next) = night_dates.get(pos + 1) else {
                    continue;
                };
                if (next - date).num_days() != 1 {
                    continue;
                }
                for &a in &members {
                    let Some(var_a) = self.night_var(x, a, date) else {
                        continue;
                    };
                    for &b in &members {
                        if a == b {
                            continue;
                        }
                        if let Some(var_b) = self.night_var(x, b, next) {
                            model.add_at_most(&[var_a, var_b], 1);
                        }
                    }
                }
            }
        }
    }

    /// Optional per-quarter night-count bounds for interns.
    fn add_intern_quota(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
        night_dates: &[NaiveDate],
    ) {
        let Some(quota) = &self.options.intern_night_quota else {
            return;
        };
        for (index, person) in self.staff.iter().enumerate() {
            if person.role != Role::Intern {
                continue;
            }
            let vars: Vec<BoolVar> = night_dates
                .iter()
                .filter_map(|&d| self.night_var(x, index, d))
                .collect();
            if !vars.is_empty() {
                model.add_sum_within(&vars, *quota.start() as i64, *quota.end() as i64);
            }
        }
    }

    /// Minimum participation, when requested.
    fn add_participation(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
    ) {
        if !self.options.enforce_min_participation {
            return;
        }
        for (index, person) in self.staff.iter().enumerate() {
            let weekend_vars: Vec<BoolVar> = self
                .slots
                .iter()
                .filter(|s| s.is_weekend_day())
                .filter_map(|s| x.get(&(index, s.date, s.kind)).copied())
                .collect();
            if person.role != Role::Intern && !weekend_vars.is_empty() {
                model.add_at_least(&weekend_vars, 1);
            }

            let night_vars: Vec<BoolVar> = self
                .slots
                .iter()
                .filter(|s| s.is_night())
                .filter_map(|s| x.get(&(index, s.date, s.kind)).copied())
                .collect();
            let can_host_block =
                person.permitted_night_weekdays() >= person.min_consecutive_nights();
            if person.night_possible && can_host_block && !night_vars.is_empty() {
                model.add_at_least(&night_vars, 1);
            }
        }
    }

    /// Fairness objective: per-group load ranges, plus the secondary
    /// night-balance ranges, plus the optional hard cap.
    fn add_objective(
        &self,
        model: &mut CpModel,
        x: &HashMap<(usize, NaiveDate, ShiftKind), BoolVar>,
        paired: &HashMap<(usize, NaiveDate), BoolVar>,
        night_dates: &[NaiveDate],
    ) {
        let total_days = self.eligibility.total_days().max(1) as i64;

        let multiplier = |person: &Staff| -> i64 {
            let available =
                self.eligibility.available_days(&person.identifier) as i64;
            let presence = ((available * PRESENCE_SCALE) / total_days).max(1);
            let hours_factor = SCALE / person.hours as i64;
            hours_factor * ((PRESENCE_SCALE * 10) / presence) / 10
        };

        // Loads in half-duty units: weekends and apprentice nights count
        // 2, other nights 2 minus 1 when paired.
        let mut total_loads: Vec<LinExpr> = Vec::new();
        let mut night_loads: Vec<LinExpr> = Vec::new();
        for (index, person) in self.staff.iter().enumerate() {
            let mut nights = LinExpr::new();
            for &date in night_dates {
                if let Some(var) = self.night_var(x, index, date) {
                    nights.push(2, var);
                    if person.role != Role::Azubi {
                        if let Some(&pair_var) = paired.get(&(index, date)) {
                            nights.push(-1, pair_var);
                        }
                    }
                }
            }

            let mut total = nights.clone();
            for slot in self.slots.iter().filter(|s| s.is_weekend_day()) {
                if let Some(&var) = x.get(&(index, slot.date, slot.kind)) {
                    total.push(2, var);
                }
            }

            let factor = multiplier(person);
            total_loads.push(total.scaled(factor));
            night_loads.push(nights.scaled(factor));
        }

        let in_fairness = |person: &Staff| -> bool {
            !self.options.exclude_restricted_from_fairness
                || person.permitted_night_weekdays() >= person.min_consecutive_nights()
        };

        for role in [Role::Tfa, Role::Azubi, Role::Intern] {
            let members: Vec<usize> = self
                .staff
                .iter()
                .enumerate()
                .filter(|(_, s)| s.role == role && in_fairness(s))
                .map(|(i, _)| i)
                .collect();
            if members.len() < 2 {
                continue;
            }

            model.add_range_group(
                1,
                members.iter().map(|&i| total_loads[i].clone()).collect(),
            );

            if let Some(cap) = self.options.fairness_cap {
                // Cap in duties at the 40h reference; loads are in
                // half-units times SCALE / 40.
                let threshold = (cap * 2.0 * (SCALE / 40) as f64).round() as i64;
                for (a_pos, &a) in members.iter().enumerate() {
                    for &b in &members[a_pos + 1..] {
                        let mut diff: Vec<(i64, BoolVar)> = total_loads[a].terms.clone();
                        diff.extend(total_loads[b].terms.iter().map(|&(c, v)| (-c, v)));
                        model.add_linear(diff, -threshold, threshold);
                    }
                }
            }

            // Secondary: keep night counts level among the night-capable.
            if role != Role::Intern {
                let night_members: Vec<usize> = members
                    .iter()
                    .copied()
                    .filter(|&i| self.staff[i].night_possible)
                    .collect();
                if night_members.len() >= 2 {
                    model.add_range_group(
                        NIGHT_BALANCE_WEIGHT,
                        night_members
                            .iter()
                            .map(|&i| night_loads[i].clone())
                            .collect(),
                    );
                }
            }
        }
    }
}

impl RosterModel {
    /// Decodes a solver assignment into a schedule. Pair flags are
    /// derived from actual night occupancy.
    pub fn decode(&self, solution: &CpSolution) -> Schedule {
        let mut schedule = Schedule::new(self.start, self.end);
        let Some(values) = &solution.values else {
            return schedule;
        };

        let mut night_occupancy: HashMap<NaiveDate, u32> = HashMap::new();
        for (&(_, date, kind), &var) in &self.x {
            if kind.is_night() && values[var.index()] {
                *night_occupancy.entry(date).or_insert(0) += 1;
            }
        }

        for (&(index, date, kind), &var) in &self.x {
            if !values[var.index()] {
                continue;
            }
            let paired =
                kind.is_night() && night_occupancy.get(&date).copied() == Some(2);
            schedule.add(
                Assignment::new(self.staff_ids[index].clone(), date, kind)
                    .with_paired(paired),
            );
        }

        schedule.assignments.sort_by(|a, b| {
            (a.date, a.kind, a.staff_id.as_str()).cmp(&(b.date, b.kind, b.staff_id.as_str()))
        });
        schedule
    }

    /// Number of decision variables (excluding auxiliaries).
    pub fn decision_count(&self) -> usize {
        self.x.len()
    }

    /// Planning range covered by the slots.
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        (self.start, self.end)
    }
}
