//! Solve entry point and result envelope.
//!
//! `solve` is the one blocking operation of the crate: inputs are
//! validated, the slot calendar is generated, the CP model is built and
//! searched within the wall-clock budget, and the incumbent is decoded
//! and re-validated before it is handed back. Every non-internal
//! failure travels inside the [`SolveOutcome`] envelope; only rejected
//! inputs and validator/solver disagreement surface as errors.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::ops::RangeInclusive;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cp::{
    CpSolver, RosterCpBuilder, RosterOptions, SearchStatus, SolverConfig, UnsatisfiableConstraint,
};
use crate::eligibility::{Eligibility, VacationMap};
use crate::models::{Quarter, Schedule, Staff};
use crate::rules::{self, PenaltyBreakdown, RuleOptions, Violation};
use crate::validation::{validate_input, InputError};

/// Solve configuration.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Wall-clock budget for the search.
    pub time_limit: Duration,
    /// Seed for reproducible search; `None` uses a fixed default.
    pub seed: Option<u64>,
    /// Require one weekend and one night per eligible person.
    pub enforce_min_participation: bool,
    /// Per-quarter night-count bounds for each intern.
    pub intern_night_quota: Option<RangeInclusive<u32>>,
    /// Hard ceiling on each group's normalized load range, in duties.
    pub fairness_cap: Option<f64>,
    /// Drop staff who cannot host their minimum night block from the
    /// fairness groups.
    pub exclude_restricted_from_fairness: bool,
    /// Cooperative cancellation flag polled by the search.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(120),
            seed: None,
            enforce_min_participation: false,
            intern_night_quota: None,
            fairness_cap: None,
            exclude_restricted_from_fairness: false,
            cancel: None,
        }
    }
}

impl SolveOptions {
    /// Creates the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wall-clock budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    /// Sets the search seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Requires minimum participation (H21/H22).
    pub fn with_min_participation(mut self, enforce: bool) -> Self {
        self.enforce_min_participation = enforce;
        self
    }

    /// Bounds each intern's nights per quarter.
    pub fn with_intern_night_quota(mut self, quota: RangeInclusive<u32>) -> Self {
        self.intern_night_quota = Some(quota);
        self
    }

    /// Caps each group's normalized load range, in duties.
    pub fn with_fairness_cap(mut self, cap: f64) -> Self {
        self.fairness_cap = Some(cap);
        self
    }

    /// Excludes highly-restricted staff from the fairness groups.
    pub fn with_exclude_restricted_from_fairness(mut self, exclude: bool) -> Self {
        self.exclude_restricted_from_fairness = exclude;
        self
    }

    /// Attaches a cancellation flag.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn roster_options(&self) -> RosterOptions {
        RosterOptions {
            enforce_min_participation: self.enforce_min_participation,
            intern_night_quota: self.intern_night_quota.clone(),
            fairness_cap: self.fairness_cap,
            exclude_restricted_from_fairness: self.exclude_restricted_from_fairness,
        }
    }

    fn rule_options(&self) -> RuleOptions {
        RuleOptions {
            enforce_min_participation: self.enforce_min_participation,
            exclude_restricted_from_fairness: self.exclude_restricted_from_fairness,
        }
    }

    fn solver_config(&self) -> SolverConfig {
        let mut config = SolverConfig::new().with_time_limit(self.time_limit);
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(cancel) = &self.cancel {
            config = config.with_cancel(Arc::clone(cancel));
        }
        config
    }
}

/// Errors that cannot be expressed inside the envelope.
#[derive(Debug, Error)]
pub enum SolveError {
    /// Inputs were rejected before any model was built.
    #[error("invalid input: {}", format_input_errors(.0))]
    Input(Vec<InputError>),
    /// The validator contradicts the solver on a returned schedule.
    #[error("internal inconsistency: rule {rule} violated by a solver schedule\n{detail}")]
    Internal { rule: String, detail: String },
}

fn format_input_errors(errors: &[InputError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The result envelope of one solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveOutcome {
    /// Whether a rule-complete schedule was produced.
    pub feasible: bool,
    /// The best schedule found, if any.
    pub schedule: Option<Schedule>,
    /// Hard violations of the returned schedule; empty on success.
    pub violations: Vec<Violation>,
    /// Soft-penalty breakdown of the returned schedule.
    pub penalties: PenaltyBreakdown,
    /// How the search ended.
    pub status: SearchStatus,
    /// Whether cancellation cut the search short.
    pub cancelled: bool,
    /// Why no schedule exists, when one does not.
    pub unsatisfiable: Vec<UnsatisfiableConstraint>,
    /// Scaled objective value of the returned schedule.
    pub objective: Option<i64>,
}

impl SolveOutcome {
    fn empty(status: SearchStatus, cancelled: bool, unsatisfiable: Vec<UnsatisfiableConstraint>) -> Self {
        Self {
            feasible: false,
            schedule: None,
            violations: Vec::new(),
            penalties: PenaltyBreakdown::default(),
            status,
            cancelled,
            unsatisfiable,
            objective: None,
        }
    }
}

/// Produces a quarter roster for the given staff.
///
/// Blocks until the search finishes, exhausts its budget, or is
/// cancelled. Infeasibility and timeouts are reported in the envelope;
/// `Err` is reserved for rejected inputs and internal inconsistency.
pub fn solve(
    staff: &[Staff],
    quarter: Quarter,
    vacations: &VacationMap,
    options: &SolveOptions,
) -> Result<SolveOutcome, SolveError> {
    validate_input(staff, vacations).map_err(SolveError::Input)?;

    let slots = quarter.slots();
    let oracle = Eligibility::build(staff, quarter.start(), quarter.end(), vacations);
    let builder =
        RosterCpBuilder::new(staff, &slots, &oracle).with_options(options.roster_options());

    let roster = match builder.build() {
        Ok(roster) => roster,
        Err(unsatisfiable) => {
            return Ok(SolveOutcome::empty(
                SearchStatus::Infeasible,
                false,
                unsatisfiable,
            ));
        }
    };

    let solution = CpSolver::new().solve(&roster.model, &options.solver_config());

    match solution.status {
        SearchStatus::Optimal | SearchStatus::Feasible => {
            let schedule = roster.decode(&solution);
            let report = rules::validate(&schedule, staff, vacations, options.rule_options());
            if !report.is_valid() {
                return Err(internal_error(&schedule, &report.violations));
            }
            Ok(SolveOutcome {
                feasible: true,
                schedule: Some(schedule),
                violations: Vec::new(),
                penalties: report.penalties,
                status: solution.status,
                cancelled: solution.cancelled,
                unsatisfiable: Vec::new(),
                objective: solution.objective,
            })
        }
        SearchStatus::Infeasible => Ok(SolveOutcome::empty(
            SearchStatus::Infeasible,
            solution.cancelled,
            diagnose_infeasibility(staff, options),
        )),
        SearchStatus::Unknown => Ok(SolveOutcome::empty(
            SearchStatus::Unknown,
            solution.cancelled,
            Vec::new(),
        )),
    }
}

/// Builds the diagnostic dump for a validator/solver disagreement.
fn internal_error(schedule: &Schedule, violations: &[Violation]) -> SolveError {
    let mut detail = String::new();
    for violation in violations {
        let _ = writeln!(detail, "- {:?}: {}", violation.rule, violation.message);
    }
    let _ = writeln!(detail, "assignments:");
    for row in schedule.export_rows() {
        let _ = writeln!(
            detail,
            "  {} {} {} paired={}",
            row.date, row.kind, row.staff_id, row.paired
        );
    }
    SolveError::Internal {
        rule: format!("{:?}", violations[0].rule),
        detail,
    }
}

/// Derives structural reasons after an exhausted, solution-free search.
fn diagnose_infeasibility(
    staff: &[Staff],
    options: &SolveOptions,
) -> Vec<UnsatisfiableConstraint> {
    let mut causes = Vec::new();

    for person in staff {
        if !person.night_possible {
            continue;
        }
        let permitted = person.permitted_night_weekdays();
        let required = person.min_consecutive_nights();
        if permitted > 0 && permitted < required {
            causes.push(UnsatisfiableConstraint::MinConsecutiveUnreachable {
                staff: person.identifier.clone(),
                permitted,
                required,
            });
        }
        if options.enforce_min_participation && person.blocked_start_weekdays.len() >= 5 {
            causes.push(UnsatisfiableConstraint::ParticipationConflict {
                staff: person.identifier.clone(),
            });
        }
    }

    if causes.is_empty() {
        causes.push(UnsatisfiableConstraint::Generic);
    }
    causes
}
