//! Depth-first branch-and-bound search over a [`CpModel`].
//!
//! # Algorithm
//!
//! 1. Bounds propagation over every linear constraint to a fixpoint,
//!    including enforcement-literal reasoning.
//! 2. Chronological DFS: branch on the first unassigned variable in
//!    creation order with a seeded polarity heuristic.
//! 3. Branch-and-bound: subtrees whose admissible objective lower bound
//!    cannot beat the incumbent are cut.
//!
//! The search is exact: an exhausted tree proves optimality or
//! infeasibility. A wall-clock budget and a cooperative cancellation
//! flag bound the effort; hitting either returns the best incumbent.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::model::{BoolVar, CpModel, LinearConstraint};

/// Search configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Wall-clock budget.
    pub time_limit: Duration,
    /// Branching seed; `None` uses a fixed default.
    pub seed: Option<u64>,
    /// Cooperative cancellation flag, polled during search.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(120),
            seed: None,
            cancel: None,
        }
    }
}

impl SolverConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wall-clock budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    /// Sets the branching seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Attaches a cancellation flag.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// How the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// Tree exhausted with an incumbent: it is optimal.
    Optimal,
    /// Budget or cancellation hit with an incumbent in hand.
    Feasible,
    /// Tree exhausted without any solution.
    Infeasible,
    /// Budget or cancellation hit before any solution was found.
    Unknown,
}

/// Search result.
#[derive(Debug, Clone)]
pub struct CpSolution {
    pub status: SearchStatus,
    /// Best assignment found, if any.
    pub values: Option<Vec<bool>>,
    /// Objective of the best assignment.
    pub objective: Option<i64>,
    /// Whether cancellation ended the search.
    pub cancelled: bool,
    /// Explored node count.
    pub nodes: u64,
}

impl CpSolution {
    /// Whether any solution was found.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SearchStatus::Optimal | SearchStatus::Feasible)
    }

    /// Value of a variable in the best assignment.
    pub fn value(&self, var: BoolVar) -> bool {
        self.values
            .as_ref()
            .is_some_and(|values| values[var.index()])
    }
}

/// Exact DFS solver for [`CpModel`].
#[derive(Debug, Default)]
pub struct CpSolver;

impl CpSolver {
    /// Creates a solver.
    pub fn new() -> Self {
        Self
    }

    /// Solves without observing intermediate incumbents.
    pub fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        self.solve_with_callback(model, config, |_, _| {})
    }

    /// Solves, invoking the callback on every improving incumbent.
    pub fn solve_with_callback(
        &self,
        model: &CpModel,
        config: &SolverConfig,
        mut on_incumbent: impl FnMut(&[bool], i64),
    ) -> CpSolution {
        let mut search = Search::new(model, config);
        let deadline = Instant::now() + config.time_limit;

        let mut best: Option<(Vec<bool>, i64)> = None;
        let mut exhausted = false;
        let mut cancelled = false;

        loop {
            search.nodes += 1;
            if let Some(flag) = &config.cancel {
                if flag.load(Ordering::Relaxed) {
                    cancelled = true;
                    break;
                }
            }
            if search.nodes % BUDGET_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                break;
            }

            if !search.propagate() {
                if !search.backtrack() {
                    exhausted = true;
                    break;
                }
                continue;
            }
            let bounded_out = best.as_ref().is_some_and(|(_, incumbent)| {
                model.objective_lower_bound(&search.values) >= *incumbent
            });
            if bounded_out {
                if !search.backtrack() {
                    exhausted = true;
                    break;
                }
                continue;
            }

            match search.next_unassigned() {
                Some(var) => {
                    let polarity = search.polarity();
                    search.decide(var, polarity);
                }
                None => {
                    let assignment: Vec<bool> = search
                        .values
                        .iter()
                        .map(|v| v.unwrap_or(false))
                        .collect();
                    // Propagation keeps partial states consistent; the
                    // final check guards the half-reified semantics.
                    if model.is_satisfied(&assignment) {
                        let objective = model.objective_value(&assignment);
                        let improved = best
                            .as_ref()
                            .is_none_or(|(_, incumbent)| objective < *incumbent);
                        if improved {
                            on_incumbent(&assignment, objective);
                            best = Some((assignment, objective));
                        }
                    }
                    if !search.backtrack() {
                        exhausted = true;
                        break;
                    }
                }
            }
        }

        let status = match (&best, exhausted) {
            (Some(_), true) => SearchStatus::Optimal,
            (Some(_), false) => SearchStatus::Feasible,
            (None, true) => SearchStatus::Infeasible,
            (None, false) => SearchStatus::Unknown,
        };
        let (values, objective) = match best {
            Some((values, objective)) => (Some(values), Some(objective)),
            None => (None, None),
        };

        CpSolution {
            status,
            values,
            objective,
            cancelled,
            nodes: search.nodes,
        }
    }
}

const BUDGET_CHECK_INTERVAL: u64 = 64;

/// Probability of branching false-first instead of true-first.
const POLARITY_FLIP: f64 = 0.1;

const DEFAULT_SEED: u64 = 0x5eed;

struct Decision {
    var: usize,
    trail_mark: usize,
    first: bool,
    flipped: bool,
}

struct Search<'a> {
    model: &'a CpModel,
    values: Vec<Option<bool>>,
    trail: Vec<usize>,
    decisions: Vec<Decision>,
    rng: SmallRng,
    nodes: u64,
}

enum Propagated {
    Stable,
    Changed,
    Conflict,
}

impl<'a> Search<'a> {
    fn new(model: &'a CpModel, config: &SolverConfig) -> Self {
        Self {
            model,
            values: vec![None; model.var_count()],
            trail: Vec::new(),
            decisions: Vec::new(),
            rng: SmallRng::seed_from_u64(config.seed.unwrap_or(DEFAULT_SEED)),
            nodes: 0,
        }
    }

    fn assign(&mut self, var: usize, value: bool) -> bool {
        match self.values[var] {
            Some(existing) => existing == value,
            None => {
                self.values[var] = Some(value);
                self.trail.push(var);
                true
            }
        }
    }

    /// Propagates all constraints to a fixpoint. Returns false on conflict.
    fn propagate(&mut self) -> bool {
        loop {
            let mut changed = false;
            for index in 0..self.model.constraints().len() {
                match self.propagate_constraint(index) {
                    Propagated::Conflict => return false,
                    Propagated::Changed => changed = true,
                    Propagated::Stable => {}
                }
            }
            if !changed {
                return true;
            }
        }
    }

    fn propagate_constraint(&mut self, index: usize) -> Propagated {
        // Copy out the &'a reference so constraint borrows are not tied
        // to `self` while we assign below.
        let model: &'a CpModel = self.model;
        let constraint: &'a LinearConstraint = &model.constraints()[index];
        let (lo, hi) = (constraint.lo, constraint.hi);

        // Attainable interval under the current partial assignment.
        let mut cur_lo = 0;
        let mut cur_hi = 0;
        for &(coef, var) in &constraint.terms {
            match self.values[var.0] {
                Some(true) => {
                    cur_lo += coef;
                    cur_hi += coef;
                }
                Some(false) => {}
                None => {
                    cur_lo += coef.min(0);
                    cur_hi += coef.max(0);
                }
            }
        }
        let impossible = cur_lo > hi || cur_hi < lo;

        if let Some(enforce) = constraint.enforce {
            match self.values[enforce.var.0] {
                // Disabled constraint.
                Some(value) if value != enforce.positive => return Propagated::Stable,
                Some(_) => {}
                None => {
                    if impossible {
                        // The guarded constraint cannot hold anymore, so
                        // the guard itself must be false.
                        return if self.assign(enforce.var.0, !enforce.positive) {
                            Propagated::Changed
                        } else {
                            Propagated::Conflict
                        };
                    }
                    return Propagated::Stable;
                }
            }
        }

        if impossible {
            return Propagated::Conflict;
        }

        // Force unassigned variables whose other value is unattainable.
        let mut changed = false;
        for &(coef, var) in &constraint.terms {
            if self.values[var.0].is_some() {
                continue;
            }
            let lo_true = cur_lo + coef.max(0);
            let hi_true = cur_hi + coef.min(0);
            let true_ok = lo_true <= hi && hi_true >= lo;
            let lo_false = cur_lo - coef.min(0);
            let hi_false = cur_hi - coef.max(0);
            let false_ok = lo_false <= hi && hi_false >= lo;

            match (true_ok, false_ok) {
                (false, false) => return Propagated::Conflict,
                (true, false) => {
                    self.assign(var.0, true);
                    cur_lo = lo_true;
                    cur_hi = hi_true;
                    changed = true;
                }
                (false, true) => {
                    self.assign(var.0, false);
                    cur_lo = lo_false;
                    cur_hi = hi_false;
                    changed = true;
                }
                (true, true) => {}
            }
        }

        if changed {
            Propagated::Changed
        } else {
            Propagated::Stable
        }
    }

    fn next_unassigned(&self) -> Option<usize> {
        self.values.iter().position(|v| v.is_none())
    }

    fn polarity(&mut self) -> bool {
        !self.rng.random_bool(POLARITY_FLIP)
    }

    fn decide(&mut self, var: usize, value: bool) {
        self.decisions.push(Decision {
            var,
            trail_mark: self.trail.len(),
            first: value,
            flipped: false,
        });
        self.assign(var, value);
    }

    /// Rewinds to the deepest decision with an untried branch.
    fn backtrack(&mut self) -> bool {
        while let Some(mut decision) = self.decisions.pop() {
            while self.trail.len() > decision.trail_mark {
                if let Some(var) = self.trail.pop() {
                    self.values[var] = None;
                }
            }
            if !decision.flipped {
                decision.flipped = true;
                let retry = !decision.first;
                let var = decision.var;
                self.decisions.push(decision);
                self.assign(var, retry);
                return true;
            }
        }
        false
    }
}
