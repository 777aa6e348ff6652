//! Quarterly on-call roster engine for a small veterinary clinic.
//!
//! Assigns staff to the weekend daytime and night shift slots of a
//! 13-week quarter so that a dense set of hard eligibility, pairing,
//! rest, and capacity rules all hold, while the workload is distributed
//! as evenly as the rules allow within each role group.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Staff`, `ShiftKind`, `Slot`,
//!   `Quarter`, `Assignment`, `Schedule`
//! - **`eligibility`**: The pure may-work oracle with absence folding
//! - **`validation`**: Input integrity checks (duplicate IDs, hours, dates)
//! - **`rules`**: The independent schedule validator and soft penalties
//! - **`cp`**: Boolean CP model, encodings, and the exact search
//! - **`engine`**: The blocking `solve` entry point and result envelope
//!
//! # Architecture
//!
//! The validator and the CP encoding express the same rule set twice on
//! purpose: every solver schedule is re-validated before it is
//! returned, and any disagreement is an internal error rather than a
//! bad roster.
//!
//! # Example
//!
//! ```no_run
//! use notdienst::{solve, SolveOptions};
//! use notdienst::eligibility::VacationMap;
//! use notdienst::models::{Quarter, Role, Staff};
//!
//! let staff = vec![
//!     Staff::new("aa", "Anna Arnold"),
//!     Staff::new("bb", "Bea Brandt").with_role(Role::Azubi).with_reception(true),
//! ];
//! let quarter = Quarter::starting("2026-04-01".parse().unwrap()).unwrap();
//!
//! let outcome = solve(&staff, quarter, &VacationMap::new(), &SolveOptions::new()).unwrap();
//! if let Some(schedule) = &outcome.schedule {
//!     for row in schedule.export_rows() {
//!         println!("{} {} {}", row.date, row.kind, row.staff_id);
//!     }
//! }
//! ```

pub mod cp;
pub mod eligibility;
pub mod engine;
pub mod models;
pub mod rules;
pub mod validation;

pub use engine::{solve, SolveError, SolveOptions, SolveOutcome};
pub use models::{Assignment, Department, Quarter, Role, Schedule, ShiftKind, Slot, Staff};
pub use rules::{PenaltyBreakdown, RuleReport, RuleTag, Violation};
