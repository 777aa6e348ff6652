//! Schedule (solution) model.
//!
//! A schedule is the full set of staff-to-slot assignments for one
//! planning period. It is constructed by the engine and is immutable
//! from the caller's perspective; the validator re-derives every rule
//! from it independently of the solver.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::shift::{ShiftKind, Slot};
use super::staff::Staff;

/// Assignment of one staff member to one shift slot.
///
/// `paired` is true iff the slot is a night held by two staff members
/// simultaneously; daytime assignments are never paired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub staff_id: String,
    pub date: NaiveDate,
    pub kind: ShiftKind,
    pub paired: bool,
}

impl Assignment {
    /// Creates an unpaired assignment.
    pub fn new(staff_id: impl Into<String>, date: NaiveDate, kind: ShiftKind) -> Self {
        Self {
            staff_id: staff_id.into(),
            date,
            kind,
            paired: false,
        }
    }

    /// Sets the paired flag.
    pub fn with_paired(mut self, paired: bool) -> Self {
        self.paired = paired;
        self
    }

    /// The slot this assignment fills.
    pub fn slot(&self) -> Slot {
        Slot::new(self.date, self.kind)
    }

    /// Whether this assignment is a night shift.
    pub fn is_night(&self) -> bool {
        self.kind.is_night()
    }

    /// Whether this assignment is a weekend daytime shift.
    pub fn is_weekend_day(&self) -> bool {
        self.kind.is_weekend_day()
    }
}

/// A complete roster for a planning period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// First covered date.
    pub start: NaiveDate,
    /// Last covered date (inclusive).
    pub end: NaiveDate,
    /// All assignments, in no particular order.
    pub assignments: Vec<Assignment>,
}

impl Schedule {
    /// Creates an empty schedule for a date range.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            assignments: Vec::new(),
        }
    }

    /// Adds an assignment.
    pub fn add(&mut self, assignment: Assignment) {
        self.assignments.push(assignment);
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the schedule holds no assignments.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// All assignments of one staff member.
    pub fn for_staff<'a>(&'a self, staff_id: &'a str) -> impl Iterator<Item = &'a Assignment> {
        self.assignments.iter().filter(move |a| a.staff_id == staff_id)
    }

    /// All assignments filling a given slot.
    pub fn on_slot(&self, date: NaiveDate, kind: ShiftKind) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.date == date && a.kind == kind)
            .collect()
    }

    /// All assignments on the night beginning at `date`.
    pub fn night_staff(&self, date: NaiveDate) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.date == date && a.is_night())
            .collect()
    }

    /// Dates on which a staff member works anything.
    pub fn dates_worked(&self, staff_id: &str) -> BTreeSet<NaiveDate> {
        self.for_staff(staff_id).map(|a| a.date).collect()
    }

    /// Number of weekend daytime shifts for a staff member.
    pub fn weekend_count(&self, staff_id: &str) -> u32 {
        self.for_staff(staff_id)
            .filter(|a| a.is_weekend_day())
            .count() as u32
    }

    /// Effective night count for fairness: role-weighted by pairing.
    pub fn effective_nights(&self, staff: &Staff) -> f64 {
        self.for_staff(&staff.identifier)
            .filter(|a| a.is_night())
            .map(|a| staff.night_weight(a.paired))
            .sum()
    }

    /// Combined duty count: weekend shifts plus effective nights.
    pub fn total_duties(&self, staff: &Staff) -> f64 {
        self.weekend_count(&staff.identifier) as f64 + self.effective_nights(staff)
    }

    /// Assignments ordered for export: date ascending, then kind order.
    pub fn export_rows(&self) -> Vec<Assignment> {
        let mut rows = self.assignments.clone();
        rows.sort_by(|a, b| {
            (a.date, a.kind, a.staff_id.as_str()).cmp(&(b.date, b.kind, b.staff_id.as_str()))
        });
        rows
    }

    /// Redundant date → kind → staff lookup table.
    pub fn slot_map(&self) -> BTreeMap<NaiveDate, BTreeMap<ShiftKind, Vec<String>>> {
        let mut map: BTreeMap<NaiveDate, BTreeMap<ShiftKind, Vec<String>>> = BTreeMap::new();
        for row in self.export_rows() {
            map.entry(row.date)
                .or_default()
                .entry(row.kind)
                .or_default()
                .push(row.staff_id);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::staff::Role;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::new(d(2026, 4, 1), d(2026, 4, 7));
        s.add(Assignment::new("anna", d(2026, 4, 4), ShiftKind::Sat10To21));
        s.add(
            Assignment::new("bert", d(2026, 4, 1), ShiftKind::NightWedThu).with_paired(true),
        );
        s.add(
            Assignment::new("carla", d(2026, 4, 1), ShiftKind::NightWedThu).with_paired(true),
        );
        s.add(Assignment::new("bert", d(2026, 4, 2), ShiftKind::NightThuFri));
        s
    }

    #[test]
    fn test_queries() {
        let s = sample_schedule();
        assert_eq!(s.len(), 4);
        assert_eq!(s.for_staff("bert").count(), 2);
        assert_eq!(s.on_slot(d(2026, 4, 1), ShiftKind::NightWedThu).len(), 2);
        assert_eq!(s.night_staff(d(2026, 4, 1)).len(), 2);
        assert_eq!(s.night_staff(d(2026, 4, 4)).len(), 0);
        assert_eq!(s.weekend_count("anna"), 1);
        assert_eq!(s.weekend_count("bert"), 0);
        assert_eq!(
            s.dates_worked("bert"),
            BTreeSet::from([d(2026, 4, 1), d(2026, 4, 2)])
        );
    }

    #[test]
    fn test_effective_nights() {
        let s = sample_schedule();
        let bert = Staff::new("bert", "Bert");
        // One paired night (0.5) plus one solo night (1.0).
        assert!((s.effective_nights(&bert) - 1.5).abs() < 1e-10);

        // Apprentices earn full credit even when paired.
        let carla = Staff::new("carla", "Carla").with_role(Role::Azubi);
        assert!((s.effective_nights(&carla) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_total_duties() {
        let s = sample_schedule();
        let anna = Staff::new("anna", "Anna");
        assert!((s.total_duties(&anna) - 1.0).abs() < 1e-10);
        let bert = Staff::new("bert", "Bert");
        assert!((s.total_duties(&bert) - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_export_row_order() {
        let s = sample_schedule();
        let rows = s.export_rows();
        assert_eq!(rows.len(), 4);
        // Date ascending, then the canonical kind order within a date.
        assert_eq!(rows[0].date, d(2026, 4, 1));
        assert_eq!(rows[0].staff_id, "bert");
        assert_eq!(rows[1].staff_id, "carla");
        assert_eq!(rows[2].date, d(2026, 4, 2));
        assert_eq!(rows[3].kind, ShiftKind::Sat10To21);
    }

    #[test]
    fn test_slot_map() {
        let s = sample_schedule();
        let map = s.slot_map();
        assert_eq!(
            map[&d(2026, 4, 1)][&ShiftKind::NightWedThu],
            vec!["bert".to_string(), "carla".to_string()]
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let s = sample_schedule();
        let json = serde_json::to_string(&s).unwrap();
        let back: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        // Pair flags survive exactly.
        assert!(back.on_slot(d(2026, 4, 1), ShiftKind::NightWedThu)
            .iter()
            .all(|a| a.paired));
    }
}
