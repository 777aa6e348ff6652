//! Shift kinds and shift slots.
//!
//! The clinic runs three Saturday daytime services, three Sunday daytime
//! services, and one night service per calendar night. Night kinds are
//! indexed by the weekday on which the night begins; the slot belongs to
//! the date the night starts.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the thirteen shift kinds the roster covers.
///
/// The variant order is the canonical export order: Saturday daytime,
/// Sunday daytime, then nights (`Ord` follows declaration order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShiftKind {
    /// Saturday 10-21: reception plus on-call.
    #[serde(rename = "Sa_10-21")]
    Sat10To21,
    /// Saturday 10-22: on-call.
    #[serde(rename = "Sa_10-22")]
    Sat10To22,
    /// Saturday 10-19: apprentice service.
    #[serde(rename = "Sa_10-19")]
    Sat10To19,
    #[serde(rename = "So_8-20")]
    Sun8To20,
    /// Sunday 10-22: on-call.
    #[serde(rename = "So_10-22")]
    Sun10To22,
    /// Sunday 8-20:30: apprentice (on-site morning, on-call afternoon).
    #[serde(rename = "So_8-20:30")]
    Sun8To2030,
    /// Sun→Mon night (vet on-site).
    #[serde(rename = "N_So-Mo")]
    NightSunMon,
    /// Mon→Tue night (vet on-site).
    #[serde(rename = "N_Mo-Di")]
    NightMonTue,
    #[serde(rename = "N_Di-Mi")]
    NightTueWed,
    #[serde(rename = "N_Mi-Do")]
    NightWedThu,
    #[serde(rename = "N_Do-Fr")]
    NightThuFri,
    #[serde(rename = "N_Fr-Sa")]
    NightFriSat,
    #[serde(rename = "N_Sa-So")]
    NightSatSun,
}

impl ShiftKind {
    /// All kinds in export order.
    pub const ALL: [ShiftKind; 13] = [
        ShiftKind::Sat10To21,
        ShiftKind::Sat10To22,
        ShiftKind::Sat10To19,
        ShiftKind::Sun8To20,
        ShiftKind::Sun10To22,
        ShiftKind::Sun8To2030,
        ShiftKind::NightSunMon,
        ShiftKind::NightMonTue,
        ShiftKind::NightTueWed,
        ShiftKind::NightWedThu,
        ShiftKind::NightThuFri,
        ShiftKind::NightFriSat,
        ShiftKind::NightSatSun,
    ];

    /// The three Saturday daytime kinds.
    pub const SATURDAY: [ShiftKind; 3] = [
        ShiftKind::Sat10To21,
        ShiftKind::Sat10To22,
        ShiftKind::Sat10To19,
    ];

    /// The three Sunday daytime kinds.
    pub const SUNDAY: [ShiftKind; 3] = [
        ShiftKind::Sun8To20,
        ShiftKind::Sun10To22,
        ShiftKind::Sun8To2030,
    ];

    /// The night kind beginning on the given weekday.
    pub fn night_for(weekday: Weekday) -> ShiftKind {
        match weekday {
            Weekday::Sun => ShiftKind::NightSunMon,
            Weekday::Mon => ShiftKind::NightMonTue,
            Weekday::Tue => ShiftKind::NightTueWed,
            Weekday::Wed => ShiftKind::NightWedThu,
            Weekday::Thu => ShiftKind::NightThuFri,
            Weekday::Fri => ShiftKind::NightFriSat,
            Weekday::Sat => ShiftKind::NightSatSun,
        }
    }

    /// Whether this is a night kind.
    pub fn is_night(self) -> bool {
        matches!(
            self,
            ShiftKind::NightSunMon
                | ShiftKind::NightMonTue
                | ShiftKind::NightTueWed
                | ShiftKind::NightWedThu
                | ShiftKind::NightThuFri
                | ShiftKind::NightFriSat
                | ShiftKind::NightSatSun
        )
    }

    /// Whether this is a Saturday daytime kind.
    pub fn is_saturday_day(self) -> bool {
        matches!(
            self,
            ShiftKind::Sat10To21 | ShiftKind::Sat10To22 | ShiftKind::Sat10To19
        )
    }

    /// Whether this is a Sunday daytime kind.
    pub fn is_sunday_day(self) -> bool {
        matches!(
            self,
            ShiftKind::Sun8To20 | ShiftKind::Sun10To22 | ShiftKind::Sun8To2030
        )
    }

    /// Whether this is any weekend daytime kind.
    pub fn is_weekend_day(self) -> bool {
        self.is_saturday_day() || self.is_sunday_day()
    }

    /// Sun→Mon and Mon→Tue nights have a veterinarian on-site; the
    /// lone-worker rules do not apply there.
    pub fn is_vet_on_site(self) -> bool {
        matches!(self, ShiftKind::NightSunMon | ShiftKind::NightMonTue)
    }

    /// Night kinds without the on-site veterinarian.
    pub fn is_regular_night(self) -> bool {
        self.is_night() && !self.is_vet_on_site()
    }

    /// Wire label, identical to the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            ShiftKind::Sat10To21 => "Sa_10-21",
            ShiftKind::Sat10To22 => "Sa_10-22",
            ShiftKind::Sat10To19 => "Sa_10-19",
            ShiftKind::Sun8To20 => "So_8-20",
            ShiftKind::Sun10To22 => "So_10-22",
            ShiftKind::Sun8To2030 => "So_8-20:30",
            ShiftKind::NightSunMon => "N_So-Mo",
            ShiftKind::NightMonTue => "N_Mo-Di",
            ShiftKind::NightTueWed => "N_Di-Mi",
            ShiftKind::NightWedThu => "N_Mi-Do",
            ShiftKind::NightThuFri => "N_Do-Fr",
            ShiftKind::NightFriSat => "N_Fr-Sa",
            ShiftKind::NightSatSun => "N_Sa-So",
        }
    }
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A shift slot that must be filled: a kind on a concrete date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    /// Calendar date. For nights this is the date the night begins.
    pub date: NaiveDate,
    pub kind: ShiftKind,
}

impl Slot {
    /// Creates a slot.
    pub fn new(date: NaiveDate, kind: ShiftKind) -> Self {
        Self { date, kind }
    }

    /// The night slot for a given date, kind chosen by weekday.
    pub fn night_on(date: NaiveDate) -> Self {
        Self::new(date, ShiftKind::night_for(date.weekday()))
    }

    /// Whether this slot is a night.
    pub fn is_night(&self) -> bool {
        self.kind.is_night()
    }

    /// Whether this slot is weekend daytime.
    pub fn is_weekend_day(&self) -> bool {
        self.kind.is_weekend_day()
    }

    /// The calendar day after this slot's date.
    pub fn next_day(&self) -> NaiveDate {
        self.date.succ_opt().unwrap_or(self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_night_kind_by_weekday() {
        // 2026-04-07 is a Tuesday
        assert_eq!(
            ShiftKind::night_for(d(2026, 4, 7).weekday()),
            ShiftKind::NightTueWed
        );
        // 2026-04-05 is a Sunday
        assert_eq!(
            ShiftKind::night_for(d(2026, 4, 5).weekday()),
            ShiftKind::NightSunMon
        );
        assert_eq!(
            Slot::night_on(d(2026, 4, 4)).kind,
            ShiftKind::NightSatSun
        );
    }

    #[test]
    fn test_classification() {
        assert!(ShiftKind::Sat10To19.is_saturday_day());
        assert!(ShiftKind::Sun8To2030.is_sunday_day());
        assert!(ShiftKind::Sat10To21.is_weekend_day());
        assert!(!ShiftKind::NightTueWed.is_weekend_day());
        assert!(ShiftKind::NightSunMon.is_vet_on_site());
        assert!(!ShiftKind::NightSunMon.is_regular_night());
        assert!(ShiftKind::NightSatSun.is_regular_night());
    }

    #[test]
    fn test_export_order() {
        // Daytime kinds sort before nights, in the documented order.
        let mut kinds = ShiftKind::ALL.to_vec();
        kinds.sort();
        assert_eq!(kinds, ShiftKind::ALL.to_vec());
        assert!(ShiftKind::Sat10To21 < ShiftKind::Sat10To19);
        assert!(ShiftKind::Sun8To2030 < ShiftKind::NightSunMon);
    }

    #[test]
    fn test_labels_round_trip() {
        for kind in ShiftKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.label()));
            let back: ShiftKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn test_slot_next_day() {
        let slot = Slot::night_on(d(2026, 4, 30));
        assert_eq!(slot.next_day(), d(2026, 5, 1));
    }
}
