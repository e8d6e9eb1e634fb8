#![deny(unsafe_code)]
#![deny(warnings)]
//! Rule-based DST resolution
//!
//! A [`DstRule`] pairs two [`TransitionRule`] descriptors in the
//! "last Sunday of March at 03:00" style. The daylight window for the
//! current year is recomputed from the descriptors on every resolution;
//! DST status can change mid-session without a restart, so nothing is
//! cached across evaluations.
//!
//! The effective offset is one explicit formula: the user-configured base
//! offset plus a flat one-hour bump while daylight time is active. The
//! rules' own offset minutes only place the transition window on the
//! calendar; they are never added to the base offset.

use crate::time::calendar::{civil_from_unix, days_from_civil, weekday_from_days, SECS_PER_DAY};

/// Week-of-month selector for a transition descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Week {
    Last,
    First,
    Second,
    Third,
    Fourth,
}

/// Day-of-week selector, numbered to match the calendar module
/// (0 = Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Weekday {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

/// One transition descriptor: "the `week`-th `weekday` of `month` at
/// `hour` o'clock local, after which `offset_minutes` applies".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransitionRule {
    pub week: Week,
    pub weekday: Weekday,
    /// 1 = January .. 12 = December
    pub month: u8,
    pub hour: u8,
    /// UTC offset in effect after this transition, minutes
    pub offset_minutes: i16,
}

impl TransitionRule {
    /// Local-naive instant (seconds) at which this rule takes effect in
    /// the given year.
    fn instant_in(&self, year: i32) -> i64 {
        // For "Last" count back one week from the first occurrence in
        // the following month.
        let (year, month) = match self.week {
            Week::Last if self.month == 12 => (year + 1, 1),
            Week::Last => (year, self.month + 1),
            _ => (year, self.month),
        };
        let first_of_month = days_from_civil(year, month, 1);
        let target = self.weekday as i64;
        let mut days = first_of_month
            + (target - weekday_from_days(first_of_month) as i64).rem_euclid(7);
        days += match self.week {
            Week::Last => -7,
            Week::First => 0,
            Week::Second => 7,
            Week::Third => 14,
            Week::Fourth => 21,
        };
        days * SECS_PER_DAY + self.hour as i64 * 3_600
    }
}

/// A daylight/standard rule pair. Immutable configuration, loaded once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DstRule {
    pub daylight: TransitionRule,
    pub standard: TransitionRule,
}

impl DstRule {
    /// Eastern European Time (Vilnius): daylight from the last Sunday of
    /// March 03:00 (+3 h), standard from the last Sunday of October
    /// 02:00 (+2 h). The firmware's built-in zone.
    pub const EASTERN_EUROPEAN: DstRule = DstRule {
        daylight: TransitionRule {
            week: Week::Last,
            weekday: Weekday::Sunday,
            month: 3,
            hour: 3,
            offset_minutes: 180,
        },
        standard: TransitionRule {
            week: Week::Last,
            weekday: Weekday::Sunday,
            month: 10,
            hour: 2,
            offset_minutes: 120,
        },
    };

    /// Whether daylight time is in effect at the given instant.
    ///
    /// The instant is converted to a local-naive one using the standard
    /// offset, then tested against this year's daylight window. Southern
    /// hemisphere rules (standard transition earlier in the year than
    /// daylight) invert the window.
    pub fn is_daylight(&self, now_unix_epoch: i64) -> bool {
        let local = now_unix_epoch + self.standard.offset_minutes as i64 * 60;
        let year = civil_from_unix(local).year;
        let daylight_start = self.daylight.instant_in(year);
        let standard_start = self.standard.instant_in(year);
        if standard_start > daylight_start {
            local >= daylight_start && local < standard_start
        } else {
            local >= daylight_start || local < standard_start
        }
    }

    /// Effective UTC offset in hours for the given instant.
    ///
    /// `base + 1.0` while daylight is active and enabled by the user,
    /// `base` otherwise. Never applies daylight adjustment when the user
    /// disabled it, regardless of calendar position.
    pub fn resolve(&self, now_unix_epoch: i64, base_offset_hours: f32, dst_enabled: bool) -> f32 {
        if dst_enabled && self.is_daylight(now_unix_epoch) {
            base_offset_hours + 1.0
        } else {
            base_offset_hours
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::calendar::unix_from_civil;

    const EET: DstRule = DstRule::EASTERN_EUROPEAN;

    /// Unix instant whose EET local-naive representation is the given
    /// civil time (standard offset +120 min).
    fn utc_for_local(y: i32, mo: u8, d: u8, h: u8, mi: u8, s: u8) -> i64 {
        unix_from_civil(y, mo, d, h, mi, s) - 120 * 60
    }

    #[test]
    fn midsummer_is_daylight_midwinter_is_not() {
        assert!(EET.is_daylight(utc_for_local(2025, 7, 15, 12, 0, 0)));
        assert!(!EET.is_daylight(utc_for_local(2025, 1, 15, 12, 0, 0)));
    }

    #[test]
    fn spring_transition_boundary() {
        // Last Sunday of March 2025 is the 30th; daylight starts 03:00.
        assert!(!EET.is_daylight(utc_for_local(2025, 3, 30, 2, 59, 59)));
        assert!(EET.is_daylight(utc_for_local(2025, 3, 30, 3, 0, 0)));
    }

    #[test]
    fn autumn_transition_boundary() {
        // Last Sunday of October 2025 is the 26th; standard resumes 02:00.
        assert!(EET.is_daylight(utc_for_local(2025, 10, 26, 1, 59, 59)));
        assert!(!EET.is_daylight(utc_for_local(2025, 10, 26, 2, 0, 0)));
    }

    #[test]
    fn window_recomputed_per_year() {
        // Last Sunday of March 2026 is the 29th.
        assert!(!EET.is_daylight(utc_for_local(2026, 3, 29, 2, 0, 0)));
        assert!(EET.is_daylight(utc_for_local(2026, 3, 29, 4, 0, 0)));
    }

    #[test]
    fn resolve_is_flat_one_hour_bump() {
        // The rule pair encodes +180/+120 minutes, but the effective
        // offset is base plus exactly one hour.
        let july = utc_for_local(2025, 7, 15, 12, 0, 0);
        assert_eq!(EET.resolve(july, 2.0, true), 3.0);
        let january = utc_for_local(2025, 1, 15, 12, 0, 0);
        assert_eq!(EET.resolve(january, 2.0, true), 2.0);
    }

    #[test]
    fn user_disable_overrides_calendar() {
        let july = utc_for_local(2025, 7, 15, 12, 0, 0);
        assert_eq!(EET.resolve(july, 2.0, false), 2.0);
    }

    #[test]
    fn offset_tracks_transition_between_evaluations() {
        // Two loop evaluations seconds apart straddling the spring
        // boundary must disagree: the effective offset is a function of
        // the instant alone and has to be re-resolved per evaluation,
        // never carried over from the previous iteration.
        let before = utc_for_local(2025, 3, 30, 2, 59, 58);
        let after = before + 4;
        assert_eq!(EET.resolve(before, 2.0, true), 2.0);
        assert_eq!(EET.resolve(after, 2.0, true), 3.0);
    }

    #[test]
    fn resolve_is_idempotent_at_an_instant() {
        let instant = utc_for_local(2025, 6, 1, 9, 30, 0);
        assert_eq!(
            EET.resolve(instant, 2.0, true),
            EET.resolve(instant, 2.0, true)
        );
    }

    #[test]
    fn southern_hemisphere_window_inverts() {
        // New Zealand style: daylight from the last Sunday of September
        // 02:00, standard from the first Sunday of April 03:00.
        let nz = DstRule {
            daylight: TransitionRule {
                week: Week::Last,
                weekday: Weekday::Sunday,
                month: 9,
                hour: 2,
                offset_minutes: 13 * 60,
            },
            standard: TransitionRule {
                week: Week::First,
                weekday: Weekday::Sunday,
                month: 4,
                hour: 3,
                offset_minutes: 12 * 60,
            },
        };
        let local = |y, mo, d, h| unix_from_civil(y, mo, d, h, 0, 0) - 12 * 3_600;
        assert!(nz.is_daylight(local(2025, 1, 15, 12))); // southern summer
        assert!(!nz.is_daylight(local(2025, 6, 15, 12))); // southern winter
        assert!(nz.is_daylight(local(2025, 12, 15, 12)));
    }

    #[test]
    fn fixed_week_selectors() {
        // US style: second Sunday of March, first Sunday of November.
        let us = DstRule {
            daylight: TransitionRule {
                week: Week::Second,
                weekday: Weekday::Sunday,
                month: 3,
                hour: 2,
                offset_minutes: -4 * 60,
            },
            standard: TransitionRule {
                week: Week::First,
                weekday: Weekday::Sunday,
                month: 11,
                hour: 2,
                offset_minutes: -5 * 60,
            },
        };
        // Second Sunday of March 2025 is the 9th.
        let local = |y, mo, d, h| unix_from_civil(y, mo, d, h, 0, 0) + 5 * 3_600;
        assert!(!us.is_daylight(local(2025, 3, 9, 1)));
        assert!(us.is_daylight(local(2025, 3, 9, 3)));
        // First Sunday of November 2025 is the 2nd.
        assert!(us.is_daylight(local(2025, 11, 2, 1)));
        assert!(!us.is_daylight(local(2025, 11, 2, 3)));
    }
}
