#![deny(unsafe_code)]
#![deny(warnings)]
//! Civil calendar conversions using O(1) algorithms
//!
//! Implements Howard Hinnant's civil_from_days / days_from_civil algorithms
//! (the same ones used by C++20 `<chrono>`), extended with weekday
//! computation for the DST transition rules.
//! Reference: <http://howardhinnant.github.io/date_algorithms.html>

/// Seconds per civil day.
pub const SECS_PER_DAY: i64 = 86_400;

/// A broken-down civil date/time (proleptic Gregorian, no timezone).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CivilDateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Check if year is a leap year (Gregorian calendar)
#[cfg(test)]
fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Decompose an epoch-second count into a civil date/time.
///
/// Negative inputs (pre-1970) are handled via euclidean division so the
/// time-of-day buckets stay in range.
pub fn civil_from_unix(secs: i64) -> CivilDateTime {
    let days = secs.div_euclid(SECS_PER_DAY);
    let secs_today = secs.rem_euclid(SECS_PER_DAY);

    let (year, month, day) = civil_from_days(days);

    CivilDateTime {
        year,
        month,
        day,
        hour: (secs_today / 3_600) as u8,
        minute: ((secs_today % 3_600) / 60) as u8,
        second: (secs_today % 60) as u8,
    }
}

/// Compose an epoch-second count from civil date/time components.
pub fn unix_from_civil(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> i64 {
    days_from_civil(year, month, day) * SECS_PER_DAY
        + (hour as i64) * 3_600
        + (minute as i64) * 60
        + (second as i64)
}

/// Convert days since the Unix epoch to a civil date (year, month, day).
///
/// Hinnant's civil_from_days: shift the epoch to 0000-03-01 so the leap
/// day lands at the end of the shifted year, then work in 400-year eras.
pub(crate) fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + 719_468; // days from 0000-03-01 to 1970-01-01
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64; // day of era [0, 146096]
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365; // year of era [0, 399]
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of shifted year [0, 365]
    let mp = (5 * doy + 2) / 153; // shifted month [0, 11], 0 = March
    let d = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = if m <= 2 { y + 1 } else { y };
    (year as i32, m, d)
}

/// Convert a civil date (year, month, day) to days since the Unix epoch.
pub(crate) fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let y = year as i64;
    let m = month as i64;
    let d = day as i64;

    let (y, m) = if m <= 2 { (y - 1, m + 9) } else { (y, m - 3) };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400; // year of era [0, 399]
    let doy = (153 * m + 2) / 5 + d - 1; // day of shifted year [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // day of era [0, 146096]

    era * 146_097 + doe - 719_468
}

/// Day of week for a days-since-epoch count, 0 = Sunday .. 6 = Saturday.
///
/// 1970-01-01 was a Thursday (4).
pub(crate) fn weekday_from_days(days: i64) -> u8 {
    (days + 4).rem_euclid(7) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leap_years() {
        assert!(is_leap_year(2000)); // divisible by 400
        assert!(is_leap_year(2024)); // divisible by 4
        assert!(!is_leap_year(1900)); // divisible by 100, not 400
        assert!(!is_leap_year(2023));
        assert!(!is_leap_year(2100));
    }

    #[test]
    fn unix_epoch() {
        let dt = civil_from_unix(0);
        assert_eq!(
            dt,
            CivilDateTime {
                year: 1970,
                month: 1,
                day: 1,
                hour: 0,
                minute: 0,
                second: 0
            }
        );
    }

    #[test]
    fn round_trips() {
        let samples = [
            0i64,          // 1970-01-01 00:00:00
            946_684_800,   // 2000-01-01 00:00:00
            1_447_964_740, // 2015-11-19 20:25:40
            2_147_483_647, // 2038-01-19 03:14:07 (32-bit limit)
            4_102_444_800, // 2100-01-01 00:00:00
        ];
        for &secs in &samples {
            let dt = civil_from_unix(secs);
            let back = unix_from_civil(dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second);
            assert_eq!(secs, back, "round trip failed for {}", secs);
        }
    }

    #[test]
    fn leap_day_2024() {
        let secs = unix_from_civil(2024, 2, 29, 0, 0, 0);
        let dt = civil_from_unix(secs);
        assert_eq!((dt.year, dt.month, dt.day), (2024, 2, 29));
    }

    #[test]
    fn end_of_century() {
        let secs = unix_from_civil(1999, 12, 31, 23, 59, 59);
        let dt = civil_from_unix(secs);
        assert_eq!((dt.year, dt.month, dt.day), (1999, 12, 31));
        assert_eq!((dt.hour, dt.minute, dt.second), (23, 59, 59));
    }

    #[test]
    fn weekdays() {
        // 1970-01-01 was a Thursday
        assert_eq!(weekday_from_days(0), 4);
        // 2015-11-19 was a Thursday
        assert_eq!(weekday_from_days(days_from_civil(2015, 11, 19)), 4);
        // 2025-03-30 was a Sunday
        assert_eq!(weekday_from_days(days_from_civil(2025, 3, 30)), 0);
        // 1969-12-31 was a Wednesday
        assert_eq!(weekday_from_days(-1), 3);
    }
}
