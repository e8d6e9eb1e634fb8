#![deny(unsafe_code)]
#![deny(warnings)]
//! Wall-clock derivation and display formatting
//!
//! ## Architecture
//! - The network fetch captures a [`CapturedTimeSample`] (seconds since
//!   midnight UTC, full calendar epoch, and the millisecond tick at the
//!   capture instant)
//! - [`TimeService`] owns the latest sample plus the UTC-offset state and
//!   projects a continuously-advancing "now" from the free-running tick
//!   counter, without re-querying the network
//! - Display-ready fields are produced on demand as fixed-width
//!   zero-padded strings; before the first successful fetch every field
//!   reports the `"--"` placeholder rather than a spurious `00`
//!
//! Tick subtraction is done in wrapping u32 arithmetic so counter
//! wraparound (about every 49.7 days) produces the correct small delta.

pub mod calendar;
pub mod httpdate;

use core::fmt::Write;

use heapless::String;

use calendar::{civil_from_unix, SECS_PER_DAY};
pub use httpdate::{CapturedTimeSample, FetchError, TickSource};

/// UTC offset state: the user-configured standard offset plus the
/// DST-resolved effective offset actually applied to displayed time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UtcOffsetState {
    /// User-configured standard offset (hours, may be fractional)
    pub base_offset_hours: f32,
    /// Whether the user enabled daylight-saving adjustment
    pub dst_enabled: bool,
    /// Offset applied to displayed time, recomputed by the DST resolver
    pub effective_offset_hours: f32,
}

/// Owns the captured time sample and offset state; the single source of
/// wall-clock time for the scheduler and the display renderer.
#[derive(Debug)]
pub struct TimeService {
    sample: Option<CapturedTimeSample>,
    offset: UtcOffsetState,
}

impl TimeService {
    pub fn new(base_offset_hours: f32, dst_enabled: bool) -> Self {
        Self {
            sample: None,
            offset: UtcOffsetState {
                base_offset_hours,
                dst_enabled,
                effective_offset_hours: base_offset_hours,
            },
        }
    }

    /// True once at least one fetch has succeeded. Field getters return
    /// placeholders until then.
    pub fn is_time_known(&self) -> bool {
        self.sample.is_some()
    }

    /// True when the current sample came from a low-confidence parse
    /// (unrecognized month name in the date header).
    pub fn is_low_confidence(&self) -> bool {
        self.sample.map(|s| s.low_confidence).unwrap_or(false)
    }

    /// Replace the sample wholesale after a successful fetch.
    pub fn set_sample(&mut self, sample: CapturedTimeSample) {
        self.sample = Some(sample);
    }

    pub fn offset_state(&self) -> UtcOffsetState {
        self.offset
    }

    /// Reconfigure the standard offset (settings change).
    pub fn set_base_offset(&mut self, hours: f32, dst_enabled: bool) {
        self.offset.base_offset_hours = hours;
        self.offset.dst_enabled = dst_enabled;
        self.offset.effective_offset_hours = hours;
    }

    /// Apply the DST-resolved effective offset.
    pub fn set_effective_offset(&mut self, hours: f32) {
        self.offset.effective_offset_hours = hours;
    }

    pub fn effective_offset_hours(&self) -> f32 {
        self.offset.effective_offset_hours
    }

    pub fn base_offset_hours(&self) -> f32 {
        self.offset.base_offset_hours
    }

    pub fn dst_enabled(&self) -> bool {
        self.offset.dst_enabled
    }

    /// Seconds since midnight UTC of the capture day, projected to now.
    /// Monotonically non-decreasing across tick wraparound. Returns 0
    /// before the first fetch.
    pub fn current_epoch(&self, now_tick_ms: u32) -> i64 {
        match self.sample {
            Some(s) => s.local_epoch_secs + elapsed_secs(s.capture_tick_ms, now_tick_ms),
            None => 0,
        }
    }

    /// Full calendar epoch projected to now. Returns 0 before the first
    /// fetch.
    pub fn current_unix_epoch(&self, now_tick_ms: u32) -> i64 {
        match self.sample {
            Some(s) => s.unix_epoch_secs + elapsed_secs(s.capture_tick_ms, now_tick_ms),
            None => 0,
        }
    }

    /// Offset-adjusted seconds within the display day:
    /// `(epoch + offset + 86400) mod 86400`. The `+86400` guards against
    /// negative offsets producing a negative modulus.
    fn day_seconds(&self, now_tick_ms: u32) -> i64 {
        let offset = offset_seconds(self.offset.effective_offset_hours);
        (self.current_epoch(now_tick_ms) + offset + SECS_PER_DAY) % SECS_PER_DAY
    }

    /// 24-hour hour value, or `None` before the first fetch.
    pub fn hour24(&self, now_tick_ms: u32) -> Option<u8> {
        self.sample?;
        Some((self.day_seconds(now_tick_ms) / 3_600) as u8 % 24)
    }

    /// Two-character zero-padded hours, `"--"` before the first fetch.
    pub fn hours(&self, now_tick_ms: u32) -> String<2> {
        match self.hour24(now_tick_ms) {
            Some(h) => pad2(h as i64),
            None => placeholder(),
        }
    }

    /// Two-character zero-padded minutes, `"--"` before the first fetch.
    pub fn minutes(&self, now_tick_ms: u32) -> String<2> {
        if self.sample.is_none() {
            return placeholder();
        }
        pad2((self.day_seconds(now_tick_ms) % 3_600) / 60)
    }

    /// Two-character zero-padded seconds, `"--"` before the first fetch.
    pub fn seconds(&self, now_tick_ms: u32) -> String<2> {
        if self.sample.is_none() {
            return placeholder();
        }
        pad2(self.day_seconds(now_tick_ms) % 60)
    }

    /// 12-hour hour value, unpadded: 13..23 map to 1..11, 0 maps to 12.
    pub fn am_pm_hours(&self, now_tick_ms: u32) -> String<2> {
        match self.hour24(now_tick_ms) {
            Some(h) => {
                let mut h = h;
                if h >= 13 {
                    h -= 12;
                }
                if h == 0 {
                    h = 12;
                }
                let mut s = String::new();
                let _ = write!(s, "{}", h);
                s
            }
            None => placeholder(),
        }
    }

    /// AM/PM selector from the 24-hour value (hour >= 12 is PM).
    pub fn am_pm(&self, now_tick_ms: u32) -> &'static str {
        match self.hour24(now_tick_ms) {
            Some(h) if h >= 12 => "PM",
            _ => "AM",
        }
    }

    /// Calendar fields from the unix projection plus offset, or `None`
    /// before the first fetch.
    fn civil_now(&self, now_tick_ms: u32) -> Option<calendar::CivilDateTime> {
        self.sample?;
        let offset = offset_seconds(self.offset.effective_offset_hours);
        Some(civil_from_unix(self.current_unix_epoch(now_tick_ms) + offset))
    }

    /// Four-digit year, `"--"` before the first fetch.
    pub fn year(&self, now_tick_ms: u32) -> String<4> {
        match self.civil_now(now_tick_ms) {
            Some(dt) => {
                let mut s = String::new();
                let _ = write!(s, "{}", dt.year);
                s
            }
            None => {
                let mut s = String::new();
                let _ = s.push_str("--");
                s
            }
        }
    }

    /// Two-character zero-padded month, `"--"` before the first fetch.
    pub fn month(&self, now_tick_ms: u32) -> String<2> {
        match self.civil_now(now_tick_ms) {
            Some(dt) => pad2(dt.month as i64),
            None => placeholder(),
        }
    }

    /// Two-character zero-padded day of month, `"--"` before the first
    /// fetch.
    pub fn day(&self, now_tick_ms: u32) -> String<2> {
        match self.civil_now(now_tick_ms) {
            Some(dt) => pad2(dt.day as i64),
            None => placeholder(),
        }
    }

    /// `YYYY-MM-DD`.
    pub fn formatted_date(&self, now_tick_ms: u32) -> String<10> {
        let mut s = String::new();
        let _ = write!(
            s,
            "{}-{}-{}",
            self.year(now_tick_ms),
            self.month(now_tick_ms),
            self.day(now_tick_ms)
        );
        s
    }

    /// `HH:MM:SS`.
    pub fn formatted_time(&self, now_tick_ms: u32) -> String<8> {
        let mut s = String::new();
        let _ = write!(
            s,
            "{}:{}:{}",
            self.hours(now_tick_ms),
            self.minutes(now_tick_ms),
            self.seconds(now_tick_ms)
        );
        s
    }

    /// `H:MM AM` / `H:MM PM`.
    pub fn am_pm_formatted_time(&self, now_tick_ms: u32) -> String<8> {
        let mut s = String::new();
        let _ = write!(
            s,
            "{}:{} {}",
            self.am_pm_hours(now_tick_ms),
            self.minutes(now_tick_ms),
            self.am_pm(now_tick_ms)
        );
        s
    }

    /// Time string in the configured display mode.
    pub fn display_time(&self, now_tick_ms: u32, use_24h: bool) -> String<8> {
        if use_24h {
            self.formatted_time(now_tick_ms)
        } else {
            self.am_pm_formatted_time(now_tick_ms)
        }
    }
}

/// Elapsed whole seconds between two tick readings, wraparound-safe.
fn elapsed_secs(capture_tick_ms: u32, now_tick_ms: u32) -> i64 {
    (now_tick_ms.wrapping_sub(capture_tick_ms) / 1_000) as i64
}

/// A fractional hour offset in whole seconds, rounded half away from
/// zero (quarter-hour offsets are exact in f32, this covers the rest).
pub(crate) fn offset_seconds(hours: f32) -> i64 {
    let secs = hours * 3_600.0;
    if secs >= 0.0 {
        (secs + 0.5) as i64
    } else {
        (secs - 0.5) as i64
    }
}

fn pad2(value: i64) -> String<2> {
    let mut s = String::new();
    let _ = write!(s, "{:02}", value);
    s
}

fn placeholder() -> String<2> {
    let mut s = String::new();
    let _ = s.push_str("--");
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(local: i64, tick: u32, unix: i64) -> CapturedTimeSample {
        CapturedTimeSample {
            local_epoch_secs: local,
            capture_tick_ms: tick,
            unix_epoch_secs: unix,
            low_confidence: false,
        }
    }

    #[test]
    fn fields_are_placeholders_before_first_fetch() {
        let svc = TimeService::new(2.0, true);
        assert!(!svc.is_time_known());
        assert_eq!(svc.hours(5_000).as_str(), "--");
        assert_eq!(svc.minutes(5_000).as_str(), "--");
        assert_eq!(svc.seconds(5_000).as_str(), "--");
        assert_eq!(svc.year(5_000).as_str(), "--");
        assert_eq!(svc.formatted_time(5_000).as_str(), "--:--:--");
    }

    #[test]
    fn projection_scenario() {
        // Sample captured at 20:05:40 UTC (72340 s into the day) at tick
        // 1000; queried at tick 3000 with offset +2.0.
        let mut svc = TimeService::new(2.0, true);
        svc.set_sample(sample(72_340, 1_000, 1_447_963_540));
        assert_eq!(svc.current_epoch(3_000), 72_342);
        assert_eq!(svc.hours(3_000).as_str(), "22");
        assert_eq!(svc.minutes(3_000).as_str(), "05");
        assert_eq!(svc.seconds(3_000).as_str(), "42");
    }

    #[test]
    fn decomposition_reconstructs_day_seconds() {
        let offsets = [-9.5f32, -2.0, 0.0, 2.0, 5.75, 12.0];
        let epochs = [0i64, 1, 3_599, 43_200, 72_342, 86_399, 90_000];
        for &off in &offsets {
            for &epoch in &epochs {
                let mut svc = TimeService::new(off, false);
                svc.set_sample(sample(epoch, 0, epoch));
                let h: i64 = svc.hours(0).parse().unwrap();
                let m: i64 = svc.minutes(0).parse().unwrap();
                let s: i64 = svc.seconds(0).parse().unwrap();
                assert!((0..24).contains(&h));
                assert!((0..60).contains(&m));
                assert!((0..60).contains(&s));
                let expected =
                    (epoch + offset_seconds(off) + SECS_PER_DAY) % SECS_PER_DAY;
                assert_eq!(h * 3_600 + m * 60 + s, expected, "offset {}", off);
            }
        }
    }

    #[test]
    fn twelve_hour_round_trip() {
        for h in 0u8..24 {
            let mut svc = TimeService::new(0.0, false);
            svc.set_sample(sample(h as i64 * 3_600, 0, h as i64 * 3_600));
            let twelve: u8 = svc.am_pm_hours(0).parse().unwrap();
            let pm = svc.am_pm(0) == "PM";
            // Reconstruct the 24-hour value from (12-hour, AM/PM).
            let back = match (twelve, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (v, false) => v,
                (v, true) => v + 12,
            };
            assert_eq!(back, h);
        }
    }

    #[test]
    fn twelve_hour_landmarks() {
        for (h, expect, ampm) in [(0u8, "12", "AM"), (12, "12", "PM"), (13, "1", "PM")] {
            let mut svc = TimeService::new(0.0, false);
            svc.set_sample(sample(h as i64 * 3_600, 0, h as i64 * 3_600));
            assert_eq!(svc.am_pm_hours(0).as_str(), expect);
            assert_eq!(svc.am_pm(0), ampm);
        }
    }

    #[test]
    fn projection_survives_tick_wraparound() {
        let capture = u32::MAX - 500;
        let mut svc = TimeService::new(0.0, false);
        svc.set_sample(sample(72_340, capture, 1_447_963_540));
        // 2001 ms elapsed across the wrap boundary
        assert_eq!(svc.current_epoch(1_500), 72_342);
        // Monotonically non-decreasing while ticks advance past the wrap
        let mut last = i64::MIN;
        for now in [capture, capture + 400, u32::MAX, 0, 999, 1_000, 5_000] {
            let epoch = svc.current_epoch(now);
            assert!(epoch >= last);
            last = epoch;
        }
    }

    #[test]
    fn calendar_fields_with_offset_rollover() {
        // 2015-11-19 20:25:40 UTC; +5 h rolls into the next calendar day.
        let mut svc = TimeService::new(5.0, false);
        svc.set_sample(sample(73_540, 0, 1_447_964_740));
        assert_eq!(svc.formatted_date(0).as_str(), "2015-11-20");
        assert_eq!(svc.hours(0).as_str(), "01");
        // +2 h stays on the capture day.
        svc.set_base_offset(2.0, false);
        assert_eq!(svc.formatted_date(0).as_str(), "2015-11-19");
        assert_eq!(svc.formatted_time(0).as_str(), "22:25:40");
    }

    #[test]
    fn display_mode_selects_formatter() {
        let mut svc = TimeService::new(0.0, false);
        svc.set_sample(sample(13 * 3_600 + 25 * 60 + 40, 0, 1_447_964_740));
        assert_eq!(svc.display_time(0, true).as_str(), "13:25:40");
        assert_eq!(svc.display_time(0, false).as_str(), "1:25 PM");
    }

    #[test]
    fn low_confidence_flag_follows_sample() {
        let mut svc = TimeService::new(0.0, false);
        assert!(!svc.is_low_confidence());
        svc.set_sample(CapturedTimeSample {
            low_confidence: true,
            ..sample(0, 0, 0)
        });
        assert!(svc.is_low_confidence());
    }
}
