#![deny(unsafe_code)]
#![deny(warnings)]
//! Monitor configuration
//!
//! Plain values handed over by the settings-store collaborator at
//! startup or reconfiguration. The core never reads or writes the
//! backing store itself.

/// User-facing monitor settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorConfig {
    /// Standard UTC offset in hours, without DST (may be fractional)
    pub utc_offset_hours: f32,
    /// Apply daylight-saving adjustment when the rule says so
    pub dst_enabled: bool,
    /// 24-hour clock display; false selects 12-hour with AM/PM
    pub use_24h: bool,
    /// Minutes between time/weather data refreshes
    pub refresh_minutes: u32,
    /// Panel brightness during the day, 0-255
    pub day_brightness: u8,
    /// Panel brightness at night, 0-255
    pub night_brightness: u8,
    /// Show the always-on clock frames while the content source is idle
    pub display_clock: bool,
    /// Include weather frames in the clock rotation
    pub display_weather: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            // Pairs with the built-in Eastern European DST rule
            utc_offset_hours: 2.0,
            dst_enabled: true,
            use_24h: true,
            refresh_minutes: 15,
            day_brightness: 255,
            night_brightness: 20,
            display_clock: true,
            display_weather: true,
        }
    }
}
