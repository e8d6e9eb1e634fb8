#![deny(unsafe_code)]
#![deny(warnings)]
//! Day/night and refresh scheduling
//!
//! Evaluated once per main-loop iteration. The scheduler owns the only
//! cross-tick mutable state outside configuration: day/night flag,
//! display power, the clock/content frame latch, and the refresh
//! bookkeeping epochs.
//!
//! Decisions come back as a [`Decision`] with `Option` fields: `None`
//! means "no change this tick", so redundant evaluations in a steady
//! state never repeat a hardware write. The caller performs the actual
//! fetch when `refresh_data` is set and reports the outcome via
//! [`Scheduler::mark_refreshed`] / [`Scheduler::mark_refresh_failed`];
//! a failed fetch leaves the epoch at 0 and the very next evaluation
//! retries.

use crate::config::MonitorConfig;
use crate::time::offset_seconds;

/// Which frame set the display renderer should cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameSet {
    /// Always-on clock (plus weather frames when configured)
    Clock,
    /// Primary content frames (job/status screens)
    Content,
}

/// Inputs for one scheduling evaluation, read from the time service and
/// the collaborator services.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Projected seconds-since-midnight-UTC epoch (monotonic between
    /// fetches); 0 before the first fetch
    pub now_local_epoch: i64,
    /// Projected full calendar epoch; 0 before the first fetch
    pub now_unix_epoch: i64,
    /// DST-resolved offset for this instant
    pub effective_offset_hours: f32,
    /// Sunrise as a numeric epoch-second string from the weather
    /// collaborator; unparsable text counts as 0
    pub sunrise: &'a str,
    /// Sunset, same encoding as `sunrise`
    pub sunset: &'a str,
    /// The content source is busy (a job is in progress)
    pub content_busy: bool,
    /// The content source is reachable and operational
    pub content_operational: bool,
}

/// Outcome of one evaluation. `Option` fields are edge-triggered.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decision {
    /// Invoke the time/weather fetch before rendering
    pub refresh_data: bool,
    /// New panel brightness to write
    pub brightness: Option<u8>,
    /// New panel power state to write
    pub display_power: Option<bool>,
    /// Frame set switch for the renderer
    pub frames: Option<FrameSet>,
    /// Re-resolve the DST offset before the clock becomes visible
    pub recompute_offset: bool,
}

/// Scheduler state machine; lives for the whole process.
#[derive(Debug)]
pub struct Scheduler {
    is_day_time: bool,
    display_on: bool,
    clock_mode: bool,
    last_data_epoch: i64,
    display_off_epoch: i64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            is_day_time: true,
            display_on: true,
            clock_mode: false,
            last_data_epoch: 0,
            display_off_epoch: 0,
        }
    }

    /// One evaluation tick.
    pub fn evaluate(&mut self, cfg: &MonitorConfig, ctx: &EvalContext<'_>) -> Decision {
        // Refresh trigger: epoch 0 forces a fetch on the very next
        // evaluation (first boot, failed fetch, config change, wake from
        // a long sleep).
        let refresh_due = self.last_data_epoch == 0
            || (ctx.now_local_epoch - self.last_data_epoch) / 60 >= cfg.refresh_minutes as i64;
        let mut decision = Decision {
            refresh_data: refresh_due,
            ..Decision::default()
        };

        // Display power.
        if !self.display_on && cfg.display_clock {
            self.set_power(true, cfg, ctx, &mut decision);
        } else if self.display_on && !cfg.display_clock && !ctx.content_busy {
            self.set_power(false, cfg, ctx, &mut decision);
        } else if !self.display_on && !cfg.display_clock && ctx.content_operational {
            self.set_power(true, cfg, ctx, &mut decision);
        }

        // Clock/content frame latch.
        if cfg.display_clock {
            if !ctx.content_busy && !self.clock_mode {
                decision.frames = Some(FrameSet::Clock);
                decision.recompute_offset = true;
                self.clock_mode = true;
            } else if ctx.content_busy && self.clock_mode {
                decision.frames = Some(FrameSet::Content);
                self.clock_mode = false;
            }
        }

        // Day/night brightness, edge-triggered on the sunrise/sunset
        // crossing.
        let offset = offset_seconds(ctx.effective_offset_hours);
        let local = ctx.now_unix_epoch + offset;
        let day = local > parse_epoch(ctx.sunrise) + offset && local < parse_epoch(ctx.sunset) + offset;
        if day != self.is_day_time {
            self.is_day_time = day;
            decision.brightness = Some(if day {
                cfg.day_brightness
            } else {
                cfg.night_brightness
            });
        }

        decision
    }

    /// Record a successful fetch at the given projected epoch.
    pub fn mark_refreshed(&mut self, now_local_epoch: i64) {
        self.last_data_epoch = now_local_epoch;
    }

    /// Record a failed fetch; the next evaluation retries.
    pub fn mark_refresh_failed(&mut self) {
        self.last_data_epoch = 0;
    }

    /// Settings changed: force a data pull and a frame re-selection.
    pub fn notify_config_changed(&mut self) {
        self.last_data_epoch = 0;
        self.clock_mode = false;
    }

    pub fn is_day_time(&self) -> bool {
        self.is_day_time
    }

    pub fn display_on(&self) -> bool {
        self.display_on
    }

    pub fn clock_mode(&self) -> bool {
        self.clock_mode
    }

    fn set_power(
        &mut self,
        on: bool,
        cfg: &MonitorConfig,
        ctx: &EvalContext<'_>,
        decision: &mut Decision,
    ) {
        if on {
            // Stale-data guard: waking after more than one refresh
            // interval forces a fresh pull before anything is shown.
            if (ctx.now_local_epoch - self.display_off_epoch) / 60 >= cfg.refresh_minutes as i64 {
                self.last_data_epoch = 0;
                self.display_off_epoch = 0;
                decision.refresh_data = true;
            }
        } else {
            self.display_off_epoch = self.last_data_epoch;
        }
        self.display_on = on;
        decision.display_power = Some(on);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// The weather collaborator hands sunrise/sunset over as numeric text;
/// anything unparsable counts as 0, which places the instant outside any
/// daytime window.
fn parse_epoch(text: &str) -> i64 {
    text.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2015-11-19, sunrise 07:43:54 UTC, sunset 16:01:21 UTC
    const SUNRISE: &str = "1447919034";
    const SUNSET: &str = "1447948881";
    const NOON: i64 = 1_447_934_400;
    const MIDNIGHT: i64 = 1_447_977_600;

    fn ctx(now_unix: i64) -> EvalContext<'static> {
        EvalContext {
            now_local_epoch: now_unix % 86_400 + 86_400, // arbitrary positive projection
            now_unix_epoch: now_unix,
            effective_offset_hours: 2.0,
            sunrise: SUNRISE,
            sunset: SUNSET,
            content_busy: false,
            content_operational: true,
        }
    }

    #[test]
    fn refresh_fires_immediately_when_epoch_unset() {
        let cfg = MonitorConfig::default();
        let mut sched = Scheduler::new();
        let decision = sched.evaluate(&cfg, &ctx(NOON));
        assert!(decision.refresh_data);
    }

    #[test]
    fn refresh_respects_interval_after_success() {
        let cfg = MonitorConfig::default(); // 15 minutes
        let mut sched = Scheduler::new();
        let mut c = ctx(NOON);
        c.now_local_epoch = 50_000;
        sched.mark_refreshed(50_000);

        assert!(!sched.evaluate(&cfg, &c).refresh_data);
        c.now_local_epoch = 50_000 + 14 * 60;
        assert!(!sched.evaluate(&cfg, &c).refresh_data);
        c.now_local_epoch = 50_000 + 15 * 60;
        assert!(sched.evaluate(&cfg, &c).refresh_data);
    }

    #[test]
    fn failed_fetch_retries_on_next_evaluation() {
        let cfg = MonitorConfig::default();
        let mut sched = Scheduler::new();
        sched.mark_refreshed(50_000);
        sched.mark_refresh_failed();
        assert!(sched.evaluate(&cfg, &ctx(NOON)).refresh_data);
    }

    #[test]
    fn brightness_transitions_are_edge_triggered() {
        let cfg = MonitorConfig::default();
        let mut sched = Scheduler::new();

        // Starts in Day state; evaluating during the day writes nothing.
        let first = sched.evaluate(&cfg, &ctx(NOON));
        assert_eq!(first.brightness, None);
        assert!(sched.is_day_time());

        // Crossing into night sets the night level once.
        let night = sched.evaluate(&cfg, &ctx(MIDNIGHT));
        assert_eq!(night.brightness, Some(cfg.night_brightness));
        assert_eq!(sched.evaluate(&cfg, &ctx(MIDNIGHT)).brightness, None);

        // And back to day.
        let day = sched.evaluate(&cfg, &ctx(NOON));
        assert_eq!(day.brightness, Some(cfg.day_brightness));
        assert_eq!(sched.evaluate(&cfg, &ctx(NOON)).brightness, None);
    }

    #[test]
    fn missing_sun_times_count_as_night() {
        let cfg = MonitorConfig::default();
        let mut sched = Scheduler::new();
        let mut c = ctx(NOON);
        c.sunrise = "";
        c.sunset = "";
        let decision = sched.evaluate(&cfg, &c);
        assert_eq!(decision.brightness, Some(cfg.night_brightness));
        assert!(!sched.is_day_time());
    }

    #[test]
    fn clock_mode_latches_and_recomputes_offset() {
        let cfg = MonitorConfig::default();
        let mut sched = Scheduler::new();

        let idle = sched.evaluate(&cfg, &ctx(NOON));
        assert_eq!(idle.frames, Some(FrameSet::Clock));
        assert!(idle.recompute_offset);
        assert!(sched.clock_mode());

        // Steady state: no frame churn.
        assert_eq!(sched.evaluate(&cfg, &ctx(NOON)).frames, None);

        // A job starting flips to the content frames.
        let mut busy = ctx(NOON);
        busy.content_busy = true;
        let working = sched.evaluate(&cfg, &busy);
        assert_eq!(working.frames, Some(FrameSet::Content));
        assert!(!working.recompute_offset);
        assert!(!sched.clock_mode());
    }

    #[test]
    fn content_only_config_sleeps_and_wakes_display() {
        let cfg = MonitorConfig {
            display_clock: false,
            ..MonitorConfig::default()
        };
        let mut sched = Scheduler::new();
        let mut c = ctx(NOON);
        c.now_local_epoch = 50_000;
        sched.mark_refreshed(50_000);

        // Idle content source puts the panel to sleep.
        c.content_busy = false;
        c.content_operational = false;
        let sleep = sched.evaluate(&cfg, &c);
        assert_eq!(sleep.display_power, Some(false));
        assert!(!sched.display_on());

        // Operational again shortly after: wake without forcing a pull.
        c.now_local_epoch = 50_000 + 60;
        c.content_operational = true;
        c.content_busy = true;
        let wake = sched.evaluate(&cfg, &c);
        assert_eq!(wake.display_power, Some(true));
        assert!(!wake.refresh_data);
    }

    #[test]
    fn wake_after_long_sleep_forces_data_pull() {
        let cfg = MonitorConfig {
            display_clock: false,
            ..MonitorConfig::default()
        };
        let mut sched = Scheduler::new();
        let mut c = ctx(NOON);
        c.now_local_epoch = 50_000;
        c.content_operational = false;
        sched.mark_refreshed(50_000);
        sched.evaluate(&cfg, &c); // sleeps, display_off_epoch = 50000

        // Wake 20 minutes later, past the 15-minute refresh interval.
        c.now_local_epoch = 50_000 + 20 * 60;
        c.content_operational = true;
        c.content_busy = true;
        let wake = sched.evaluate(&cfg, &c);
        assert_eq!(wake.display_power, Some(true));
        assert!(wake.refresh_data);
    }

    #[test]
    fn config_change_forces_refresh_and_frame_reselect() {
        let cfg = MonitorConfig::default();
        let mut sched = Scheduler::new();
        let mut c = ctx(NOON);
        c.now_local_epoch = 50_000;
        sched.mark_refreshed(50_000);
        sched.evaluate(&cfg, &c); // latch clock mode

        sched.notify_config_changed();
        let after = sched.evaluate(&cfg, &c);
        assert!(after.refresh_data);
        assert_eq!(after.frames, Some(FrameSet::Clock));
    }
}
