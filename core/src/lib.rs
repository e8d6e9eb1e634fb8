//! Platform-agnostic core logic for the OLED status monitor firmware
//!
//! This crate contains the time synchronization and display-scheduling
//! logic shared across all supported boards. It has NO hardware
//! dependencies: the board crate supplies a connected transport, a delay
//! provider and a millisecond tick source, and applies the scheduling
//! decisions to the real display.
//!
//! ## Modules
//! - **`time`**: wall-clock derivation: captured network time samples,
//!   monotonic projection from a free-running millisecond tick, and
//!   display-ready field formatting
//! - **`timezone`**: rule-based DST resolution producing the effective
//!   UTC offset
//! - **`scheduler`**: day/night brightness, display power and data
//!   refresh decisions, evaluated once per main-loop iteration
//! - **`config`**: plain-value configuration handed over by the
//!   settings-store collaborator
//! - **`weather`**: field extraction for the weather collaborator's
//!   sunrise/sunset responses

#![no_std]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod config;
pub mod scheduler;
pub mod time;
pub mod timezone;
pub mod weather;

pub use config::MonitorConfig;
pub use scheduler::{Decision, EvalContext, FrameSet, Scheduler};
pub use time::httpdate::{CapturedTimeSample, FetchError, TickSource};
pub use time::TimeService;
pub use timezone::{DstRule, TransitionRule, Week, Weekday};
