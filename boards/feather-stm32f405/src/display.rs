#![deny(unsafe_code)]
#![deny(warnings)]
//! SSD1306 status panel glue
//!
//! Thin rendering collaborator: takes the formatted field strings and
//! the scheduler's brightness/power decisions and pushes them at the
//! panel. Panel I/O failures are non-fatal and ignored; the next frame
//! repaints everything anyway.

use embassy_stm32::i2c::I2c;
use embassy_stm32::mode::Blocking;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_9X18_BOLD};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

type Panel = Ssd1306<
    I2CInterface<I2c<'static, Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

pub struct StatusDisplay {
    panel: Panel,
}

impl StatusDisplay {
    pub fn new(i2c: I2c<'static, Blocking>) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let mut panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        let _ = panel.init();
        let _ = panel.clear(BinaryColor::Off);
        let _ = panel.flush();
        Self { panel }
    }

    /// Map the 0-255 configured level onto the panel's brightness steps.
    pub fn set_brightness(&mut self, level: u8) {
        let brightness = match level {
            0..=50 => Brightness::DIMMEST,
            51..=100 => Brightness::DIM,
            101..=150 => Brightness::NORMAL,
            151..=200 => Brightness::BRIGHT,
            _ => Brightness::BRIGHTEST,
        };
        let _ = self.panel.set_brightness(brightness);
    }

    pub fn set_power(&mut self, on: bool) {
        let _ = self.panel.set_display_on(on);
    }

    /// Always-on clock frame: big time, date and sync status below.
    pub fn draw_clock(&mut self, time: &str, date: &str, status: &str) {
        let big = MonoTextStyle::new(&FONT_9X18_BOLD, BinaryColor::On);
        let small = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let _ = self.panel.clear(BinaryColor::Off);
        let _ = Text::with_baseline(time, Point::new(28, 14), big, Baseline::Top)
            .draw(&mut self.panel);
        let _ = Text::with_baseline(date, Point::new(34, 38), small, Baseline::Top)
            .draw(&mut self.panel);
        let _ = Text::with_baseline(status, Point::new(0, 54), small, Baseline::Top)
            .draw(&mut self.panel);
        let _ = self.panel.flush();
    }

    /// Primary content frame while a job is in progress.
    pub fn draw_content(&mut self, line1: &str, line2: &str) {
        let small = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let _ = self.panel.clear(BinaryColor::Off);
        let _ = Text::with_baseline(line1, Point::new(0, 8), small, Baseline::Top)
            .draw(&mut self.panel);
        let _ = Text::with_baseline(line2, Point::new(0, 24), small, Baseline::Top)
            .draw(&mut self.panel);
        let _ = self.panel.flush();
    }
}
