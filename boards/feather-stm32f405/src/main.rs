#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod display;
mod net;
mod weather;

stm32_tim2_monotonic!(Mono, 1_000_000);

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1, USART2, USART3])]
mod app {
    use super::*;
    use defmt::{info, warn};
    use embassy_futures::join::join3;
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Level, Output, Pull, Speed};
    use embassy_stm32::i2c::{self, I2c};
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::{Hse, HseMode};
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;

    use oledmon_core::timezone::DstRule;
    use oledmon_core::{EvalContext, MonitorConfig, Scheduler, TickSource, TimeService};

    use display::StatusDisplay;
    use net::{wait_for_config, TimeClient, UptimeTicks};
    use weather::WeatherSource;

    type SpiPeripheral = embassy_stm32::Peri<'static, peripherals::SPI2>;
    type PinPB13 = embassy_stm32::Peri<'static, peripherals::PB13>;
    type PinPB15 = embassy_stm32::Peri<'static, peripherals::PB15>;
    type PinPB14 = embassy_stm32::Peri<'static, peripherals::PB14>;
    type PinPC6 = embassy_stm32::Peri<'static, peripherals::PC6>;
    type PinPC3 = embassy_stm32::Peri<'static, peripherals::PC3>;
    type PinPC2 = embassy_stm32::Peri<'static, peripherals::PC2>;
    type ExtiChannel = embassy_stm32::Peri<'static, peripherals::EXTI2>;
    type DmaTx = embassy_stm32::Peri<'static, peripherals::DMA1_CH4>;
    type DmaRx = embassy_stm32::Peri<'static, peripherals::DMA1_CH3>;

    struct NetworkPeripherals {
        spi: SpiPeripheral,
        sck: PinPB13,
        mosi: PinPB15,
        miso: PinPB14,
        cs: PinPC6,
        reset: PinPC3,
        int: PinPC2,
        exti: ExtiChannel,
        dma_tx: DmaTx,
        dma_rx: DmaRx,
    }

    /// Panel render cadence; also bounds the latency of every scheduler
    /// decision (brightness, power, frame switch).
    const LOOP_PERIOD_MS: u64 = 250;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        led: Output<'static>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("OLED monitor starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: None,
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        let p = embassy_stm32::init(config);

        info!("System initialized with HSE (12MHz), SYSCLK=84MHz");

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        // Default: APB1 = 42 MHz, TIM2 = 84 MHz
        let timer_clock_hz = 84_000_000;
        Mono::start(timer_clock_hz);
        info!("TIM2 monotonic timer initialized at 1 MHz");

        // SSD1306 on I2C1 (PB6 SCL / PB7 SDA, FeatherWing OLED header)
        let i2c = I2c::new_blocking(p.I2C1, p.PB6, p.PB7, Hertz(400_000), i2c::Config::default());
        let panel = StatusDisplay::new(i2c);
        info!("SSD1306 panel initialized");

        let led = Output::new(p.PC1, Level::High, Speed::Low);

        let net_periph = NetworkPeripherals {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            int: p.PC2,
            exti: p.EXTI2,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
        };

        heartbeat::spawn().ok();
        monitor_task::spawn(net_periph, panel).ok();

        (Shared {}, Local { led })
    }

    /// Heartbeat task
    #[task(priority = 1, local = [led])]
    async fn heartbeat(cx: heartbeat::Context) {
        info!("Heartbeat task started");
        loop {
            cx.local.led.set_high();
            Mono::delay(100.millis()).await;
            cx.local.led.set_low();
            Mono::delay(4900.millis()).await;
        }
    }

    /// Monitor task - brings up the network stack and runs the clock loop
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1)]
    async fn monitor_task(
        _cx: monitor_task::Context,
        periph: NetworkPeripherals,
        panel: StatusDisplay,
    ) -> ! {
        use embassy_net::{Config, StackResources};
        use static_cell::StaticCell;

        info!("Monitor task started");

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000); // 10 MHz for W5500

        let spi = Spi::new(
            periph.spi,
            periph.sck,
            periph.mosi,
            periph.miso,
            periph.dma_tx,
            periph.dma_rx,
            spi_config,
        );

        let cs = Output::new(periph.cs, Level::High, Speed::VeryHigh);
        let reset = Output::new(periph.reset, Level::High, Speed::Low);
        let int = ExtiInput::new(periph.int, periph.exti, Pull::Up);

        let eth_periph = net::EthPeripherals {
            spi,
            cs,
            reset,
            int,
        };

        let mac_addr = [0x02, 0x00, 0x00, 0x12, 0x34, 0x56];
        let (device, w5500_runner) = net::init_w5500(eth_periph, mac_addr).await;

        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            device,
            Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            0x1234_5678_u64,
        );
        info!("Network stack initialized with DHCP");

        let app_logic = async {
            wait_for_config(&stack).await;
            run_monitor(&stack, panel).await;
        };

        join3(w5500_runner.run(), net_runner.run(), app_logic).await;
        unreachable!()
    }

    /// Main monitor loop: evaluate the scheduler, fetch on its trigger,
    /// apply panel decisions, render the active frame set.
    async fn run_monitor(stack: &embassy_net::Stack<'static>, mut panel: StatusDisplay) -> ! {
        let cfg = MonitorConfig::default();
        let zone = DstRule::EASTERN_EUROPEAN;
        let ticks = UptimeTicks;

        let mut time = TimeService::new(cfg.utc_offset_hours, cfg.dst_enabled);
        let mut sched = Scheduler::new();
        let mut client = TimeClient::new();
        let mut weather = WeatherSource::new();

        panel.set_brightness(cfg.day_brightness);

        loop {
            let now = ticks.ticks_ms();
            // DST status can flip between fetches, so the effective
            // offset is re-resolved on every evaluation, never carried
            // over from the previous iteration.
            time.set_effective_offset(zone.resolve(
                time.current_unix_epoch(now),
                cfg.utc_offset_hours,
                cfg.dst_enabled,
            ));
            let ctx = EvalContext {
                now_local_epoch: time.current_epoch(now),
                now_unix_epoch: time.current_unix_epoch(now),
                effective_offset_hours: time.effective_offset_hours(),
                sunrise: weather.sunrise(),
                sunset: weather.sunset(),
                content_busy: weather.busy(),
                content_operational: weather.operational(),
            };
            let decision = sched.evaluate(&cfg, &ctx);

            if decision.refresh_data {
                match client.run(stack).await {
                    Ok(sample) => {
                        time.set_sample(sample);
                        if time.is_low_confidence() {
                            warn!("date header month not recognized, time may be off");
                        }
                        let now = ticks.ticks_ms();
                        time.set_effective_offset(zone.resolve(
                            time.current_unix_epoch(now),
                            cfg.utc_offset_hours,
                            cfg.dst_enabled,
                        ));
                        sched.mark_refreshed(time.current_epoch(now));
                        info!("time synced: {}", time.formatted_time(now).as_str());
                        if cfg.display_weather {
                            weather.refresh(stack).await;
                        }
                    }
                    Err(e) => {
                        warn!("time fetch failed: {}", e);
                        sched.mark_refresh_failed();
                    }
                }
            }

            if let Some(on) = decision.display_power {
                panel.set_power(on);
            }
            if let Some(level) = decision.brightness {
                panel.set_brightness(level);
            }

            if sched.display_on() {
                let now = ticks.ticks_ms();
                if sched.clock_mode() {
                    panel.draw_clock(
                        time.display_time(now, cfg.use_24h).as_str(),
                        time.formatted_date(now).as_str(),
                        client.last_sync(),
                    );
                } else {
                    panel.draw_content("job in progress", client.last_sync());
                }
            }

            Mono::delay(LOOP_PERIOD_MS.millis()).await;
        }
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        info!("Idle task started - entering WFI loop");
        loop {
            cortex_m::asm::wfi();
        }
    }
}
