#![deny(unsafe_code)]
#![deny(warnings)]
//! Network hardware layer and the HTTP date-header time client
//!
//! W5500 Ethernet bring-up, DHCP wait, and the board-side half of the
//! time fetch: DNS resolution and the TCP connect live here, the
//! response scanning lives in `oledmon-core`. A connect failure maps to
//! `FetchError::ConnectionFailed`; no retry happens inside a single
//! fetch, the scheduler's refresh trigger is the retry mechanism.

use core::fmt::Write as FmtWrite;

use defmt::{info, Debug2Format};
use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice as SpiDeviceBus;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpEndpoint, Stack};
use embassy_net_wiznet::chip::W5500;
use embassy_net_wiznet::{Device, Runner};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Async;
use embassy_stm32::spi::Spi;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Instant};
use heapless::String;
use static_cell::StaticCell;

use oledmon_core::time::httpdate::{self, TIME_HOST, TIME_PORT};
use oledmon_core::{CapturedTimeSample, FetchError, TickSource};

/// Ethernet peripherals bundle
pub struct EthPeripherals<'a> {
    pub spi: Spi<'a, Async>,
    pub cs: Output<'a>,
    pub reset: Output<'a>,
    pub int: ExtiInput<'a>,
}

/// Initialize the W5500 Ethernet hardware.
///
/// Returns device and runner. The runner must be continuously polled for
/// device operation.
pub async fn init_w5500(
    periph: EthPeripherals<'static>,
    mac_addr: [u8; 6],
) -> (
    Device<'static>,
    Runner<
        'static,
        W5500,
        SpiDeviceBus<'static, CriticalSectionRawMutex, Spi<'static, Async>, Output<'static>>,
        ExtiInput<'static>,
        Output<'static>,
    >,
) {
    let EthPeripherals {
        spi,
        cs,
        mut reset,
        int,
    } = periph;

    info!("Performing W5500 hardware reset...");
    reset.set_low();
    embassy_time::Timer::after_millis(1).await;
    reset.set_high();
    embassy_time::Timer::after_millis(2).await;

    type SpiBusType = embassy_sync::mutex::Mutex<CriticalSectionRawMutex, Spi<'static, Async>>;
    static SPI_BUS: StaticCell<SpiBusType> = StaticCell::new();
    let spi_bus = SPI_BUS.init(embassy_sync::mutex::Mutex::new(spi));
    let spi_device = SpiDeviceBus::new(spi_bus, cs);

    static STATE: StaticCell<embassy_net_wiznet::State<8, 8>> = StaticCell::new();
    let state = STATE.init(embassy_net_wiznet::State::<8, 8>::new());

    let (device, runner) = embassy_net_wiznet::new(mac_addr, state, spi_device, int, reset)
        .await
        .unwrap();

    info!("W5500 initialized");

    (device, runner)
}

/// Wait for network configuration (DHCP) and log the lease.
pub async fn wait_for_config(stack: &Stack<'_>) {
    info!("Waiting for DHCP...");
    stack.wait_config_up().await;
    if let Some(config) = stack.config_v4() {
        let octets = config.address.address().octets();
        info!(
            "Network is up, IP: {}.{}.{}.{}",
            octets[0], octets[1], octets[2], octets[3]
        );
    }
}

/// Millisecond ticks from the embassy time driver.
///
/// Truncated to u32 on purpose: the projection math in the core is
/// wraparound-safe and only ever looks at tick differences.
pub struct UptimeTicks;

impl TickSource for UptimeTicks {
    fn ticks_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}

/// HTTP date-header time client.
///
/// Keeps the human-readable outcome of the last fetch for the status
/// line on the display.
pub struct TimeClient {
    last_sync: String<24>,
}

impl TimeClient {
    pub fn new() -> Self {
        let mut last_sync = String::new();
        let _ = last_sync.push_str("never synced");
        Self { last_sync }
    }

    /// Outcome of the most recent fetch, for the rendering collaborator.
    pub fn last_sync(&self) -> &str {
        &self.last_sync
    }

    /// One fetch: resolve, connect, scan for the date header. Runs to
    /// completion; the caller re-triggers on the refresh schedule.
    pub async fn run(
        &mut self,
        stack: &Stack<'static>,
    ) -> Result<CapturedTimeSample, FetchError> {
        let result = self.fetch(stack).await;
        self.last_sync.clear();
        match &result {
            Ok(_) => {
                let _ = self.last_sync.push_str("time synced");
            }
            Err(e) => {
                let _ = write!(self.last_sync, "sync failed: {}", e);
            }
        }
        result
    }

    async fn fetch(&self, stack: &Stack<'static>) -> Result<CapturedTimeSample, FetchError> {
        let host_ip = stack
            .dns_query(TIME_HOST, DnsQueryType::A)
            .await
            .map_err(|_| FetchError::ConnectionFailed)?
            .first()
            .copied()
            .ok_or(FetchError::ConnectionFailed)?;
        let endpoint = IpEndpoint::new(host_ip, TIME_PORT);
        info!("Resolved {} to {}", TIME_HOST, Debug2Format(&endpoint));

        let mut rx_buffer = [0u8; 1024];
        let mut tx_buffer = [0u8; 256];
        let mut socket = TcpSocket::new(*stack, &mut rx_buffer, &mut tx_buffer);
        socket
            .connect(endpoint)
            .await
            .map_err(|_| FetchError::ConnectionFailed)?;

        let sample = httpdate::fetch_over(&mut socket, &mut Delay, &UptimeTicks).await?;
        // Header parsed; drop the rest of the response.
        socket.close();
        Ok(sample)
    }
}

impl Default for TimeClient {
    fn default() -> Self {
        Self::new()
    }
}
