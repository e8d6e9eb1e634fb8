#![deny(unsafe_code)]
#![deny(warnings)]
//! Weather data collaborator
//!
//! Fetches sunrise/sunset epochs from the weather service and holds the
//! content-source status the scheduler consumes. The service reports
//! epoch seconds inside a JSON body; field extraction lives in
//! `oledmon-core` and is a plain byte scan, so a schema change upstream
//! degrades to "night brightness" rather than corrupt values.

use core::fmt::Write as FmtWrite;

use defmt::{info, warn};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpEndpoint, Stack};
use heapless::String;

use oledmon_core::weather::scan_epoch_field;

const WEATHER_HOST: &str = "api.openweathermap.org";
const WEATHER_PORT: u16 = 80;
/// OpenWeatherMap city id (Vilnius).
const WEATHER_CITY_ID: &str = "593116";
/// Provisioned at build time; an empty key disables the weather fetch
/// and the panel stays at night brightness.
const WEATHER_API_KEY: &str = match option_env!("WEATHER_API_KEY") {
    Some(key) => key,
    None => "",
};

/// Weather fetch errors. Non-fatal: the next refresh cycle retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum WeatherError {
    /// DNS, connect or transfer failure
    ConnectionFailed,
    /// Response body carried no usable sunrise/sunset fields
    BadResponse,
}

impl core::fmt::Display for WeatherError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "connection failed"),
            Self::BadResponse => write!(f, "bad response"),
        }
    }
}

impl core::error::Error for WeatherError {}

pub struct WeatherSource {
    sunrise_epoch: String<12>,
    sunset_epoch: String<12>,
    busy: bool,
    operational: bool,
}

impl WeatherSource {
    pub fn new() -> Self {
        Self {
            sunrise_epoch: String::new(),
            sunset_epoch: String::new(),
            busy: false,
            operational: false,
        }
    }

    /// Local sunrise as a decimal epoch string, empty when unknown.
    pub fn sunrise(&self) -> &str {
        &self.sunrise_epoch
    }

    /// Local sunset as a decimal epoch string, empty when unknown.
    pub fn sunset(&self) -> &str {
        &self.sunset_epoch
    }

    /// A job is in progress on the content source.
    pub fn busy(&self) -> bool {
        self.busy
    }

    /// The content source answered its last poll.
    pub fn operational(&self) -> bool {
        self.operational
    }

    /// One fetch of the current conditions. Failures keep the previous
    /// sunrise/sunset values but drop the operational flag.
    pub async fn refresh(&mut self, stack: &Stack<'static>) {
        if WEATHER_API_KEY.is_empty() {
            return;
        }
        match self.fetch(stack).await {
            Ok(()) => {
                self.operational = true;
                info!(
                    "weather refreshed, sunrise {} sunset {}",
                    self.sunrise_epoch.as_str(),
                    self.sunset_epoch.as_str()
                );
            }
            Err(e) => {
                self.operational = false;
                warn!("weather fetch failed: {}", e);
            }
        }
    }

    async fn fetch(&mut self, stack: &Stack<'static>) -> Result<(), WeatherError> {
        let host_ip = stack
            .dns_query(WEATHER_HOST, DnsQueryType::A)
            .await
            .map_err(|_| WeatherError::ConnectionFailed)?
            .first()
            .copied()
            .ok_or(WeatherError::ConnectionFailed)?;

        let mut rx_buffer = [0u8; 2048];
        let mut tx_buffer = [0u8; 512];
        let mut socket = TcpSocket::new(*stack, &mut rx_buffer, &mut tx_buffer);
        socket
            .connect(IpEndpoint::new(host_ip, WEATHER_PORT))
            .await
            .map_err(|_| WeatherError::ConnectionFailed)?;

        let mut request: String<256> = String::new();
        let _ = write!(
            request,
            "GET /data/2.5/weather?id={}&appid={} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            WEATHER_CITY_ID, WEATHER_API_KEY, WEATHER_HOST
        );
        let mut remaining = request.as_bytes();
        while !remaining.is_empty() {
            let sent = socket
                .write(remaining)
                .await
                .map_err(|_| WeatherError::ConnectionFailed)?;
            remaining = &remaining[sent..];
        }

        // The sys block sits well inside the first 1.5 KiB of the body.
        let mut body = [0u8; 1536];
        let mut filled = 0;
        while filled < body.len() {
            match socket.read(&mut body[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(_) => return Err(WeatherError::ConnectionFailed),
            }
        }
        socket.close();

        let sunrise =
            scan_epoch_field(&body[..filled], "\"sunrise\":").ok_or(WeatherError::BadResponse)?;
        let sunset =
            scan_epoch_field(&body[..filled], "\"sunset\":").ok_or(WeatherError::BadResponse)?;
        self.sunrise_epoch = sunrise;
        self.sunset_epoch = sunset;
        Ok(())
    }
}

impl Default for WeatherSource {
    fn default() -> Self {
        Self::new()
    }
}
