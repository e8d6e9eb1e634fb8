#![deny(unsafe_code)]
#![deny(warnings)]
//! Network time fetch via the HTTP `Date` response header
//!
//! The upstream time source is a plain HTTP server: the client sends a
//! minimal `GET /` request and scans the response for a `Date:` header in
//! RFC-1123 form, e.g.
//!
//! ```text
//! Date: Thu, 19 Nov 2015 20:25:40 GMT
//! ```
//!
//! The day, month name, year, hour, minute and second sit at fixed
//! character offsets within that line. The offsets are a bit-exact
//! contract with the upstream response format and are preserved as-is;
//! all of the fragility is isolated in [`parse_date_header`].
//!
//! The transport is anything implementing the `embedded-io-async`
//! `Read`/`Write` traits; the board crate owns DNS resolution and the TCP
//! connect (mapping connect failures to [`FetchError::ConnectionFailed`])
//! and hands the connected socket in. Unlike the response-availability
//! wait, the inner read loop is also bounded: a stalled peer yields
//! [`FetchError::NoRecognizableHeader`] after [`STALL_TIMEOUT_MS`] instead of hanging
//! the whole device.

use embassy_futures::select::{select, Either};
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Read, Write};
use heapless::Vec;

use super::calendar::{days_from_civil, SECS_PER_DAY};

/// Well-known HTTP time source.
pub const TIME_HOST: &str = "www.google.com";
/// Plain HTTP port of the time source.
pub const TIME_PORT: u16 = 80;
/// The fixed request sent after connecting.
pub const TIME_REQUEST: &[u8] = b"GET / HTTP/1.1\r\nHost: www.google.com\r\nConnection: close\r\n\r\n";

/// Response-availability poll attempts before giving up.
const POLL_ATTEMPTS: u32 = 10;
/// Delay between availability polls.
const POLL_DELAY_MS: u32 = 1_000;
/// Upper bound on a single read once the response has started streaming.
pub const STALL_TIMEOUT_MS: u32 = 5_000;
/// Longest header line kept for inspection; the date header is far shorter.
const LINE_MAX: usize = 128;

/// Free-running millisecond counter, independent of wall-clock time.
///
/// The counter is expected to wrap; all elapsed-time math is done in
/// wrapping u32 arithmetic.
pub trait TickSource {
    fn ticks_ms(&self) -> u32;
}

/// Time fetch errors. All are non-fatal: the scheduler retries on the
/// next qualifying evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FetchError {
    /// TCP connect failed or the connection broke mid-transfer
    ConnectionFailed,
    /// Response never became available within the bounded poll count
    Timeout,
    /// Connection closed or stalled without a recognizable date header
    NoRecognizableHeader,
}

impl core::fmt::Display for FetchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "connection failed"),
            Self::Timeout => write!(f, "response timeout"),
            Self::NoRecognizableHeader => write!(f, "no recognizable date header"),
        }
    }
}

impl core::error::Error for FetchError {}

/// One captured network time sample. Replaced wholesale on each fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapturedTimeSample {
    /// Seconds since midnight UTC at the capture instant
    pub local_epoch_secs: i64,
    /// Tick value read at the instant the header was parsed; zero-point
    /// for monotonic projection
    pub capture_tick_ms: u32,
    /// Full calendar epoch at the capture instant
    pub unix_epoch_secs: i64,
    /// Set when the month name was not recognized and defaulted to
    /// January (historical fall-through, surfaced instead of silent)
    pub low_confidence: bool,
}

/// The fields extracted from one date header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub low_confidence: bool,
}

impl ParsedDate {
    /// Build the sample, stamping it with the tick read at parse time.
    pub fn into_sample(self, capture_tick_ms: u32) -> CapturedTimeSample {
        let local_epoch_secs =
            self.hour as i64 * 3_600 + self.minute as i64 * 60 + self.second as i64;
        CapturedTimeSample {
            local_epoch_secs,
            capture_tick_ms,
            unix_epoch_secs: days_from_civil(self.year, self.month, self.day) * SECS_PER_DAY
                + local_epoch_secs,
            low_confidence: self.low_confidence,
        }
    }
}

/// Parse one response line as a date header.
///
/// Fixed offsets within the line: day 11–13, month name 14–17, year
/// 18–22, hour 23–25, minute 26–28, second 29–31. Returns `None` for
/// lines that are not a date header or carry non-digits where digits are
/// expected.
pub fn parse_date_header(line: &[u8]) -> Option<ParsedDate> {
    if line.len() < 32 || !line[..6].eq_ignore_ascii_case(b"DATE: ") {
        return None;
    }
    let day = ascii_number(&line[11..13])? as u8;
    let (month, low_confidence) = month_from_name(&line[14..17]);
    let year = ascii_number(&line[18..22])? as i32;
    let hour = ascii_number(&line[23..25])? as u8;
    let minute = ascii_number(&line[26..28])? as u8;
    let second = ascii_number(&line[29..31])? as u8;
    Some(ParsedDate {
        year,
        month,
        day,
        hour,
        minute,
        second,
        low_confidence,
    })
}

fn ascii_number(digits: &[u8]) -> Option<u32> {
    let mut value = 0u32;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + (b - b'0') as u32;
    }
    Some(value)
}

/// Three-letter month name to month number.
///
/// An unrecognized name maps to January with the low-confidence flag set,
/// matching the historical behavior of the format.
fn month_from_name(name: &[u8]) -> (u8, bool) {
    const MONTHS: [&[u8; 3]; 12] = [
        b"JAN", b"FEB", b"MAR", b"APR", b"MAY", b"JUN", b"JUL", b"AUG", b"SEP", b"OCT", b"NOV",
        b"DEC",
    ];
    for (i, m) in MONTHS.iter().enumerate() {
        if name.eq_ignore_ascii_case(&m[..]) {
            return (i as u8 + 1, false);
        }
    }
    (1, true)
}

/// Fetch a time sample over an already-connected transport.
///
/// Sends the fixed request, waits for response availability (bounded poll
/// count), then scans lines for the date header. Returns immediately on a
/// successful parse without draining the rest of the response; the caller
/// closes the connection.
pub async fn fetch_over<C, D, T>(
    conn: &mut C,
    delay: &mut D,
    ticks: &T,
) -> Result<CapturedTimeSample, FetchError>
where
    C: Read + Write,
    D: DelayNs,
    T: TickSource,
{
    conn.write_all(TIME_REQUEST)
        .await
        .map_err(|_| FetchError::ConnectionFailed)?;
    conn.flush().await.map_err(|_| FetchError::ConnectionFailed)?;

    let mut buf = [0u8; 256];

    // Wait for the first response bytes, one poll interval at a time.
    let mut attempts = 0u32;
    let mut got = loop {
        match select(conn.read(&mut buf), delay.delay_ms(POLL_DELAY_MS)).await {
            Either::First(Ok(0)) => return Err(FetchError::NoRecognizableHeader),
            Either::First(Ok(n)) => break n,
            Either::First(Err(_)) => return Err(FetchError::ConnectionFailed),
            Either::Second(()) => {
                attempts += 1;
                if attempts >= POLL_ATTEMPTS {
                    return Err(FetchError::Timeout);
                }
            }
        }
    };

    let mut line: Vec<u8, LINE_MAX> = Vec::new();
    loop {
        for &byte in &buf[..got] {
            if byte == b'\n' {
                if let Some(parsed) = parse_date_header(&line) {
                    return Ok(parsed.into_sample(ticks.ticks_ms()));
                }
                line.clear();
            } else if byte != b'\r' {
                // Overlong lines truncate; the date header always fits.
                let _ = line.push(byte);
            }
        }
        got = match select(conn.read(&mut buf), delay.delay_ms(STALL_TIMEOUT_MS)).await {
            Either::First(Ok(0)) => return Err(FetchError::NoRecognizableHeader),
            Either::First(Ok(n)) => n,
            Either::First(Err(_)) => return Err(FetchError::ConnectionFailed),
            // Stalled peer: give up instead of blocking the whole device.
            Either::Second(()) => return Err(FetchError::NoRecognizableHeader),
        };
    }
}
