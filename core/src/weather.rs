#![deny(unsafe_code)]
#![deny(warnings)]
//! Field extraction for the weather collaborator's responses
//!
//! The upstream weather service reports sunrise and sunset as epoch
//! seconds inside a JSON body. The scheduler consumes exactly those two
//! numbers as decimal strings, so extraction is a plain byte scan for
//! the quoted key followed by a digit run; no JSON parser is involved
//! and anything else in the body is ignored.

use heapless::String;

/// Extract the digit run that follows `key` in `body`.
///
/// Returns `None` when the key is absent, when no digit follows it, or
/// when the digit run does not fit in `N` characters.
pub fn scan_epoch_field<const N: usize>(body: &[u8], key: &str) -> Option<String<N>> {
    let pattern = key.as_bytes();
    let at = body
        .windows(pattern.len())
        .position(|window| window == pattern)?
        + pattern.len();
    let len = body[at..].iter().take_while(|b| b.is_ascii_digit()).count();
    if len == 0 {
        return None;
    }
    let mut value: String<N> = String::new();
    value
        .push_str(core::str::from_utf8(&body[at..at + len]).ok()?)
        .ok()?;
    Some(value)
}
