//! Timestamp wire format: one connection carries one decimal ASCII integer.
//!
//! There is no header, delimiter or length prefix. The sender writes the digits
//! and closes the connection; the receiver reads until EOF.

use thiserror::Error;

/// Upper bound on bytes read from one connection.
pub const MAX_PAYLOAD_LEN: usize = 1024;

/// Errors that can occur while decoding a timestamp payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("empty payload")]
    Empty,
    #[error("payload is not valid UTF-8")]
    NotUtf8,
    #[error("payload {0:?} is not a non-negative integer")]
    Invalid(String),
}

/// Encode a logical clock value as its decimal digits.
pub fn encode(clock: u64) -> Vec<u8> {
    clock.to_string().into_bytes()
}

/// Decode a payload into a logical clock value.
/// Surrounding ASCII whitespace is ignored; anything but digits is rejected.
pub fn decode(data: &[u8]) -> Result<u64, WireError> {
    let text = core::str::from_utf8(data).map_err(|_| WireError::NotUtf8)?;
    let text = text.trim_ascii();
    if text.is_empty() {
        return Err(WireError::Empty);
    }
    // u64::from_str accepts a leading '+'
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WireError::Invalid(text.to_owned()));
    }
    text.parse().map_err(|_| WireError::Invalid(text.to_owned()))
}
