//! Helper library for the Lamport VM simulator.
//! Provides:
//! - LamportClock and TickRate
//! - decimal timestamp wire codec
//! - common utilities for timing

pub mod clock;
pub mod util;
pub mod wire;

pub use clock::{LamportClock, TickRate};
pub use wire::{WireError, MAX_PAYLOAD_LEN};
