//! Lamport logical clock and per-node tick rate.

use core::fmt;
use core::time::Duration;
use rand::Rng;

/// A Lamport clock owned by a single writer.
/// Use `tick()` for local events, `send_event()` before sending, and `recv_event()` on receive.
/// Saturates at `u64::MAX` instead of wrapping, so it never goes backwards.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LamportClock(u64);

impl LamportClock {
    /// Create a clock starting at 0.
    pub fn new() -> Self { Self::default() }

    /// Create a clock starting at `value`.
    pub fn starting_at(value: u64) -> Self { Self(value) }

    /// Read the current logical time.
    #[inline]
    pub fn now(&self) -> u64 { self.0 }

    /// Increment for a local event and return the new value.
    #[inline]
    pub fn tick(&mut self) -> u64 {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    /// Called immediately before sending a message. Increments and returns timestamp to embed.
    #[inline]
    pub fn send_event(&mut self) -> u64 { self.tick() }

    /// Called on receive with the sender's logical time; applies max rule and increments.
    pub fn recv_event(&mut self, remote_time: u64) -> u64 {
        self.0 = self.0.max(remote_time);
        self.tick()
    }
}

/// Lowest allowed tick rate (cycles per second).
pub const MIN_TICK_RATE: u8 = 1;
/// Highest allowed tick rate (cycles per second).
pub const MAX_TICK_RATE: u8 = 6;

/// Cycles per second a node executes. Always within `[MIN_TICK_RATE, MAX_TICK_RATE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TickRate(u8);

impl TickRate {
    /// Validate a fixed rate; returns `None` when out of range.
    pub fn new(rate: u8) -> Option<Self> {
        (MIN_TICK_RATE..=MAX_TICK_RATE).contains(&rate).then_some(Self(rate))
    }

    /// Draw a rate uniformly from the allowed range.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.random_range(MIN_TICK_RATE..=MAX_TICK_RATE))
    }

    #[inline]
    pub fn get(&self) -> u8 { self.0 }

    /// Wall-clock pause between two cycles: `1 / rate` seconds.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(1) / u32::from(self.0)
    }
}

impl fmt::Display for TickRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
