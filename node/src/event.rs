//! Per-cycle event records.

use helper::util::format_unix_nanos;
use std::fmt;
use std::net::SocketAddr;

/// What a cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Merged one inbound timestamp. `queue_len` is the backlog left after the pop.
    Received { queue_len: usize },
    /// Sent the clock to one peer. `target` is `None` when the peer slot was empty.
    SentSingle { target: Option<SocketAddr> },
    /// Sent the clock to every peer, as one logical event.
    Broadcast,
    Internal,
}

/// One cycle's outcome, as appended to the event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub kind: EventKind,
    /// Logical clock after this cycle's update.
    pub clock_after: u64,
    /// Unix nanoseconds when the event was emitted.
    pub wall_time: u64,
}

impl EventRecord {
    pub fn new(kind: EventKind, clock_after: u64) -> Self {
        Self { kind, clock_after, wall_time: helper::util::now_unix_nanos() }
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clock = self.clock_after;
        let time = format_unix_nanos(self.wall_time);
        match self.kind {
            EventKind::Received { queue_len } => write!(
                f,
                "Received message: Logical Clock = {clock}, System Time = {time}, Queue Length = {queue_len}"
            ),
            EventKind::SentSingle { target: Some(peer) } => {
                write!(f, "Sent message to {peer}: Logical Clock = {clock}, System Time = {time}")
            }
            EventKind::SentSingle { target: None } => {
                write!(f, "Sent message to <missing peer>: Logical Clock = {clock}, System Time = {time}")
            }
            EventKind::Broadcast => {
                write!(f, "Broadcast message: Logical Clock = {clock}, System Time = {time}")
            }
            EventKind::Internal => {
                write!(f, "Internal event: Logical Clock = {clock}, System Time = {time}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_kind() {
        let peer: SocketAddr = "127.0.0.1:6001".parse().unwrap();
        let rec = |kind| EventRecord { kind, clock_after: 6, wall_time: 2_000_000_000 };

        assert_eq!(
            rec(EventKind::Received { queue_len: 2 }).to_string(),
            "Received message: Logical Clock = 6, System Time = 2.000000, Queue Length = 2"
        );
        assert_eq!(
            rec(EventKind::SentSingle { target: Some(peer) }).to_string(),
            "Sent message to 127.0.0.1:6001: Logical Clock = 6, System Time = 2.000000"
        );
        assert!(rec(EventKind::Broadcast).to_string().starts_with("Broadcast message: Logical Clock = 6"));
        assert!(rec(EventKind::Internal).to_string().starts_with("Internal event: Logical Clock = 6"));
        assert!(!rec(EventKind::Internal).to_string().contains('\n'));
    }
}
