//! Per-tick decision procedure.
//!
//! One call to [`CycleEngine::step`] is one simulation step and emits exactly
//! one [`EventRecord`]:
//!
//! 1. If the inbox holds a timestamp `t`, pop it and merge:
//!    `clock = max(clock, t) + 1`.
//! 2. Otherwise draw an [`Action`] from [`ACTION_WEIGHTS`], tick the clock,
//!    and only then send, so the transmitted value already counts this event.
//!
//! A broadcast is one logical event: one tick, one record, N sends.

use crate::event::{EventKind, EventRecord};
use crate::inbox::Inbox;
use crate::messenger::Messenger;
use crate::sink::EventSink;
use helper::LamportClock;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::SocketAddr;
use tracing::{debug, warn};

/// What a cycle does when no message is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    SendToFirst,
    SendToSecond,
    Broadcast,
    Internal,
}

/// Relative weights out of [`ACTION_WEIGHT_TOTAL`]: sends 2/10, broadcast 1/10, internal 7/10.
pub const ACTION_WEIGHTS: [(Action, u32); 4] = [
    (Action::SendToFirst, 1),
    (Action::SendToSecond, 1),
    (Action::Broadcast, 1),
    (Action::Internal, 7),
];

pub const ACTION_WEIGHT_TOTAL: u32 = {
    let mut total = 0;
    let mut i = 0;
    while i < ACTION_WEIGHTS.len() {
        total += ACTION_WEIGHTS[i].1;
        i += 1;
    }
    total
};

/// Uniform draw over the weight table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionTable;

impl Distribution<Action> for ActionTable {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        let mut roll = rng.random_range(0..ACTION_WEIGHT_TOTAL);
        for (action, weight) in ACTION_WEIGHTS {
            if roll < weight {
                return action;
            }
            roll -= weight;
        }
        unreachable!("roll is below the sum of the weights")
    }
}

/// The clock, the peers and everything a cycle touches.
///
/// Only this type writes the clock, so it needs no lock.
pub struct CycleEngine<R = StdRng> {
    vm: u32,
    clock: LamportClock,
    peers: Vec<SocketAddr>,
    inbox: Inbox,
    messenger: Messenger,
    sink: Option<Box<dyn EventSink>>,
    rng: R,
}

impl CycleEngine<StdRng> {
    pub fn new(
        vm: u32,
        peers: Vec<SocketAddr>,
        inbox: Inbox,
        messenger: Messenger,
        sink: Box<dyn EventSink>,
    ) -> Self {
        Self::with_rng(vm, peers, inbox, messenger, sink, StdRng::from_os_rng())
    }
}

impl<R: Rng> CycleEngine<R> {
    pub fn with_rng(
        vm: u32,
        peers: Vec<SocketAddr>,
        inbox: Inbox,
        messenger: Messenger,
        sink: Box<dyn EventSink>,
        rng: R,
    ) -> Self {
        Self { vm, clock: LamportClock::new(), peers, inbox, messenger, sink: Some(sink), rng }
    }

    /// Overwrite the clock. Meant for setting up a node before it runs.
    pub fn set_clock(&mut self, clock: u64) {
        self.clock = LamportClock::starting_at(clock);
    }

    pub fn clock(&self) -> u64 {
        self.clock.now()
    }

    pub fn peers(&self) -> &[SocketAddr] {
        &self.peers
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    /// Run one cycle. Never blocks on an empty inbox.
    pub async fn step(&mut self) -> EventRecord {
        if let Some((remote, queue_len)) = self.inbox.pop() {
            let clock = self.clock.recv_event(remote);
            debug!(vm = self.vm, remote, clock, queue_len, "merged timestamp");
            return self.emit(EventKind::Received { queue_len }, clock);
        }
        let action = ActionTable.sample(&mut self.rng);
        self.act(action).await
    }

    /// Run one non-receiving cycle with a fixed action, ignoring the inbox.
    pub async fn step_with(&mut self, action: Action) -> EventRecord {
        self.act(action).await
    }

    async fn act(&mut self, action: Action) -> EventRecord {
        let clock = self.clock.send_event();
        let kind = match action {
            Action::SendToFirst => EventKind::SentSingle { target: self.send_to_index(0, clock).await },
            Action::SendToSecond => EventKind::SentSingle { target: self.send_to_index(1, clock).await },
            Action::Broadcast => {
                for &peer in &self.peers {
                    self.messenger.deliver(peer, clock).await;
                }
                EventKind::Broadcast
            }
            Action::Internal => EventKind::Internal,
        };
        self.emit(kind, clock)
    }

    async fn send_to_index(&mut self, index: usize, clock: u64) -> Option<SocketAddr> {
        let Some(&peer) = self.peers.get(index) else {
            warn!(vm = self.vm, index, peers = self.peers.len(), "no peer at index, nothing sent");
            return None;
        };
        self.messenger.deliver(peer, clock).await;
        Some(peer)
    }

    fn emit(&mut self, kind: EventKind, clock: u64) -> EventRecord {
        let record = EventRecord::new(kind, clock);
        match self.sink.as_mut() {
            Some(sink) => {
                if let Err(e) = sink.record(&record) {
                    warn!(vm = self.vm, error = %e, "event log write failed");
                }
            }
            None => warn!(vm = self.vm, "event emitted after the log was closed"),
        }
        record
    }

    /// Close the sink. Only the first call reaches it.
    pub fn close_sink(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.close() {
                warn!(vm = self.vm, error = %e, "closing event log failed");
            }
        }
    }
}
