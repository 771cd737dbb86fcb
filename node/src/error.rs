//! Error types for the node library.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors surfaced by node construction and by the I/O edges.
///
/// Runtime failures inside the listener and the cycle loop are logged and
/// absorbed; only construction hands these back to callers.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to send to {peer}: {source}")]
    Send {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("event sink error: {0}")]
    Sink(#[from] io::Error),

    #[error("node needs at least {required} peers, got {actual}")]
    NotEnoughPeers { required: usize, actual: usize },

    #[error("peer list of node {0} contains its own address")]
    SelfInPeers(u32),

    #[error("tick rate {0} outside 1..=6")]
    InvalidTickRate(u8),
}
