//! Outbound side: one short-lived connection per message.

use crate::error::NodeError;
use helper::wire;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, warn};

/// Sends timestamps to peers. Fire-and-forget: no retry, no acknowledgement.
#[derive(Debug, Clone)]
pub struct Messenger {
    vm: u32,
    timeout: Duration,
}

impl Messenger {
    pub fn new(vm: u32, timeout: Duration) -> Self {
        Self { vm, timeout }
    }

    /// Connect, write `clock` as the whole payload, close.
    pub async fn send(&self, peer: SocketAddr, clock: u64) -> Result<(), NodeError> {
        let payload = wire::encode(clock);
        let attempt = async {
            let mut stream = TcpStream::connect(peer).await?;
            stream.write_all(&payload).await?;
            stream.shutdown().await
        };
        match time::timeout(self.timeout, attempt).await {
            Ok(res) => res.map_err(|source| NodeError::Send { peer, source }),
            Err(_) => Err(NodeError::Send { peer, source: io::ErrorKind::TimedOut.into() }),
        }
    }

    /// `send`, with failures logged and absorbed. Returns whether it went out.
    pub async fn deliver(&self, peer: SocketAddr, clock: u64) -> bool {
        match self.send(peer, clock).await {
            Ok(()) => {
                debug!(vm = self.vm, %peer, clock, "sent timestamp");
                true
            }
            Err(e) => {
                warn!(vm = self.vm, error = %e, "send failed");
                false
            }
        }
    }
}
