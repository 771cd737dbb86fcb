//! Inbound side: accept one connection at a time and queue its timestamp.

use crate::control::{stopped, Control};
use crate::error::NodeError;
use crate::inbox::Inbox;
use helper::wire::{self, WireError, MAX_PAYLOAD_LEN};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time;
use tracing::{debug, warn};

/// Pause after a failed `accept`, so a persistent error (e.g. out of fds) does not spin.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// A bound listening socket for one node.
#[derive(Debug)]
pub struct Listener {
    vm: u32,
    socket: TcpListener,
    read_timeout: Duration,
}

impl Listener {
    /// Bind once. Port 0 picks an ephemeral port; see `local_addr`.
    pub async fn bind(vm: u32, addr: SocketAddr, read_timeout: Duration) -> Result<Self, NodeError> {
        let socket = TcpListener::bind(addr).await.map_err(|source| NodeError::Bind { addr, source })?;
        Ok(Self { vm, socket, read_timeout })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Accept loop. Returns once `control` is stopped; dropping `self` closes the socket.
    pub async fn run(self, inbox: Inbox, control: Arc<Control>) {
        let mut shutdown = control.subscribe();
        while control.is_running() {
            tokio::select! {
                res = self.socket.accept() => {
                    let (stream, from) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            self.accept_failed(&e).await;
                            continue;
                        }
                    };
                    self.handle(stream, from, &inbox).await;
                }
                _ = stopped(&mut shutdown) => break,
            }
        }
        debug!(vm = self.vm, "listener stopped");
    }

    async fn accept_failed(&self, error: &io::Error) {
        warn!(vm = self.vm, %error, "accept failed");
        time::sleep(ACCEPT_BACKOFF).await;
    }

    async fn handle(&self, mut stream: TcpStream, from: SocketAddr, inbox: &Inbox) {
        let mut buf = Vec::with_capacity(32);
        // one byte over the limit tells an oversized payload from a full one
        let mut limited = (&mut stream).take(MAX_PAYLOAD_LEN as u64 + 1);
        match time::timeout(self.read_timeout, limited.read_to_end(&mut buf)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                warn!(vm = self.vm, %from, error = %e, "read failed");
                return;
            }
            Err(_) => {
                warn!(vm = self.vm, %from, "read timed out");
                return;
            }
        }
        if buf.len() > MAX_PAYLOAD_LEN {
            warn!(vm = self.vm, %from, limit = MAX_PAYLOAD_LEN, "oversized payload discarded");
            return;
        }
        match wire::decode(&buf) {
            Ok(clock) => {
                debug!(vm = self.vm, %from, clock, "queued timestamp");
                inbox.push(clock);
            }
            Err(WireError::Empty) => debug!(vm = self.vm, %from, "empty payload discarded"),
            Err(e) => warn!(vm = self.vm, %from, error = %e, "malformed payload discarded"),
        }
    }
}
