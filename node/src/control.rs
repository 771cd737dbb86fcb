//! Running flag and shutdown signal shared by a node's two activities.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Per-node run state. Starts running; flips to stopped exactly once.
#[derive(Debug)]
pub struct Control {
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl Control {
    pub fn new() -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self { running: AtomicBool::new(true), shutdown })
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Request a stop. Returns `true` only for the call that performed it.
    pub fn stop(&self) -> bool {
        if !self.running.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.shutdown.send_replace(true);
        true
    }

    /// Receiver that resolves `changed()` once the node is stopped.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

/// Wait until `rx` observes a stop, or until the sender is gone.
pub async fn stopped(rx: &mut watch::Receiver<bool>) {
    // wait_for returns immediately when the value is already true
    let _ = rx.wait_for(|stopped| *stopped).await;
}

/// Cloneable handle used to stop a running node from anywhere.
#[derive(Debug, Clone)]
pub struct StopHandle(pub(crate) Arc<Control>);

impl StopHandle {
    /// Idempotent: the second and later calls change nothing.
    pub fn stop(&self) -> bool {
        self.0.stop()
    }

    pub fn is_running(&self) -> bool {
        self.0.is_running()
    }
}
