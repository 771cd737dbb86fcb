//! Construction parameters for one virtual machine.

use crate::error::NodeError;
use helper::TickRate;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default wall-clock run budget for a node.
pub const DEFAULT_RUN_DURATION: Duration = Duration::from_secs(60);

/// Default bound on connecting to a peer.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Default bound on reading one inbound payload.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Peers a full node needs: the cycle engine addresses `peers[0]` and `peers[1]`.
pub const MIN_PEERS: usize = 2;

/// Configuration for a single virtual machine.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Node identifier, used in logs and the log file name.
    pub id: u32,

    /// Address the listener binds. Port 0 picks an ephemeral port.
    pub address: SocketAddr,

    /// Peer addresses in send order, excluding this node.
    pub peers: Vec<SocketAddr>,

    /// Fixed tick rate. `None` draws one uniformly from 1..=6.
    pub tick_rate: Option<u8>,

    /// How long the cycle loop runs before stopping itself.
    pub run_duration: Duration,

    /// Connect/write bound for outbound messages.
    pub send_timeout: Duration,

    /// Read bound for one inbound connection.
    pub read_timeout: Duration,

    /// Directory for `vm_<id>_log.txt`. `None` keeps events in memory only.
    pub log_dir: Option<PathBuf>,
}

impl NodeConfig {
    /// Create a new node configuration with default timing.
    pub fn new(id: u32, address: SocketAddr, peers: Vec<SocketAddr>) -> Self {
        Self {
            id,
            address,
            peers,
            tick_rate: None,
            run_duration: DEFAULT_RUN_DURATION,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            log_dir: None,
        }
    }

    /// Fix the tick rate instead of drawing it at random.
    pub fn with_tick_rate(mut self, rate: u8) -> Self {
        self.tick_rate = Some(rate);
        self
    }

    /// Set the run budget.
    pub fn with_run_duration(mut self, duration: Duration) -> Self {
        self.run_duration = duration;
        self
    }

    /// Set the outbound connect/write bound.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the inbound read bound.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Write the event log under `dir`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Check peers and resolve the tick rate.
    pub fn validate(&self) -> Result<TickRate, NodeError> {
        if self.peers.len() < MIN_PEERS {
            return Err(NodeError::NotEnoughPeers { required: MIN_PEERS, actual: self.peers.len() });
        }
        if self.address.port() != 0 && self.peers.contains(&self.address) {
            return Err(NodeError::SelfInPeers(self.id));
        }
        match self.tick_rate {
            Some(rate) => TickRate::new(rate).ok_or(NodeError::InvalidTickRate(rate)),
            None => Ok(TickRate::random(&mut rand::rng())),
        }
    }

    /// Log file path, when file logging is configured.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| dir.join(format!("vm_{}_log.txt", self.id)))
    }
}

/// Addresses for `count` nodes on consecutive ports of one host.
pub fn cluster_addresses(host: std::net::IpAddr, base_port: u16, count: u16) -> Vec<SocketAddr> {
    (0..count).map(|i| SocketAddr::new(host, base_port + i)).collect()
}

/// One config per address; each node's peers are all other addresses, in order.
pub fn cluster_configs(addresses: &[SocketAddr]) -> Vec<NodeConfig> {
    addresses
        .iter()
        .enumerate()
        .map(|(i, &address)| {
            let peers = addresses.iter().copied().filter(|&a| a != address).collect();
            NodeConfig::new(i as u32, address, peers)
        })
        .collect()
}
