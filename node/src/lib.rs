//! Lamport VM simulator node.
//!
//! Each [`VirtualMachine`] listens for timestamps from its peers, runs a
//! tick-driven [`CycleEngine`] at its own rate, and logs one
//! [`EventRecord`] per cycle. Nodes share nothing but the network.

pub mod config;
pub mod control;
pub mod cycle;
pub mod error;
pub mod event;
pub mod inbox;
pub mod listener;
pub mod messenger;
pub mod sink;
pub mod vm;

pub use config::{cluster_addresses, cluster_configs, NodeConfig};
pub use control::StopHandle;
pub use cycle::{Action, ActionTable, CycleEngine, ACTION_WEIGHTS};
pub use error::NodeError;
pub use event::{EventKind, EventRecord};
pub use inbox::Inbox;
pub use listener::Listener;
pub use messenger::Messenger;
pub use sink::{EventSink, FileSink, MemorySink};
pub use vm::{RunSummary, VirtualMachine};
