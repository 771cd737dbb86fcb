//! Node lifecycle: listener task plus the tick-driven cycle loop.

use crate::config::NodeConfig;
use crate::control::{stopped, Control, StopHandle};
use crate::cycle::CycleEngine;
use crate::error::NodeError;
use crate::inbox::Inbox;
use crate::listener::Listener;
use crate::messenger::Messenger;
use crate::sink::{EventSink, FileSink, MemorySink};
use helper::TickRate;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{info, warn};

/// Outcome of [`VirtualMachine::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub id: u32,
    pub tick_rate: TickRate,
    pub cycles: u64,
    pub final_clock: u64,
}

/// One simulated machine: identity, listener, cycle engine and run state.
pub struct VirtualMachine {
    id: u32,
    address: SocketAddr,
    tick_rate: TickRate,
    run_duration: Duration,
    control: Arc<Control>,
    engine: CycleEngine,
    listener: Option<Listener>,
    listener_task: Option<JoinHandle<()>>,
}

impl VirtualMachine {
    /// Validate `config`, bind the listener and open the event log.
    ///
    /// With `log_dir` set the log goes to `vm_<id>_log.txt`, otherwise to memory.
    pub async fn bind(config: NodeConfig) -> Result<Self, NodeError> {
        let tick_rate = config.validate()?;
        let listener = Listener::bind(config.id, config.address, config.read_timeout).await?;
        let address = listener.local_addr().map_err(|source| NodeError::Bind { addr: config.address, source })?;
        let sink: Box<dyn EventSink> = match config.log_path() {
            Some(path) => {
                let header = format!(
                    "VM ID: {}, Address: {}, Clock Speed: {} ticks/sec",
                    config.id, address, tick_rate
                );
                Box::new(FileSink::create(&path, &header)?)
            }
            None => Box::new(MemorySink::new()),
        };
        Ok(Self::assemble(config, tick_rate, listener, address, sink))
    }

    /// Like [`bind`](Self::bind), but events go to `sink`.
    pub async fn bind_with_sink(config: NodeConfig, sink: Box<dyn EventSink>) -> Result<Self, NodeError> {
        let tick_rate = config.validate()?;
        let listener = Listener::bind(config.id, config.address, config.read_timeout).await?;
        let address = listener.local_addr().map_err(|source| NodeError::Bind { addr: config.address, source })?;
        Ok(Self::assemble(config, tick_rate, listener, address, sink))
    }

    fn assemble(
        config: NodeConfig,
        tick_rate: TickRate,
        listener: Listener,
        address: SocketAddr,
        sink: Box<dyn EventSink>,
    ) -> Self {
        let messenger = Messenger::new(config.id, config.send_timeout);
        let engine = CycleEngine::new(config.id, config.peers, Inbox::new(), messenger, sink);
        Self {
            id: config.id,
            address,
            tick_rate,
            run_duration: config.run_duration,
            control: Control::new(),
            engine,
            listener: Some(listener),
            listener_task: None,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// The bound address, with the real port when configured with port 0.
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn tick_rate(&self) -> TickRate {
        self.tick_rate
    }

    pub fn clock(&self) -> u64 {
        self.engine.clock()
    }

    pub fn inbox(&self) -> &Inbox {
        self.engine.inbox()
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.control.clone())
    }

    /// Direct access to the engine, for driving cycles by hand.
    pub fn engine_mut(&mut self) -> &mut CycleEngine {
        &mut self.engine
    }

    /// Spawn the listener task. Later calls do nothing.
    pub fn start_listener(&mut self) {
        if let Some(listener) = self.listener.take() {
            let inbox = self.engine.inbox().clone();
            self.listener_task = Some(tokio::spawn(listener.run(inbox, self.control.clone())));
        }
    }

    /// Run cycles every `1 / tick_rate` seconds until stopped or out of budget.
    pub async fn run(mut self) -> RunSummary {
        info!(
            vm = self.id,
            address = %self.address,
            tick_rate = self.tick_rate.get(),
            peers = ?self.engine.peers(),
            "starting"
        );
        self.start_listener();

        let started = Instant::now();
        let interval = self.tick_rate.interval();
        let mut shutdown = self.control.subscribe();
        let mut cycles = 0u64;
        while self.control.is_running() && started.elapsed() <= self.run_duration {
            self.engine.step().await;
            cycles += 1;
            tokio::select! {
                _ = time::sleep(interval) => {}
                _ = stopped(&mut shutdown) => break,
            }
        }
        self.stop().await;

        let summary = RunSummary { id: self.id, tick_rate: self.tick_rate, cycles, final_clock: self.engine.clock() };
        info!(vm = self.id, cycles, final_clock = summary.final_clock, "stopped");
        summary
    }

    /// Stop the node, wait for the listener to release its socket, close the log.
    /// Safe to call any number of times.
    pub async fn stop(&mut self) {
        self.control.stop();
        if let Some(task) = self.listener_task.take() {
            if let Err(e) = task.await {
                warn!(vm = self.id, error = %e, "listener task failed");
            }
        }
        self.listener = None;
        self.engine.close_sink();
    }
}

impl Drop for VirtualMachine {
    fn drop(&mut self) {
        // lets a still-spawned listener task exit
        self.control.stop();
    }
}
