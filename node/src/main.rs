//! Lamport VM simulator CLI
//!
//! Starts N virtual machines on consecutive ports of one host, each peered
//! with all the others, and lets them exchange logical-clock timestamps for
//! the run duration. Each node writes `vm_<id>_log.txt` in the log directory.
//!
//! ```bash
//! # three nodes on 6000..6002 for a minute
//! lamport-vm
//!
//! # five nodes, all at 4 ticks/sec, for 20 seconds
//! lamport-vm -n 5 --tick-rate 4 -d 20 --log-dir logs
//! ```

use clap::Parser;
use lamport_node::{cluster_addresses, cluster_configs, NodeError, VirtualMachine};
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lamport-vm")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of virtual machines
    #[arg(short = 'n', long, default_value = "3", value_parser = clap::value_parser!(u16).range(3..))]
    nodes: u16,

    /// Host all machines listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port of machine 0; machine i listens on base_port + i
    #[arg(short = 'p', long, default_value = "6000")]
    base_port: u16,

    /// Run duration in seconds
    #[arg(short = 'd', long, default_value = "60")]
    duration: u64,

    /// Fixed ticks per second for every machine (1-6). Random per machine when omitted.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=6))]
    tick_rate: Option<u8>,

    /// Directory for the per-machine log files
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,lamport_node=info")),
        )
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to create tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), NodeError> {
    if usize::from(args.base_port) + usize::from(args.nodes) > usize::from(u16::MAX) + 1 {
        return Err(NodeError::Bind {
            addr: (args.host, args.base_port).into(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "port range overflows"),
        });
    }
    let addresses = cluster_addresses(args.host, args.base_port, args.nodes);

    let mut vms = Vec::with_capacity(addresses.len());
    for mut config in cluster_configs(&addresses) {
        config = config
            .with_run_duration(Duration::from_secs(args.duration))
            .with_log_dir(&args.log_dir);
        if let Some(rate) = args.tick_rate {
            config = config.with_tick_rate(rate);
        }
        vms.push(VirtualMachine::bind(config).await?);
    }

    let stop_all: Vec<_> = vms.iter().map(|vm| vm.stop_handle()).collect();
    if let Err(e) = ctrlc::set_handler(move || {
        for handle in &stop_all {
            handle.stop();
        }
    }) {
        error!(error = %e, "failed to install Ctrl-C handler");
    }

    info!(nodes = vms.len(), duration_secs = args.duration, "starting simulation");
    let tasks: Vec<_> = vms.into_iter().map(|vm| tokio::spawn(vm.run())).collect();
    for task in tasks {
        match task.await {
            Ok(summary) => info!(
                vm = summary.id,
                tick_rate = summary.tick_rate.get(),
                cycles = summary.cycles,
                final_clock = summary.final_clock,
                "machine finished"
            ),
            Err(e) => error!(error = %e, "machine task failed"),
        }
    }
    Ok(())
}
