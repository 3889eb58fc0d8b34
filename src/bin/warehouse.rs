//! Orchestrator entry point: creates the IPC resources, spawns the role
//! processes, and reclaims everything on shutdown.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use dockvisor::{Config, LogWriter, Subscribe, Supervisor};

/// Warehouse orchestrator.
#[derive(Parser, Debug)]
#[command(name = "warehouse", version, about, long_about = None)]
struct Args {
    /// Optional run id, used for log naming only.
    id: Option<u32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    dockvisor::init_logging(&match args.id {
        Some(id) => format!("warehouse-{id}"),
        None => "warehouse".to_string(),
    });

    let cfg = Config::from_env();
    info!(
        workers = cfg.workers,
        trucks = cfg.trucks,
        belt_capacity = cfg.belt_capacity,
        "warehouse system initializing"
    );

    let supervisor = Supervisor::new(cfg, vec![Arc::new(LogWriter) as Arc<dyn Subscribe>]);
    match supervisor.run().await {
        Ok(()) => {
            info!("warehouse shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "warehouse terminated with an error");
            ExitCode::FAILURE
        }
    }
}
