//! Worker role: logs in, registers on the belt, and produces packages
//! until the shift ends.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use dockvisor::state::Role;
use dockvisor::{install_signal_handlers, Config, IpcContext, SessionRegistry, ShutdownToken, Worker};

/// Belt worker (producer).
#[derive(Parser, Debug)]
#[command(name = "worker", version, about, long_about = None)]
struct Args {
    /// Worker id; defaults to a pid-derived one.
    id: Option<u32>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let worker_id = args.id.unwrap_or_else(|| std::process::id() % 1000);
    dockvisor::init_logging(&format!("worker-{worker_id}"));

    let token = ShutdownToken::new();
    if let Err(e) = install_signal_handlers(&token) {
        error!(error = %e, "could not install signal handlers");
        return ExitCode::FAILURE;
    }

    let cfg = Config::default();
    let ctx = match IpcContext::attach(&cfg, token) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = %e, "could not attach to the warehouse");
            return ExitCode::FAILURE;
        }
    };

    let mut sessions = SessionRegistry::new(&ctx);
    if let Err(e) = sessions.login(&format!("Worker_{worker_id}"), Role::OPERATOR, 0, 10) {
        error!(error = %e, "login failed");
        return ExitCode::FAILURE;
    }

    let mut worker = Worker::new(
        &ctx,
        worker_id,
        cfg.worker_think_time,
        cfg.quota_retry_delay,
        cfg.seed_for(u64::from(worker_id)),
    );
    let result = worker.run(&sessions);

    if let Err(e) = sessions.logout() {
        error!(error = %e, "logout failed");
    }
    match result {
        Ok(()) => {
            info!("worker finished cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "worker terminated with an error");
            ExitCode::FAILURE
        }
    }
}
