//! Belt monitor role: periodic observability over the belt counters.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use dockvisor::state::Role;
use dockvisor::{
    install_signal_handlers, BeltMonitor, Config, IpcContext, SessionRegistry, ShutdownToken,
};

/// Belt observability surface.
#[derive(Parser, Debug)]
#[command(name = "belt-monitor", version, about, long_about = None)]
struct Args {
    /// Optional id, used for log naming only.
    id: Option<u32>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    dockvisor::init_logging(&match args.id {
        Some(id) => format!("belt-monitor-{id}"),
        None => "belt-monitor".to_string(),
    });

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
    if let Err(e) = sessions.login("System-Belt", Role::VIEWER, 0, 1) {
        error!(error = %e, "login failed");
        return ExitCode::FAILURE;
    }

    let monitor = BeltMonitor::new(&ctx);
    let result = monitor.run();

    if let Err(e) = sessions.logout() {
        error!(error = %e, "logout failed");
    }
    match result {
        Ok(()) => {
            info!("belt monitor finished cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "belt monitor terminated with an error");
            ExitCode::FAILURE
        }
    }
}
