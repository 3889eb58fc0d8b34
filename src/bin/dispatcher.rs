//! Dispatcher role: consumes the belt and loads the docked truck.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use dockvisor::state::Role;
use dockvisor::{
    install_signal_handlers, Config, Dispatcher, IpcContext, SessionRegistry, ShutdownToken,
};

/// Belt dispatcher (consumer).
#[derive(Parser, Debug)]
#[command(name = "dispatcher", version, about, long_about = None)]
struct Args {
    /// Optional id, used for log naming only.
    id: Option<u32>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    dockvisor::init_logging(&match args.id {
        Some(id) => format!("dispatcher-{id}"),
        None => "dispatcher".to_string(),
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
    if let Err(e) = sessions.login("System-Dispatcher", Role::OPERATOR, 0, 1) {
        error!(error = %e, "login failed");
        return ExitCode::FAILURE;
    }

    let mut dispatcher = Dispatcher::new(&ctx, cfg.dock_backoff, cfg.seed_for(0xD15));
    let result = dispatcher.run();

    if let Err(e) = sessions.logout() {
        error!(error = %e, "logout failed");
    }
    match result {
        Ok(()) => {
            info!("dispatcher finished cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "dispatcher terminated with an error");
            ExitCode::FAILURE
        }
    }
}
