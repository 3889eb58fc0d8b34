//! Express role: stands by for VIP orders and loads the dock directly.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use dockvisor::state::Role;
use dockvisor::{
    install_signal_handlers, Config, Express, IpcContext, SessionRegistry, ShutdownToken,
};

/// Express (VIP bypass) handler.
#[derive(Parser, Debug)]
#[command(name = "express", version, about, long_about = None)]
struct Args {
    /// Optional id, used for log naming only.
    id: Option<u32>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    dockvisor::init_logging(&match args.id {
        Some(id) => format!("express-{id}"),
        None => "express".to_string(),
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
    if let Err(e) = sessions.login("System-Express", Role::OPERATOR, 0, 1) {
        error!(error = %e, "login failed, is another express handler running?");
        return ExitCode::FAILURE;
    }

    let mut express = Express::new(&ctx, cfg.dock_backoff, cfg.seed_for(0xE59));
    let result = express.run();

    if let Err(e) = sessions.logout() {
        error!(error = %e, "logout failed");
    }
    match result {
        Ok(()) => {
            info!("express finished cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "express terminated with an error");
            ExitCode::FAILURE
        }
    }
}
