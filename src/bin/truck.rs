//! Truck role: docks, waits for its departure order, delivers, returns.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use dockvisor::state::Role;
use dockvisor::{install_signal_handlers, Config, IpcContext, SessionRegistry, ShutdownToken, Truck};

/// Delivery truck.
#[derive(Parser, Debug)]
#[command(name = "truck", version, about, long_about = None)]
struct Args {
    /// Truck id.
    #[arg(default_value_t = 1)]
    id: u32,
}

fn main() -> ExitCode {
    let args = Args::parse();
    dockvisor::init_logging(&format!("truck-{}", args.id));

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
    if let Err(e) = sessions.login(&format!("Truck_{}", args.id), Role::OPERATOR, 0, 1) {
        error!(error = %e, "login failed");
        return ExitCode::FAILURE;
    }
    info!(truck = args.id, "driver logged in, heading to the dock");

    let mut truck = Truck::new(&ctx, cfg.seed_for(u64::from(args.id) | 0x7_0000));
    let result = truck.run();

    if let Err(e) = sessions.logout() {
        error!(error = %e, "logout failed");
    }
    match result {
        Ok(()) => {
            info!("truck finished the shift cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "truck terminated with an error");
            ExitCode::FAILURE
        }
    }
}
