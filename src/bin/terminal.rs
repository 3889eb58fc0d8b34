//! Operator console: role-checked `vip`/`depart`/`stop` commands.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use dockvisor::state::Role;
use dockvisor::{
    install_signal_handlers, Config, Console, IpcContext, SessionRegistry, ShutdownToken,
};

/// Warehouse command console.
#[derive(Parser, Debug)]
#[command(name = "terminal", version, about, long_about = None)]
struct Args {
    /// Optional console id, used for the session name.
    id: Option<u32>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    dockvisor::init_logging("terminal");

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

    let name = match args.id {
        Some(id) => format!("AdminConsole-{id}"),
        None => "AdminConsole".to_string(),
    };
    let mut sessions = SessionRegistry::new(&ctx);
    if let Err(e) = sessions.login(&name, Role::OPERATOR | Role::SYS_ADMIN, 1, 1) {
        error!(error = %e, "login failed");
        return ExitCode::FAILURE;
    }

    let result = Console::new(&ctx, &sessions).run();

    if let Err(e) = sessions.logout() {
        error!(error = %e, "logout failed");
    }
    match result {
        Ok(()) => {
            info!("console closed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "console terminated with an error");
            ExitCode::FAILURE
        }
    }
}
