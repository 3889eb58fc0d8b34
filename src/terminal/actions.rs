//! Role-checked command handlers.
//!
//! Handlers return an [`ActionOutcome`] instead of printing, so the console
//! owns all rendering and tests can assert on dispatch behavior directly.

use tracing::{error, warn};

use crate::error::IpcError;
use crate::ipc::{Command, Ipc, RecipientTag};
use crate::state::Role;

/// The express role's well-known session name.
pub(crate) const EXPRESS_SESSION: &str = "System-Express";

/// What a command handler did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The command was emitted to its target(s).
    Sent,
    /// The caller's role mask lacks the required role.
    PermissionDenied { required: &'static str },
    /// The target is not available (no express session, empty dock).
    TargetOffline { target: &'static str },
}

/// `vip`: asks the express role for a batch delivery.
/// Requires Operator ∨ SysAdmin.
pub fn handle_vip<I: Ipc>(ctx: &I, role: Role) -> Result<ActionOutcome, IpcError> {
    if !role.any_of(Role::OPERATOR | Role::SYS_ADMIN) {
        return Ok(ActionOutcome::PermissionDenied {
            required: "Operator",
        });
    }
    let Some(pid) = ctx.with_belt(|s| s.find_session_pid(EXPRESS_SESSION))? else {
        return Ok(ActionOutcome::TargetOffline {
            target: "express handler",
        });
    };
    match ctx.send(RecipientTag::for_pid(pid), Command::ExpressLoad) {
        Ok(()) => Ok(ActionOutcome::Sent),
        Err(IpcError::QueueFull) => {
            warn!("vip command lost, queue full");
            Ok(ActionOutcome::Sent)
        }
        Err(e) => Err(e),
    }
}

/// `depart`: forces the docked truck to leave. Requires Operator ∨ SysAdmin.
pub fn handle_depart<I: Ipc>(ctx: &I, role: Role) -> Result<ActionOutcome, IpcError> {
    if !role.any_of(Role::OPERATOR | Role::SYS_ADMIN) {
        return Ok(ActionOutcome::PermissionDenied {
            required: "Operator",
        });
    }
    let Some(truck) = ctx.with_dock(|s| s.dock_truck.is_present.then_some(s.dock_truck.id))?
    else {
        return Ok(ActionOutcome::TargetOffline {
            target: "docked truck",
        });
    };
    match ctx.send(RecipientTag::for_pid(truck), Command::Departure) {
        Ok(()) => Ok(ActionOutcome::Sent),
        Err(IpcError::QueueFull) => {
            warn!(truck, "departure command lost, queue full");
            Ok(ActionOutcome::Sent)
        }
        Err(e) => Err(e),
    }
}

/// `stop`: the emergency stop. Requires SysAdmin.
///
/// Clears the shared `running` flag and broadcasts `END_WORK` to every
/// active session pid.
pub fn handle_stop<I: Ipc>(ctx: &I, role: Role) -> Result<ActionOutcome, IpcError> {
    if !role.contains(Role::SYS_ADMIN) {
        return Ok(ActionOutcome::PermissionDenied {
            required: "SysAdmin",
        });
    }
    error!("EMERGENCY STOP commanded from the console");
    ctx.request_halt();
    let pids = ctx.with_belt(|s| s.active_session_pids())?;
    for pid in pids {
        match ctx.send(RecipientTag::for_pid(pid), Command::EndWork) {
            Ok(()) | Err(IpcError::QueueFull) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(ActionOutcome::Sent)
}
