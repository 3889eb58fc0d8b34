//! # Cooperative cancellation for role processes.
//!
//! [`ShutdownToken`] is the explicit cancellation handle observed by every
//! blocking IPC wait: a semaphore or queue wait interrupted by a signal
//! checks the token and either retries transparently or returns
//! [`IpcError::ShuttingDown`](crate::error::IpcError::ShuttingDown).
//!
//! [`install_signal_handlers`] wires SIGINT/SIGTERM to the token **without**
//! `SA_RESTART`, so a signal reliably breaks a process out of `semop` or
//! `msgrcv` with `EINTR` instead of silently restarting the syscall.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::IpcError;

/// Token consulted by interrupted waits. Clones share one flag.
#[derive(Clone, Debug, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// The token the signal handler flips. Handlers may only touch atomics, so
/// the token is parked here before installation.
static SIGNAL_TOKEN: OnceLock<ShutdownToken> = OnceLock::new();

extern "C" fn on_signal(_signum: libc::c_int) {
    if let Some(token) = SIGNAL_TOKEN.get() {
        token.flag.store(true, Ordering::SeqCst);
    }
}

/// Routes SIGINT and SIGTERM to `token`.
///
/// Installs plain `sigaction` handlers with no `SA_RESTART`: blocking System-V
/// calls must come back with `EINTR` so the facade can observe the token.
/// Only the first installed token receives signals; later calls for a
/// different token fail with an invariant violation.
pub fn install_signal_handlers(token: &ShutdownToken) -> Result<(), IpcError> {
    let stored = SIGNAL_TOKEN.get_or_init(|| token.clone());
    if !Arc::ptr_eq(&stored.flag, &token.flag) {
        return Err(IpcError::InvariantViolation {
            detail: "signal handlers already routed to another token".into(),
        });
    }

    let handler: extern "C" fn(libc::c_int) = on_signal;
    for sig in [libc::SIGINT, libc::SIGTERM] {
        // Safety: sigaction with a handler that only stores to an atomic.
        let rc = unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = handler as libc::sighandler_t;
            libc::sigemptyset(&mut action.sa_mask);
            action.sa_flags = 0;
            libc::sigaction(sig, &action, std::ptr::null_mut())
        };
        if rc != 0 {
            return Err(IpcError::resource("sigaction"));
        }
    }
    Ok(())
}

/// Orchestrator-side wait for a termination signal.
///
/// Completes when SIGINT, SIGTERM, or SIGQUIT is received (Ctrl-C as a
/// fallback). Each call creates independent listeners.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}
