//! # Structured log subscriber.
//!
//! [`LogWriter`] forwards orchestrator events to the process's tracing
//! subscriber, one line per event.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Built-in subscriber writing events through `tracing`.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let role = e.role.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::ResourcesReady => info!("ipc resources created, spawning roles"),
            EventKind::RoleSpawned => info!(role, pid = e.pid, "role spawned"),
            EventKind::RoleExited => info!(role, exit_code = e.exit_code, "role exited"),
            EventKind::RoleFailed => {
                warn!(role, exit_code = e.exit_code, error = e.error.as_deref(), "role failed")
            }
            EventKind::ShutdownRequested => warn!("shutdown requested"),
            EventKind::AllStoppedWithin => info!("all roles stopped within grace"),
            EventKind::GraceExceeded => error!("grace period exceeded"),
            EventKind::SubscriberPanicked => {
                error!(subscriber = role, error = e.error.as_deref(), "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
