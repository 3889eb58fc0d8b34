//! # Session registry: the multi-process login table.
//!
//! Sessions bind a process id to a username, a role mask, and a spawn quota.
//! All registry updates serialize under the belt mutex, which doubles as the
//! registry mutex (the semaphore set's external interface is fixed at four
//! entries).
//!
//! ## Rules
//! - Active usernames are pairwise distinct; a duplicate login is rejected.
//! - Rows are zeroed before reuse so nothing leaks between occupants.
//! - `try_spawn_process` / `report_process_finished` bracket the quota;
//!   the decrement saturates at zero.

use tracing::{info, warn};

use crate::error::{IpcError, SessionError};
use crate::ipc::Ipc;
use crate::state::{Role, UserSession, MAX_SESSIONS};

/// A process's handle on its row of the shared session table.
pub struct SessionRegistry<'a, I: Ipc> {
    ctx: &'a I,
    current: Option<usize>,
}

impl<'a, I: Ipc> SessionRegistry<'a, I> {
    pub fn new(ctx: &'a I) -> Self {
        SessionRegistry { ctx, current: None }
    }

    /// Claims a session row.
    ///
    /// Scans for a duplicate active username, then for the first inactive
    /// slot; writes a cleared row bound to the calling pid. Returns the
    /// claimed index.
    pub fn login(
        &mut self,
        name: &str,
        role: Role,
        org_id: i32,
        max_processes: u32,
    ) -> Result<usize, SessionError> {
        let pid = std::process::id() as i32;
        let claimed = self.ctx.with_belt(|s| {
            if s.users.iter().any(|u| u.active && u.name_matches(name)) {
                return Err(SessionError::DuplicateName { name: name.into() });
            }
            let slot = (0..MAX_SESSIONS)
                .find(|&i| !s.users[i].active)
                .ok_or(SessionError::RegistryFull)?;

            let row = &mut s.users[slot];
            *row = UserSession::default();
            row.active = true;
            row.set_username(name);
            row.session_pid = pid;
            row.role = role;
            row.org_id = org_id;
            row.max_processes = max_processes;
            Ok(slot)
        })??;

        self.current = Some(claimed);
        info!(
            user = name,
            org = org_id,
            role = role.0,
            slot = claimed,
            "session opened"
        );
        Ok(claimed)
    }

    /// Releases the caller's row, if any. Idempotent.
    pub fn logout(&mut self) -> Result<(), IpcError> {
        let Some(slot) = self.current.take() else {
            return Ok(());
        };
        let name = self.ctx.with_belt(|s| {
            let name = s.users[slot].username_str().to_string();
            s.users[slot] = UserSession::default();
            name
        })?;
        info!(user = %name, slot, "session closed");
        Ok(())
    }

    /// Atomically checks the quota and claims one process slot.
    pub fn try_spawn_process(&self) -> Result<bool, IpcError> {
        let Some(slot) = self.current else {
            return Ok(false);
        };
        self.ctx.with_belt(|s| {
            let row = &mut s.users[slot];
            if row.current_processes < row.max_processes {
                row.current_processes += 1;
                true
            } else {
                false
            }
        })
    }

    /// Releases one process slot; saturates at zero.
    pub fn report_process_finished(&self) -> Result<(), IpcError> {
        let Some(slot) = self.current else {
            return Ok(());
        };
        self.ctx.with_belt(|s| {
            let row = &mut s.users[slot];
            if row.current_processes == 0 {
                warn!(slot, "process release without a matching claim");
            }
            row.current_processes = row.current_processes.saturating_sub(1);
        })
    }

    /// Role mask of the caller's session; `NONE` when not logged in.
    pub fn current_role(&self) -> Result<Role, IpcError> {
        let Some(slot) = self.current else {
            return Ok(Role::NONE);
        };
        self.ctx.with_belt(|s| s.users[slot].role)
    }

    /// Snapshot of the caller's row, for rendering.
    pub fn current_session(&self) -> Result<Option<UserSession>, IpcError> {
        let Some(slot) = self.current else {
            return Ok(None);
        };
        self.ctx.with_belt(|s| Some(s.users[slot]))
    }

    pub fn session_index(&self) -> Option<usize> {
        self.current
    }
}
