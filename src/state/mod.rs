//! # Shared-memory data model.
//!
//! Every type in this module lives inside the shared region and therefore
//! has a C-compatible fixed layout (`#[repr(C)]`, no pointers, no heap).
//! Each process holds its own mapping of the same bytes; the types here are
//! plain old data that stays valid when zeroed.

mod package;
mod session;
mod shared;
mod truck;

pub use package::{ActionFlags, ActionRecord, Package, PackageKind, PackageStatus};
pub use session::{Role, UserSession, MAX_USERNAME};
pub use shared::{
    SharedState, BELT_SLOTS, MAX_BELT_WEIGHT, MAX_BELT_WORKERS, MAX_SESSIONS, STATE_MAGIC,
    STATE_VERSION, VOL_A, VOL_B, VOL_C,
};
pub use truck::TruckState;

pub(crate) const MAX_PACKAGE_HISTORY: usize = 6;

/// Wall-clock seconds since the unix epoch.
pub(crate) fn unix_now() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
