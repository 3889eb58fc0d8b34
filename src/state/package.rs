//! # Package: the unit of cargo moving through the warehouse.
//!
//! A [`Package`] is copied by value at every transfer (worker → belt →
//! dispatcher → truck); no two processes ever alias the same live package.
//! It carries a bounded, append-only audit log of [`ActionRecord`]s that
//! saturates silently once full.
//!
//! The flag types ([`PackageKind`], [`PackageStatus`], [`ActionFlags`]) are
//! newtype bitmasks so that a zeroed belt slot is always a valid value.

use super::{unix_now, MAX_PACKAGE_HISTORY};

/// Cargo size class. One of `A`, `B`, `C`; zero means an empty slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct PackageKind(pub u8);

impl PackageKind {
    pub const NONE: PackageKind = PackageKind(0);
    pub const A: PackageKind = PackageKind(1 << 0);
    pub const B: PackageKind = PackageKind(1 << 1);
    pub const C: PackageKind = PackageKind(1 << 2);

    pub fn contains(self, flag: PackageKind) -> bool {
        self.0 & flag.0 != 0
    }
}

impl std::ops::BitOr for PackageKind {
    type Output = PackageKind;
    fn bitor(self, rhs: PackageKind) -> PackageKind {
        PackageKind(self.0 | rhs.0)
    }
}

/// Delivery status flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct PackageStatus(pub u8);

impl PackageStatus {
    pub const NORMAL: PackageStatus = PackageStatus(0);
    /// Produced by the express lane; never touched the belt.
    pub const EXPRESS: PackageStatus = PackageStatus(1 << 0);
    /// Accepted by a docked truck.
    pub const LOADED: PackageStatus = PackageStatus(1 << 1);

    pub fn contains(self, flag: PackageStatus) -> bool {
        self.0 & flag.0 != 0
    }
}

impl std::ops::BitOr for PackageStatus {
    type Output = PackageStatus;
    fn bitor(self, rhs: PackageStatus) -> PackageStatus {
        PackageStatus(self.0 | rhs.0)
    }
}

/// Audit actions, composable as event ∪ actor (`PLACED_ON_BELT | BY_WORKER`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct ActionFlags(pub u8);

impl ActionFlags {
    pub const CREATED: ActionFlags = ActionFlags(1 << 0);
    pub const PLACED_ON_BELT: ActionFlags = ActionFlags(1 << 1);
    pub const PICKED_UP: ActionFlags = ActionFlags(1 << 2);
    pub const LOADED_TO_TRUCK: ActionFlags = ActionFlags(1 << 3);

    pub const BY_WORKER: ActionFlags = ActionFlags(1 << 4);
    pub const BY_EXPRESS: ActionFlags = ActionFlags(1 << 5);
    pub const BY_TRUCK: ActionFlags = ActionFlags(1 << 6);
    pub const FORCED: ActionFlags = ActionFlags(1 << 7);

    pub fn contains(self, flag: ActionFlags) -> bool {
        self.0 & flag.0 != 0
    }
}

impl std::ops::BitOr for ActionFlags {
    type Output = ActionFlags;
    fn bitor(self, rhs: ActionFlags) -> ActionFlags {
        ActionFlags(self.0 | rhs.0)
    }
}

/// One entry of a package's audit log.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct ActionRecord {
    pub action: ActionFlags,
    pub actor_pid: i32,
    pub timestamp: i64,
}

/// A package travelling through the system.
///
/// `id` is zero until the belt assigns one at entry (express packages get
/// theirs from the same counter without touching the belt). Ids are strictly
/// monotonic across the whole run.
#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct Package {
    pub id: u64,
    pub creator_pid: i32,
    pub editor_pid: i32,
    pub kind: PackageKind,
    pub status: PackageStatus,
    pub weight: f64,
    pub volume: f64,
    pub created_at: i64,
    pub updated_at: i64,
    history: [ActionRecord; MAX_PACKAGE_HISTORY],
    history_len: u32,
}

impl Default for Package {
    fn default() -> Self {
        Package {
            id: 0,
            creator_pid: 0,
            editor_pid: 0,
            kind: PackageKind::NONE,
            status: PackageStatus::NORMAL,
            weight: 0.0,
            volume: 0.0,
            created_at: 0,
            updated_at: 0,
            history: [ActionRecord::default(); MAX_PACKAGE_HISTORY],
            history_len: 0,
        }
    }
}

impl Package {
    /// Creates a fresh package stamped with a `CREATED` audit record.
    pub fn new(kind: PackageKind, weight: f64, volume: f64, actor: ActionFlags, pid: i32) -> Self {
        let mut pkg = Package {
            creator_pid: pid,
            editor_pid: pid,
            kind,
            weight,
            volume,
            created_at: unix_now(),
            updated_at: unix_now(),
            ..Package::default()
        };
        pkg.record_action(ActionFlags::CREATED | actor, pid);
        pkg
    }

    /// Appends an audit record, saturating silently once the log is full.
    ///
    /// Also refreshes `updated_at` and `editor_pid`; a saturated log still
    /// reflects the last editor.
    pub fn record_action(&mut self, action: ActionFlags, actor_pid: i32) {
        if (self.history_len as usize) < MAX_PACKAGE_HISTORY {
            self.history[self.history_len as usize] = ActionRecord {
                action,
                actor_pid,
                timestamp: unix_now(),
            };
            self.history_len += 1;
        }
        self.updated_at = unix_now();
        self.editor_pid = actor_pid;
    }

    /// The recorded portion of the audit log, oldest first.
    pub fn history(&self) -> &[ActionRecord] {
        &self.history[..(self.history_len as usize).min(MAX_PACKAGE_HISTORY)]
    }
}
