//! # The shared region layout.
//!
//! [`SharedState`] is the entire cross-process state: the belt ring, its
//! counters, the session table, and the dock slot. The owner writes the
//! magic/version header once at creation; attachers verify it before
//! touching anything else, so a stale segment from an older layout is
//! rejected instead of misread.
//!
//! ## Locking map
//! - belt ring, belt counters, session table: belt mutex
//! - `dock_truck`, `trucks_completed`: dock mutex
//! - `running`, `force_truck_departure`: single-writer flags, read racily

use super::{Package, TruckState, UserSession};

/// Physical slots in the belt ring. The effective capacity may be lower
/// (see [`SharedState::belt_capacity`]).
pub const BELT_SLOTS: usize = 10;

/// Observability threshold for the summed belt weight; not an admission gate.
pub const MAX_BELT_WEIGHT: f64 = 100.0;

/// Upper bound on concurrently registered belt workers.
pub const MAX_BELT_WORKERS: u32 = 5;

/// Rows in the session table.
pub const MAX_SESSIONS: usize = 5;

pub const STATE_MAGIC: u32 = 0x444f_434b; // "DOCK"
pub const STATE_VERSION: u32 = 1;

/// Fixed per-kind package volumes (m³).
pub const VOL_A: f64 = 19.5;
pub const VOL_B: f64 = 46.2;
pub const VOL_C: f64 = 99.7;

#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct SharedState {
    pub magic: u32,
    pub version: u32,

    pub belt: [Package; BELT_SLOTS],
    /// Read index of the live region.
    pub head: u32,
    /// Write index.
    pub tail: u32,
    /// Occupied slots; shadow of the FULL_SLOTS semaphore.
    pub count: u32,
    pub total_weight: f64,
    /// Registered worker population.
    pub workers: u32,
    /// Monotonic id source; also the number of packages ever created.
    pub total_packages_created: u64,
    /// Effective ring capacity K, 1..=BELT_SLOTS. Written once by the owner.
    pub belt_capacity: u32,

    pub running: bool,
    pub force_truck_departure: bool,
    pub trucks_completed: u32,

    pub users: [UserSession; MAX_SESSIONS],
    pub dock_truck: TruckState,
}

impl Default for SharedState {
    fn default() -> Self {
        SharedState {
            magic: 0,
            version: 0,
            belt: [Package::default(); BELT_SLOTS],
            head: 0,
            tail: 0,
            count: 0,
            total_weight: 0.0,
            workers: 0,
            total_packages_created: 0,
            belt_capacity: BELT_SLOTS as u32,
            running: false,
            force_truck_departure: false,
            trucks_completed: 0,
            users: [UserSession::default(); MAX_SESSIONS],
            dock_truck: TruckState::default(),
        }
    }
}

impl SharedState {
    /// Owner-side initialization of a zeroed segment.
    pub fn init(&mut self, belt_capacity: u32) {
        *self = SharedState::default();
        self.magic = STATE_MAGIC;
        self.version = STATE_VERSION;
        self.belt_capacity = belt_capacity.clamp(1, BELT_SLOTS as u32);
        self.running = true;
    }

    /// Attach-side header verification.
    pub fn header_ok(&self) -> bool {
        self.magic == STATE_MAGIC && self.version == STATE_VERSION
    }

    /// Effective ring capacity K.
    pub fn capacity(&self) -> u32 {
        self.belt_capacity.clamp(1, BELT_SLOTS as u32)
    }

    /// Belt arithmetic invariant: `count == (tail - head) mod K`.
    pub fn belt_consistent(&self) -> bool {
        let k = self.capacity();
        let span = (self.tail + k - self.head) % k;
        // A full ring and an empty ring both have span 0.
        (self.count % k == span) && self.count <= k
    }

    /// Pid of the active session with the given username, if any.
    pub fn find_session_pid(&self, name: &str) -> Option<i32> {
        self.users
            .iter()
            .find(|u| u.active && u.name_matches(name))
            .map(|u| u.session_pid)
    }

    /// Pids of every active session, in table order.
    pub fn active_session_pids(&self) -> Vec<i32> {
        self.users
            .iter()
            .filter(|u| u.active)
            .map(|u| u.session_pid)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Role;

    #[test]
    fn init_writes_header_and_clamps_capacity() {
        let mut s = SharedState::default();
        s.init(25);
        assert!(s.header_ok());
        assert!(s.running);
        assert_eq!(s.capacity(), BELT_SLOTS as u32);

        s.init(0);
        assert_eq!(s.capacity(), 1);
    }

    #[test]
    fn belt_arithmetic_holds_across_wraparound() {
        let mut s = SharedState::default();
        s.init(10);
        assert!(s.belt_consistent());

        s.head = 8;
        s.tail = 2;
        s.count = 4;
        assert!(s.belt_consistent());

        s.count = 5;
        assert!(!s.belt_consistent());
    }

    #[test]
    fn session_lookup_by_name_and_active_pids() {
        let mut s = SharedState::default();
        s.init(10);
        s.users[1].active = true;
        s.users[1].set_username("System-Express");
        s.users[1].session_pid = 4242;
        s.users[1].role = Role::OPERATOR;
        s.users[3].active = true;
        s.users[3].set_username("AdminConsole");
        s.users[3].session_pid = 5151;

        assert_eq!(s.find_session_pid("System-Express"), Some(4242));
        assert_eq!(s.find_session_pid("nobody"), None);
        assert_eq!(s.active_session_pids(), vec![4242, 5151]);
    }
}
