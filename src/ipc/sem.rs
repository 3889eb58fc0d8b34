//! System-V semaphore set: the four entries of Σ.
//!
//! Waits are restart-on-interrupt: an `EINTR` from a signal re-checks the
//! shutdown token and either retries the wait or gives up with
//! `ShuttingDown`. Posts always retry — a missed post would corrupt the
//! `empty + full == K` invariant.

use crate::error::IpcError;
use crate::shutdown::ShutdownToken;

const IPC_PERMS: libc::c_int = 0o600;

/// Entries of the semaphore set, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum SemIndex {
    /// Binary mutex over belt indices, counters, slots, and the session
    /// table.
    BeltMutex = 0,
    /// Counting: free belt slots. Initial value K.
    EmptySlots = 1,
    /// Counting: filled belt slots. Initial value 0.
    FullSlots = 2,
    /// Binary mutex over the dock slot.
    DockMutex = 3,
}

/// Number of entries in Σ.
pub const SEM_COUNT: libc::c_int = 4;

/// Handle to the semaphore set. The owner removes the set on drop.
pub struct SemSet {
    id: libc::c_int,
    owner: bool,
}

unsafe impl Send for SemSet {}
unsafe impl Sync for SemSet {}

impl SemSet {
    /// Creates a fresh set (destroying any namesake) and writes the initial
    /// values: both mutexes 1, `EMPTY_SLOTS = belt_capacity`, `FULL_SLOTS = 0`.
    pub fn create(key: i32, belt_capacity: u32) -> Result<Self, IpcError> {
        Self::destroy_existing(key);

        let id = unsafe {
            libc::semget(
                key,
                SEM_COUNT,
                libc::IPC_CREAT | libc::IPC_EXCL | IPC_PERMS,
            )
        };
        if id == -1 {
            return Err(IpcError::resource("semget"));
        }
        let set = SemSet { id, owner: true };

        set.set_value(SemIndex::BeltMutex, 1)?;
        set.set_value(SemIndex::DockMutex, 1)?;
        set.set_value(SemIndex::EmptySlots, belt_capacity as libc::c_int)?;
        set.set_value(SemIndex::FullSlots, 0)?;
        Ok(set)
    }

    /// Attaches to an existing set.
    pub fn attach(key: i32) -> Result<Self, IpcError> {
        let id = unsafe { libc::semget(key, 0, IPC_PERMS) };
        if id == -1 {
            return Err(IpcError::resource("semget"));
        }
        Ok(SemSet { id, owner: false })
    }

    /// Removes a leftover set with this key, if any.
    pub fn destroy_existing(key: i32) {
        unsafe {
            let id = libc::semget(key, 0, IPC_PERMS);
            if id != -1 {
                libc::semctl(id, 0, libc::IPC_RMID);
            }
        }
    }

    /// Decrements `idx`, blocking until possible. The token is consulted on
    /// interrupt, not up front — cleanup paths (unregister, logout) must
    /// still be able to take an uncontended mutex after cancellation.
    /// A removed set counts as shutdown.
    pub fn wait(&self, idx: SemIndex, token: &ShutdownToken) -> Result<(), IpcError> {
        loop {
            match self.op(idx, -1) {
                Ok(()) => return Ok(()),
                Err(libc::EINTR) => {
                    if token.is_cancelled() {
                        return Err(IpcError::ShuttingDown);
                    }
                }
                Err(libc::EIDRM) | Err(libc::EINVAL) => return Err(IpcError::ShuttingDown),
                Err(_) => return Err(IpcError::resource("semop")),
            }
        }
    }

    /// Increments `idx`. Retries interrupts unconditionally: the post side
    /// of the protocol must not be lost.
    pub fn post(&self, idx: SemIndex) -> Result<(), IpcError> {
        loop {
            match self.op(idx, 1) {
                Ok(()) => return Ok(()),
                Err(libc::EINTR) => continue,
                Err(libc::EIDRM) | Err(libc::EINVAL) => return Err(IpcError::ShuttingDown),
                Err(_) => return Err(IpcError::resource("semop")),
            }
        }
    }

    /// Current value of `idx` (observability and tests).
    pub fn value(&self, idx: SemIndex) -> Result<i32, IpcError> {
        let val = unsafe { libc::semctl(self.id, idx as libc::c_int, libc::GETVAL) };
        if val == -1 {
            return Err(IpcError::resource("semctl"));
        }
        Ok(val)
    }

    fn op(&self, idx: SemIndex, delta: i16) -> Result<(), libc::c_int> {
        let mut sb = libc::sembuf {
            sem_num: idx as libc::c_ushort,
            sem_op: delta,
            sem_flg: 0,
        };
        let rc = unsafe { libc::semop(self.id, &mut sb, 1) };
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error().raw_os_error().unwrap_or(0))
        }
    }

    fn set_value(&self, idx: SemIndex, value: libc::c_int) -> Result<(), IpcError> {
        let rc = unsafe { libc::semctl(self.id, idx as libc::c_int, libc::SETVAL, value) };
        if rc == -1 {
            return Err(IpcError::resource("semctl"));
        }
        Ok(())
    }
}

impl Drop for SemSet {
    fn drop(&mut self) {
        if self.owner {
            unsafe {
                if libc::semctl(self.id, 0, libc::IPC_RMID) == -1 {
                    tracing::warn!("semctl IPC_RMID failed: {}", std::io::Error::last_os_error());
                }
            }
        }
    }
}
