//! # `IpcContext`: the single facade value shared by all components.
//!
//! Components never hold raw semaphore or segment handles; they borrow one
//! context and call its [`Ipc`] methods. The context owns the discovery
//! (three well-known keys), the owner/attacher distinction, and the header
//! check that rejects a stale segment from an incompatible layout.

use crate::config::Config;
use crate::error::IpcError;
use crate::ipc::{Command, CommandQueue, Ipc, RecipientTag, SemIndex, SemSet, SharedRegion};
use crate::shutdown::ShutdownToken;
use crate::state::SharedState;

pub struct IpcContext {
    shm: SharedRegion,
    sems: SemSet,
    queue: CommandQueue,
    token: ShutdownToken,
}

impl IpcContext {
    /// Creates `(S, Σ, Q)` with owner semantics: pre-existing namesake
    /// resources are destroyed, the fresh state is zeroed and initialized
    /// (`running = true`, header, effective belt capacity), and Σ gets its
    /// initial values. Dropping the returned context destroys all three
    /// resources.
    pub fn create_owner(cfg: &Config, token: ShutdownToken) -> Result<Self, IpcError> {
        let shm = SharedRegion::create(cfg.shm_key)?;
        let sems = SemSet::create(cfg.sem_key, cfg.belt_capacity)?;
        let queue = CommandQueue::create(cfg.msg_key)?;

        // Σ is not live yet; the owner writes the initial state directly.
        unsafe { shm.state_mut() }.init(cfg.belt_capacity);

        Ok(IpcContext {
            shm,
            sems,
            queue,
            token,
        })
    }

    /// Attaches to resources created by a running orchestrator. Verifies
    /// the state header; a mismatch means the segment belongs to another
    /// layout generation and attaching would misread it.
    pub fn attach(cfg: &Config, token: ShutdownToken) -> Result<Self, IpcError> {
        let shm = SharedRegion::attach(cfg.shm_key)?;
        if !unsafe { shm.state_mut() }.header_ok() {
            return Err(IpcError::ResourceInit {
                call: "shared state header",
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "magic/version mismatch",
                ),
            });
        }
        let sems = SemSet::attach(cfg.sem_key)?;
        let queue = CommandQueue::attach(cfg.msg_key)?;
        Ok(IpcContext {
            shm,
            sems,
            queue,
            token,
        })
    }

    pub fn token(&self) -> &ShutdownToken {
        &self.token
    }

    /// Semaphore value, for observability surfaces and integration tests.
    pub fn sem_value(&self, idx: SemIndex) -> Result<i32, IpcError> {
        self.sems.value(idx)
    }
}

impl Ipc for IpcContext {
    fn with_belt<R>(&self, f: impl FnOnce(&mut SharedState) -> R) -> Result<R, IpcError> {
        self.sems.wait(SemIndex::BeltMutex, &self.token)?;
        // Safety: BeltMutex held for the closure's duration.
        let out = f(unsafe { self.shm.state_mut() });
        self.sems.post(SemIndex::BeltMutex)?;
        Ok(out)
    }

    fn with_dock<R>(&self, f: impl FnOnce(&mut SharedState) -> R) -> Result<R, IpcError> {
        self.sems.wait(SemIndex::DockMutex, &self.token)?;
        // Safety: DockMutex held for the closure's duration.
        let out = f(unsafe { self.shm.state_mut() });
        self.sems.post(SemIndex::DockMutex)?;
        Ok(out)
    }

    fn wait_empty_slot(&self) -> Result<(), IpcError> {
        self.sems.wait(SemIndex::EmptySlots, &self.token)
    }

    fn post_empty_slot(&self) -> Result<(), IpcError> {
        self.sems.post(SemIndex::EmptySlots)
    }

    fn wait_full_slot(&self) -> Result<(), IpcError> {
        self.sems.wait(SemIndex::FullSlots, &self.token)
    }

    fn post_full_slot(&self) -> Result<(), IpcError> {
        self.sems.post(SemIndex::FullSlots)
    }

    fn send(&self, to: RecipientTag, command: Command) -> Result<(), IpcError> {
        self.queue.send(to, command)
    }

    fn recv_blocking(&self, me: RecipientTag) -> Result<Command, IpcError> {
        self.queue.recv_blocking(me, &self.token)
    }

    fn recv_nonblocking(&self, me: RecipientTag) -> Result<Option<Command>, IpcError> {
        self.queue.recv_nonblocking(me)
    }

    fn is_running(&self) -> bool {
        // Single-writer bool; a racy read is the contract.
        unsafe { self.shm.state_mut() }.running
    }

    fn request_halt(&self) {
        unsafe { self.shm.state_mut() }.running = false;
    }
}
