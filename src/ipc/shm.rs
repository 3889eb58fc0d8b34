//! System-V shared memory segment holding the [`SharedState`].

use std::ptr::NonNull;

use crate::error::IpcError;
use crate::state::SharedState;

const IPC_PERMS: libc::c_int = 0o600;

/// A mapped shared memory segment. The owner removes the segment on drop;
/// attachers only detach their mapping.
pub struct SharedRegion {
    id: libc::c_int,
    ptr: NonNull<SharedState>,
    owner: bool,
}

// The region is shared across processes by construction; within a process
// access goes through the semaphore discipline of the facade.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Creates a fresh segment, destroying any namesake left over from a
    /// previous run, and zeroes it.
    pub fn create(key: i32) -> Result<Self, IpcError> {
        Self::destroy_existing(key);

        let size = std::mem::size_of::<SharedState>();
        let id = unsafe {
            libc::shmget(
                key,
                size,
                libc::IPC_CREAT | libc::IPC_EXCL | IPC_PERMS,
            )
        };
        if id == -1 {
            return Err(IpcError::resource("shmget"));
        }

        let region = Self::map(id, true)?;
        unsafe {
            std::ptr::write_bytes(region.ptr.as_ptr(), 0, 1);
        }
        Ok(region)
    }

    /// Attaches to an existing segment; fails when none exists.
    pub fn attach(key: i32) -> Result<Self, IpcError> {
        let size = std::mem::size_of::<SharedState>();
        let id = unsafe { libc::shmget(key, size, IPC_PERMS) };
        if id == -1 {
            return Err(IpcError::resource("shmget"));
        }
        Self::map(id, false)
    }

    fn map(id: libc::c_int, owner: bool) -> Result<Self, IpcError> {
        let raw = unsafe { libc::shmat(id, std::ptr::null(), 0) };
        if raw == usize::MAX as *mut libc::c_void {
            return Err(IpcError::resource("shmat"));
        }
        let ptr = NonNull::new(raw as *mut SharedState).ok_or_else(|| IpcError::resource("shmat"))?;
        Ok(SharedRegion { id, ptr, owner })
    }

    /// Removes a leftover segment with this key, if any. Errors are ignored;
    /// absence is the expected case.
    pub fn destroy_existing(key: i32) {
        unsafe {
            let id = libc::shmget(key, 0, IPC_PERMS);
            if id != -1 {
                libc::shmctl(id, libc::IPC_RMID, std::ptr::null_mut());
            }
        }
    }

    /// The mapped state.
    ///
    /// # Safety
    /// The caller must hold the semaphore matching the fields it touches,
    /// or touch only the single-writer flags.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn state_mut(&self) -> &mut SharedState {
        &mut *self.ptr.as_ptr()
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        unsafe {
            if libc::shmdt(self.ptr.as_ptr() as *const libc::c_void) == -1 {
                tracing::warn!("shmdt failed: {}", std::io::Error::last_os_error());
            }
            if self.owner && libc::shmctl(self.id, libc::IPC_RMID, std::ptr::null_mut()) == -1 {
                tracing::warn!("shmctl IPC_RMID failed: {}", std::io::Error::last_os_error());
            }
        }
    }
}
