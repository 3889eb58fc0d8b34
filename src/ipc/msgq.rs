//! Typed command queue with per-recipient addressing.
//!
//! Messages are `{recipient_tag, command_id}`; the tag doubles as the
//! System-V message type, so `msgrcv` filters server-side and per-recipient
//! delivery order is the queue's own FIFO guarantee.

use crate::error::IpcError;
use crate::shutdown::ShutdownToken;

const IPC_PERMS: libc::c_int = 0o600;

/// Commands carried over the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Command {
    None = 0,
    /// Tells the addressed truck to leave the dock.
    Departure = 1,
    /// Tells the express role to run a batch delivery.
    ExpressLoad = 2,
    /// Tells the addressed session to finish its shift.
    EndWork = 3,
}

impl Command {
    pub fn from_raw(raw: i32) -> Option<Command> {
        match raw {
            0 => Some(Command::None),
            1 => Some(Command::Departure),
            2 => Some(Command::ExpressLoad),
            3 => Some(Command::EndWork),
            _ => None,
        }
    }
}

/// Opaque queue address. Every recipient reads only messages carrying its
/// own tag; "broadcast" is performed by the sender iterating active
/// sessions, so no reserved tag exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecipientTag(i64);

impl RecipientTag {
    /// The calling process's own address.
    pub fn self_tag() -> RecipientTag {
        RecipientTag(std::process::id() as i64)
    }

    /// Address of another process.
    pub fn for_pid(pid: i32) -> RecipientTag {
        RecipientTag(i64::from(pid))
    }

    pub fn raw(self) -> i64 {
        self.0
    }

    /// Message types must be strictly positive on the wire.
    fn valid(self) -> bool {
        self.0 > 0
    }
}

/// On-the-wire message. `mtype` is the recipient tag.
#[repr(C)]
struct WireMessage {
    mtype: libc::c_long,
    command_id: i32,
}

/// Payload length excludes the type field.
const PAYLOAD_LEN: usize = std::mem::size_of::<i32>();

/// Handle to the command queue. The owner removes the queue on drop.
pub struct CommandQueue {
    id: libc::c_int,
    owner: bool,
}

unsafe impl Send for CommandQueue {}
unsafe impl Sync for CommandQueue {}

impl CommandQueue {
    /// Creates a fresh queue, destroying any namesake first.
    pub fn create(key: i32) -> Result<Self, IpcError> {
        Self::destroy_existing(key);
        let id = unsafe { libc::msgget(key, libc::IPC_CREAT | libc::IPC_EXCL | IPC_PERMS) };
        if id == -1 {
            return Err(IpcError::resource("msgget"));
        }
        Ok(CommandQueue { id, owner: true })
    }

    /// Attaches to an existing queue.
    pub fn attach(key: i32) -> Result<Self, IpcError> {
        let id = unsafe { libc::msgget(key, IPC_PERMS) };
        if id == -1 {
            return Err(IpcError::resource("msgget"));
        }
        Ok(CommandQueue { id, owner: false })
    }

    /// Removes a leftover queue with this key, if any.
    pub fn destroy_existing(key: i32) {
        unsafe {
            let id = libc::msgget(key, IPC_PERMS);
            if id != -1 {
                libc::msgctl(id, libc::IPC_RMID, std::ptr::null_mut());
            }
        }
    }

    /// Non-blocking send. `QueueFull` when saturated; the command is lost.
    pub fn send(&self, to: RecipientTag, command: Command) -> Result<(), IpcError> {
        if !to.valid() {
            return Err(IpcError::InvariantViolation {
                detail: format!("non-positive recipient tag {}", to.raw()),
            });
        }
        let msg = WireMessage {
            mtype: to.raw() as libc::c_long,
            command_id: command as i32,
        };
        let rc = unsafe {
            libc::msgsnd(
                self.id,
                &msg as *const WireMessage as *const libc::c_void,
                PAYLOAD_LEN,
                libc::IPC_NOWAIT,
            )
        };
        if rc == 0 {
            return Ok(());
        }
        match std::io::Error::last_os_error().raw_os_error() {
            Some(libc::EAGAIN) => Err(IpcError::QueueFull),
            Some(libc::EIDRM) | Some(libc::EINVAL) => Err(IpcError::QueueRemoved),
            _ => Err(IpcError::resource("msgsnd")),
        }
    }

    /// Blocking receive of the next command addressed to `me`.
    pub fn recv_blocking(
        &self,
        me: RecipientTag,
        token: &ShutdownToken,
    ) -> Result<Command, IpcError> {
        if token.is_cancelled() {
            return Err(IpcError::ShuttingDown);
        }
        loop {
            match self.recv(me, 0) {
                Ok(Some(cmd)) => return Ok(cmd),
                Ok(None) => unreachable!("blocking msgrcv returned no message"),
                Err(libc::EINTR) => {
                    if token.is_cancelled() {
                        return Err(IpcError::ShuttingDown);
                    }
                }
                Err(libc::EIDRM) | Err(libc::EINVAL) => return Err(IpcError::QueueRemoved),
                Err(_) => return Err(IpcError::resource("msgrcv")),
            }
        }
    }

    /// Non-blocking receive; `None` when nothing is addressed to `me`.
    pub fn recv_nonblocking(&self, me: RecipientTag) -> Result<Option<Command>, IpcError> {
        match self.recv(me, libc::IPC_NOWAIT) {
            Ok(found) => Ok(found),
            Err(libc::ENOMSG) => Ok(None),
            Err(libc::EIDRM) | Err(libc::EINVAL) => Err(IpcError::QueueRemoved),
            Err(_) => Err(IpcError::resource("msgrcv")),
        }
    }

    fn recv(&self, me: RecipientTag, flags: libc::c_int) -> Result<Option<Command>, libc::c_int> {
        let mut msg = WireMessage {
            mtype: 0,
            command_id: 0,
        };
        let rc = unsafe {
            libc::msgrcv(
                self.id,
                &mut msg as *mut WireMessage as *mut libc::c_void,
                PAYLOAD_LEN,
                me.raw() as libc::c_long,
                flags,
            )
        };
        if rc == -1 {
            return Err(std::io::Error::last_os_error().raw_os_error().unwrap_or(0));
        }
        // Unknown ids decode to None rather than killing the receiver.
        Ok(Some(Command::from_raw(msg.command_id).unwrap_or(Command::None)))
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        if self.owner {
            unsafe {
                if libc::msgctl(self.id, libc::IPC_RMID, std::ptr::null_mut()) == -1 {
                    tracing::warn!("msgctl IPC_RMID failed: {}", std::io::Error::last_os_error());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_roundtrip_through_raw() {
        for cmd in [
            Command::None,
            Command::Departure,
            Command::ExpressLoad,
            Command::EndWork,
        ] {
            assert_eq!(Command::from_raw(cmd as i32), Some(cmd));
        }
        assert_eq!(Command::from_raw(99), None);
    }

    #[test]
    fn tags_are_pid_addressed() {
        assert_eq!(RecipientTag::for_pid(101).raw(), 101);
        assert_eq!(
            RecipientTag::self_tag().raw(),
            std::process::id() as i64
        );
        assert!(!RecipientTag::for_pid(0).valid());
    }
}
