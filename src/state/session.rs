//! # Session rows and the role bitmask.
//!
//! A [`UserSession`] binds a process id to a username, a [`Role`] mask, and
//! a spawn quota. Rows live in the shared `users` table and are mutated only
//! under the registry mutex by the session registry.

/// Fixed width of the username field, terminator included.
pub const MAX_USERNAME: usize = 32;

/// Authorization mask over `{Viewer, Operator, OrgAdmin, SysAdmin}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct Role(pub u16);

impl Role {
    pub const NONE: Role = Role(0);
    pub const VIEWER: Role = Role(1 << 0);
    pub const OPERATOR: Role = Role(1 << 1);
    pub const ORG_ADMIN: Role = Role(1 << 2);
    pub const SYS_ADMIN: Role = Role(1 << 3);

    pub fn contains(self, flag: Role) -> bool {
        self.0 & flag.0 != 0
    }

    /// True when the mask carries any of the given flags.
    pub fn any_of(self, flags: Role) -> bool {
        self.0 & flags.0 != 0
    }
}

impl std::ops::BitOr for Role {
    type Output = Role;
    fn bitor(self, rhs: Role) -> Role {
        Role(self.0 | rhs.0)
    }
}

/// One row of the shared session table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct UserSession {
    pub active: bool,
    pub username: [u8; MAX_USERNAME],
    pub session_pid: i32,
    pub role: Role,
    pub org_id: i32,
    pub max_processes: u32,
    pub current_processes: u32,
}

impl Default for UserSession {
    fn default() -> Self {
        UserSession {
            active: false,
            username: [0; MAX_USERNAME],
            session_pid: 0,
            role: Role::NONE,
            org_id: 0,
            max_processes: 0,
            current_processes: 0,
        }
    }
}

impl UserSession {
    /// Copies `name` into the fixed row, truncating to 31 bytes so the field
    /// always stays NUL-terminated.
    pub fn set_username(&mut self, name: &str) {
        self.username = [0; MAX_USERNAME];
        let bytes = name.as_bytes();
        let n = bytes.len().min(MAX_USERNAME - 1);
        self.username[..n].copy_from_slice(&bytes[..n]);
    }

    /// The username up to the first NUL.
    pub fn username_str(&self) -> &str {
        let end = self
            .username
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_USERNAME);
        std::str::from_utf8(&self.username[..end]).unwrap_or("")
    }

    pub fn name_matches(&self, name: &str) -> bool {
        self.username_str() == name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_mask_authorization() {
        let operator_admin = Role::OPERATOR | Role::SYS_ADMIN;
        assert!(operator_admin.contains(Role::OPERATOR));
        assert!(operator_admin.any_of(Role::OPERATOR | Role::ORG_ADMIN));
        assert!(!Role::VIEWER.any_of(Role::OPERATOR | Role::SYS_ADMIN));
    }

    #[test]
    fn username_roundtrip_and_truncation() {
        let mut row = UserSession::default();
        row.set_username("System-Express");
        assert!(row.name_matches("System-Express"));

        row.set_username(&"x".repeat(64));
        assert_eq!(row.username_str().len(), MAX_USERNAME - 1);
        assert_eq!(row.username[MAX_USERNAME - 1], 0);
    }
}
