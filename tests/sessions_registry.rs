//! Session registry: admission, quotas, and row hygiene.

use dockvisor::state::{Role, MAX_SESSIONS};
use dockvisor::testing::LocalIpc;
use dockvisor::{Ipc, SessionError, SessionRegistry};

#[test]
fn login_logout_leaves_an_inactive_zeroed_row() {
    let ipc = LocalIpc::new();
    let mut registry = SessionRegistry::new(&ipc);

    let slot = registry
        .login("TestUser", Role::OPERATOR, 100, 2)
        .expect("login");
    assert_eq!(registry.session_index(), Some(slot));
    assert_eq!(registry.current_role().unwrap(), Role::OPERATOR);

    registry.try_spawn_process().unwrap();
    registry.logout().expect("logout");

    assert_eq!(registry.session_index(), None);
    ipc.with_belt(|s| {
        assert!(!s.users[slot].active);
        assert_eq!(s.users[slot].current_processes, 0);
        assert_eq!(s.users[slot].username_str(), "");
    })
    .unwrap();
}

#[test]
fn duplicate_active_usernames_are_rejected() {
    let ipc = LocalIpc::new();
    let mut first = SessionRegistry::new(&ipc);
    let mut second = SessionRegistry::new(&ipc);

    first.login("Operator-A", Role::OPERATOR, 0, 1).expect("login");
    let dup = second.login("Operator-A", Role::OPERATOR, 0, 1);
    assert!(matches!(dup, Err(SessionError::DuplicateName { .. })));

    // After the first logs out the name is free again.
    first.logout().unwrap();
    second.login("Operator-A", Role::OPERATOR, 0, 1).expect("relogin");
}

#[test]
fn a_full_table_rejects_logins() {
    let ipc = LocalIpc::new();
    let mut registries: Vec<SessionRegistry<'_, LocalIpc>> =
        (0..=MAX_SESSIONS).map(|_| SessionRegistry::new(&ipc)).collect();

    for (n, registry) in registries.iter_mut().take(MAX_SESSIONS).enumerate() {
        registry
            .login(&format!("user-{n}"), Role::VIEWER, 0, 1)
            .expect("table has room");
    }
    let overflow = registries[MAX_SESSIONS].login("one-too-many", Role::VIEWER, 0, 1);
    assert!(matches!(overflow, Err(SessionError::RegistryFull)));
}

/// Scenario: quota 2 admits two processes, refuses the third, and admits
/// again after one release.
#[test]
fn spawn_quota_brackets() {
    let ipc = LocalIpc::new();
    let mut registry = SessionRegistry::new(&ipc);
    registry.login("QuotaUser", Role::OPERATOR, 0, 2).expect("login");

    assert!(registry.try_spawn_process().unwrap());
    assert!(registry.try_spawn_process().unwrap());
    assert!(!registry.try_spawn_process().unwrap());

    registry.report_process_finished().unwrap();
    assert!(registry.try_spawn_process().unwrap());
}

#[test]
fn quota_release_saturates_at_zero() {
    let ipc = LocalIpc::new();
    let mut registry = SessionRegistry::new(&ipc);
    let slot = registry.login("Saturated", Role::OPERATOR, 0, 1).expect("login");

    registry.report_process_finished().unwrap();
    registry.report_process_finished().unwrap();
    ipc.with_belt(|s| assert_eq!(s.users[slot].current_processes, 0)).unwrap();

    // Admit/release leaves the counter where it started.
    assert!(registry.try_spawn_process().unwrap());
    registry.report_process_finished().unwrap();
    ipc.with_belt(|s| assert_eq!(s.users[slot].current_processes, 0)).unwrap();
}

#[test]
fn operations_without_a_session_are_inert() {
    let ipc = LocalIpc::new();
    let registry = SessionRegistry::new(&ipc);

    assert!(!registry.try_spawn_process().unwrap());
    assert_eq!(registry.current_role().unwrap(), Role::NONE);
    assert_eq!(registry.current_session().unwrap(), None);
}
