//! Cross-process primitive tests against real System-V resources.
//!
//! Each test uses its own key triple so parallel test threads never share
//! kernel objects; owners destroy their resources on drop.

#![cfg(target_os = "linux")]

use dockvisor::ipc::SemIndex;
use dockvisor::{Command, Config, Ipc, IpcContext, RecipientTag, ShutdownToken};

/// Keys far away from the well-known 1234/5678/9012 defaults.
fn test_config(offset: i32) -> Config {
    let mut cfg = Config::default();
    cfg.shm_key = 0x444b_0000 + offset;
    cfg.sem_key = 0x444b_1000 + offset;
    cfg.msg_key = 0x444b_2000 + offset;
    cfg
}

#[test]
fn owner_initializes_state_and_semaphores() {
    let cfg = test_config(1);
    let ctx = IpcContext::create_owner(&cfg, ShutdownToken::new()).expect("create");

    assert!(ctx.is_running());
    ctx.with_belt(|s| {
        assert!(s.header_ok());
        assert_eq!(s.count, 0);
        assert_eq!(s.total_packages_created, 0);
        assert_eq!(s.capacity(), cfg.belt_capacity);
    })
    .unwrap();

    assert_eq!(ctx.sem_value(SemIndex::BeltMutex).unwrap(), 1);
    assert_eq!(ctx.sem_value(SemIndex::DockMutex).unwrap(), 1);
    assert_eq!(
        ctx.sem_value(SemIndex::EmptySlots).unwrap(),
        cfg.belt_capacity as i32
    );
    assert_eq!(ctx.sem_value(SemIndex::FullSlots).unwrap(), 0);
}

#[test]
fn attacher_sees_owner_writes() {
    let cfg = test_config(2);
    let owner = IpcContext::create_owner(&cfg, ShutdownToken::new()).expect("create");
    owner.with_belt(|s| s.total_packages_created = 77).unwrap();

    let client = IpcContext::attach(&cfg, ShutdownToken::new()).expect("attach");
    client
        .with_belt(|s| assert_eq!(s.total_packages_created, 77))
        .unwrap();

    client.with_dock(|s| s.trucks_completed = 3).unwrap();
    owner.with_dock(|s| assert_eq!(s.trucks_completed, 3)).unwrap();
}

#[test]
fn attach_without_owner_fails() {
    let cfg = test_config(3);
    let result = IpcContext::attach(&cfg, ShutdownToken::new());
    assert!(result.is_err(), "attach must fail when no owner created the resources");
}

#[test]
fn queue_delivers_per_recipient_in_order() {
    let cfg = test_config(4);
    let ctx = IpcContext::create_owner(&cfg, ShutdownToken::new()).expect("create");

    let alpha = RecipientTag::for_pid(11_111);
    let beta = RecipientTag::for_pid(22_222);

    assert_eq!(ctx.recv_nonblocking(alpha).unwrap(), None);

    ctx.send(alpha, Command::Departure).unwrap();
    ctx.send(beta, Command::ExpressLoad).unwrap();
    ctx.send(alpha, Command::EndWork).unwrap();

    // Per-recipient filtering and per-recipient FIFO.
    assert_eq!(ctx.recv_nonblocking(alpha).unwrap(), Some(Command::Departure));
    assert_eq!(ctx.recv_nonblocking(alpha).unwrap(), Some(Command::EndWork));
    assert_eq!(ctx.recv_nonblocking(alpha).unwrap(), None);
    assert_eq!(ctx.recv_nonblocking(beta).unwrap(), Some(Command::ExpressLoad));
}

#[test]
fn belt_semaphores_track_push_pop() {
    use dockvisor::state::{ActionFlags, Package, PackageKind};

    let cfg = test_config(5);
    let ctx = IpcContext::create_owner(&cfg, ShutdownToken::new()).expect("create");
    let belt = dockvisor::Belt::new(&ctx);

    let pkg = Package::new(PackageKind::A, 2.5, 19.5, ActionFlags::BY_WORKER, 1);
    belt.push(pkg).expect("push");

    let k = cfg.belt_capacity as i32;
    assert_eq!(ctx.sem_value(SemIndex::EmptySlots).unwrap(), k - 1);
    assert_eq!(ctx.sem_value(SemIndex::FullSlots).unwrap(), 1);

    let out = belt.pop().expect("pop");
    assert_eq!(out.id, 1);
    assert_eq!(ctx.sem_value(SemIndex::EmptySlots).unwrap(), k);
    assert_eq!(ctx.sem_value(SemIndex::FullSlots).unwrap(), 0);
}

#[test]
fn owner_drop_destroys_the_resources() {
    let cfg = test_config(6);
    {
        let _ctx = IpcContext::create_owner(&cfg, ShutdownToken::new()).expect("create");
    }
    let result = IpcContext::attach(&cfg, ShutdownToken::new());
    assert!(result.is_err(), "resources must be gone after the owner drops");
}
