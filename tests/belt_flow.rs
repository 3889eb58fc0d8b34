//! Belt protocol tests: FIFO transfer, slot hygiene, blocking boundaries,
//! and the semaphore-shadow invariants, driven through the in-process
//! harness.

use std::thread;
use std::time::Duration;

use dockvisor::state::{ActionFlags, Package, PackageKind, VOL_A, VOL_B};
use dockvisor::testing::LocalIpc;
use dockvisor::{Belt, Ipc, IpcError};

fn package(weight: f64, volume: f64) -> Package {
    Package::new(PackageKind::A, weight, volume, ActionFlags::BY_WORKER, 1)
}

#[test]
fn push_pop_roundtrip_preserves_fields_and_zeroes_slot() {
    let ipc = LocalIpc::new();
    let belt = Belt::new(&ipc);

    let id = belt.push(package(10.5, VOL_A)).expect("push");
    assert_eq!(id, 1);

    let out = belt.pop().expect("pop");
    assert_eq!(out.id, 1);
    assert!((out.weight - 10.5).abs() < f64::EPSILON);
    assert!((out.volume - VOL_A).abs() < f64::EPSILON);
    assert!(out.history()[0].action.contains(ActionFlags::CREATED));

    // The vacated slot holds no stale history.
    ipc.with_belt(|s| {
        assert_eq!(s.belt[0], Package::default());
        assert_eq!(s.count, 0);
        assert!((s.total_weight).abs() < f64::EPSILON);
    })
    .unwrap();
}

#[test]
fn fifo_order_and_monotonic_ids() {
    let ipc = LocalIpc::new();
    let belt = Belt::new(&ipc);

    for n in 0..5 {
        belt.push(package(1.0 + n as f64, VOL_B)).expect("push");
    }

    let mut last_id = 0;
    for n in 0..5 {
        let out = belt.pop().expect("pop");
        assert!((out.weight - (1.0 + n as f64)).abs() < f64::EPSILON, "FIFO order broken");
        assert!(out.id > last_id, "ids must be strictly increasing");
        last_id = out.id;
    }
}

#[test]
fn ring_wraps_around_without_losing_packages() {
    let ipc = LocalIpc::with_capacity(3);
    let belt = Belt::new(&ipc);

    // Fill and half-drain repeatedly so head/tail wrap several times.
    let mut popped = Vec::new();
    for round in 0..4 {
        belt.push(package(round as f64 + 1.0, VOL_A)).expect("push");
        belt.push(package(round as f64 + 101.0, VOL_A)).expect("push");
        popped.push(belt.pop().expect("pop").id);
        popped.push(belt.pop().expect("pop").id);
    }

    let expected: Vec<u64> = (1..=8).collect();
    assert_eq!(popped, expected);
    ipc.with_belt(|s| assert!(s.belt_consistent())).unwrap();
}

#[test]
fn gate_arithmetic_matches_occupancy() {
    let ipc = LocalIpc::with_capacity(4);
    let belt = Belt::new(&ipc);

    let (empty, full) = ipc.gate_values();
    assert_eq!((empty, full), (4, 0));

    belt.push(package(1.0, VOL_A)).unwrap();
    belt.push(package(2.0, VOL_A)).unwrap();
    let (empty, full) = ipc.gate_values();
    assert_eq!(empty + full, 4);
    assert_eq!(full, 2);

    let stats = belt.stats().unwrap();
    assert_eq!(stats.count, full);
    assert!(stats.consistent);
}

#[test]
fn push_on_full_belt_blocks_until_a_pop() {
    let ipc = std::sync::Arc::new(LocalIpc::with_capacity(2));
    let belt = Belt::new(&*ipc);
    belt.push(package(1.0, VOL_A)).unwrap();
    belt.push(package(2.0, VOL_A)).unwrap();

    let pusher = {
        let ipc = std::sync::Arc::clone(&ipc);
        thread::spawn(move || Belt::new(&*ipc).push(package(3.0, VOL_A)))
    };

    // The producer must be parked on the empty-slot gate.
    thread::sleep(Duration::from_millis(100));
    assert!(!pusher.is_finished(), "push must block while the belt is full");

    let freed = belt.pop().expect("pop");
    assert_eq!(freed.id, 1);

    let pushed_id = pusher.join().expect("join").expect("push after pop");
    assert_eq!(pushed_id, 3);
    assert_eq!(belt.stats().unwrap().count, 2);
}

#[test]
fn pop_on_empty_belt_blocks_until_a_push() {
    let ipc = std::sync::Arc::new(LocalIpc::new());

    let popper = {
        let ipc = std::sync::Arc::clone(&ipc);
        thread::spawn(move || Belt::new(&*ipc).pop())
    };

    thread::sleep(Duration::from_millis(100));
    assert!(!popper.is_finished(), "pop must block while the belt is empty");

    Belt::new(&*ipc).push(package(7.0, VOL_A)).unwrap();
    let out = popper.join().expect("join").expect("pop after push");
    assert!((out.weight - 7.0).abs() < f64::EPSILON);
}

#[test]
fn blocked_waits_observe_cancellation() {
    let ipc = std::sync::Arc::new(LocalIpc::new());

    let popper = {
        let ipc = std::sync::Arc::clone(&ipc);
        thread::spawn(move || Belt::new(&*ipc).pop())
    };
    thread::sleep(Duration::from_millis(50));

    ipc.cancel();
    let result = popper.join().expect("join");
    assert!(matches!(result, Err(IpcError::ShuttingDown)));
}

#[test]
fn worker_registration_is_bounded() {
    let ipc = LocalIpc::new();
    let belt = Belt::new(&ipc);

    for _ in 0..dockvisor::state::MAX_BELT_WORKERS {
        assert!(belt.register_worker().unwrap());
    }
    assert!(!belt.register_worker().unwrap(), "population bound must hold");

    belt.unregister_worker().unwrap();
    assert!(belt.register_worker().unwrap());
}
