//! Truck FSM: docking, end-of-work while docked, the identity guard, and
//! the departure accounting.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dockvisor::testing::LocalIpc;
use dockvisor::{Command, Ipc, IpcError, RecipientTag, Truck};

fn wait_until(deadline: Duration, mut probe: impl FnMut() -> bool) {
    let end = Instant::now() + deadline;
    while !probe() {
        assert!(Instant::now() < end, "condition not reached in time");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn truck_docks_and_leaves_on_end_work() {
    let ipc = Arc::new(LocalIpc::new());
    let me = RecipientTag::self_tag();

    let driver = {
        let ipc = Arc::clone(&ipc);
        thread::spawn(move || Truck::new(&*ipc, 11).run())
    };

    // The truck claims the free dock and randomizes its capacities.
    wait_until(Duration::from_secs(2), || {
        ipc.with_dock(|s| s.dock_truck.is_present).unwrap()
    });
    ipc.with_dock(|s| {
        assert_eq!(s.dock_truck.id, std::process::id() as i32);
        assert!((5..=15).contains(&s.dock_truck.max_load));
        assert!((50.0..=150.0).contains(&s.dock_truck.max_weight));
        assert!((150.0..=400.0).contains(&s.dock_truck.max_volume));
        assert_eq!(s.dock_truck.current_load, 0);
    })
    .unwrap();

    // End the shift while docked: no delivery is counted, the dock clears.
    ipc.send(me, Command::EndWork).unwrap();
    driver.join().expect("join").expect("clean end of shift");

    ipc.with_dock(|s| {
        assert!(!s.dock_truck.is_present, "occupant must clear the dock on shutdown");
        assert_eq!(s.trucks_completed, 0);
    })
    .unwrap();
}

#[test]
fn departure_counts_the_delivery_and_frees_the_dock() {
    let ipc = Arc::new(LocalIpc::new());
    let me = RecipientTag::self_tag();

    let driver = {
        let ipc = Arc::clone(&ipc);
        thread::spawn(move || Truck::new(&*ipc, 11).run())
    };

    wait_until(Duration::from_secs(2), || {
        ipc.with_dock(|s| s.dock_truck.is_present).unwrap()
    });
    ipc.send(me, Command::Departure).unwrap();

    // Departing → EnRoute: the dock frees while the truck drives.
    wait_until(Duration::from_secs(2), || {
        ipc.with_dock(|s| !s.dock_truck.is_present && s.trucks_completed == 1)
            .unwrap()
    });

    // The truck is en route (3–8s); stop the shift and let it wind down.
    ipc.request_halt();
    ipc.send(me, Command::EndWork).ok();
    driver.join().expect("join").expect("clean shift end");
}

#[test]
fn identity_mismatch_aborts_the_cycle() {
    let ipc = Arc::new(LocalIpc::new());
    let me = RecipientTag::self_tag();

    let driver = {
        let ipc = Arc::clone(&ipc);
        thread::spawn(move || Truck::new(&*ipc, 11).run())
    };

    wait_until(Duration::from_secs(2), || {
        ipc.with_dock(|s| s.dock_truck.is_present).unwrap()
    });

    // Another process "steals" the dock slot; the departing truck must
    // refuse to clear it.
    ipc.with_dock(|s| s.dock_truck.id = 999_999).unwrap();
    ipc.send(me, Command::Departure).unwrap();

    let result = driver.join().expect("join");
    assert!(matches!(result, Err(IpcError::InvariantViolation { .. })));
    ipc.with_dock(|s| {
        assert!(s.dock_truck.is_present, "a mismatched truck must not clear the dock");
        assert_eq!(s.trucks_completed, 0);
    })
    .unwrap();
}
