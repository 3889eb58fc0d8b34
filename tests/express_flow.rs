//! Express lane scenarios: VIP fill-up, dropped orders, and partial
//! batches.

use std::time::Duration;

use dockvisor::testing::LocalIpc;
use dockvisor::{BackoffPolicy, Command, Express, Ipc, RecipientTag};

fn fast_backoff() -> BackoffPolicy {
    BackoffPolicy::constant(Duration::from_millis(10))
}

/// Scenario: a VIP package tops off an almost-full truck; one departure.
#[test]
fn vip_package_fills_the_truck() {
    let ipc = LocalIpc::new();
    ipc.with_dock(|s| {
        s.dock_truck.dock(101, 10, 100.0, 400.0);
        s.dock_truck.current_load = 9;
    })
    .unwrap();

    let mut express = Express::new(&ipc, fast_backoff(), 3);
    express.deliver_vip_package().expect("vip delivery");

    ipc.with_dock(|s| {
        assert_eq!(s.dock_truck.current_load, 10);
        assert!(s.dock_truck.current_weight > 0.0);
    })
    .unwrap();
    assert_eq!(
        ipc.drain_messages_for(RecipientTag::for_pid(101)),
        vec![Command::Departure]
    );
}

/// With no truck docked the VIP order is dropped, not queued; the id it
/// reserved stays consumed so ids remain monotonic.
#[test]
fn vip_order_without_truck_is_dropped() {
    let ipc = LocalIpc::new();

    let mut express = Express::new(&ipc, fast_backoff(), 3);
    express.deliver_vip_package().expect("drop is not an error");

    assert_eq!(ipc.pending_messages(), 0);
    ipc.with_belt(|s| assert_eq!(s.total_packages_created, 1)).unwrap();
}

/// A batch is cut short at the first package the truck cannot host.
#[test]
fn express_batch_is_partial_on_overflow() {
    let ipc = LocalIpc::new();
    ipc.with_dock(|s| s.dock_truck.dock(101, 2, 1000.0, 1000.0)).unwrap();

    let mut express = Express::new(&ipc, fast_backoff(), 3);
    let loaded = express.deliver_express_batch().expect("batch");

    // Batches are 3–5 items; a two-slot truck always overflows.
    assert_eq!(loaded, 2);
    ipc.with_dock(|s| assert_eq!(s.dock_truck.current_load, 2)).unwrap();
    assert_eq!(
        ipc.drain_messages_for(RecipientTag::for_pid(101)),
        vec![Command::Departure]
    );
}

/// A roomy truck takes the whole batch with no departure.
#[test]
fn express_batch_loads_fully_into_a_roomy_truck() {
    let ipc = LocalIpc::new();
    ipc.with_dock(|s| s.dock_truck.dock(101, 100, 1000.0, 1000.0)).unwrap();

    let mut express = Express::new(&ipc, fast_backoff(), 3);
    let loaded = express.deliver_express_batch().expect("batch");

    assert!((3..=5).contains(&loaded), "batch size out of contract: {loaded}");
    ipc.with_dock(|s| assert_eq!(s.dock_truck.current_load as usize, loaded)).unwrap();
    assert!(ipc.drain_messages_for(RecipientTag::for_pid(101)).is_empty());
}

/// A batch with no truck present is dropped whole.
#[test]
fn express_batch_without_truck_is_dropped() {
    let ipc = LocalIpc::new();

    let mut express = Express::new(&ipc, fast_backoff(), 3);
    let loaded = express.deliver_express_batch().expect("batch");

    assert_eq!(loaded, 0);
    assert_eq!(ipc.pending_messages(), 0);
}
