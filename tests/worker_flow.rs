//! Worker production loop: quota bracketing, registration, and shutdown.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dockvisor::state::{Role, MAX_BELT_WORKERS};
use dockvisor::testing::LocalIpc;
use dockvisor::{Belt, Ipc, SessionRegistry, Worker};

fn wait_until(deadline: Duration, mut probe: impl FnMut() -> bool) {
    let end = Instant::now() + deadline;
    while !probe() {
        assert!(Instant::now() < end, "condition not reached in time");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn worker_produces_until_halt_and_unregisters() {
    let ipc = Arc::new(LocalIpc::new());

    let producer = {
        let ipc = Arc::clone(&ipc);
        thread::spawn(move || {
            let mut sessions = SessionRegistry::new(&*ipc);
            sessions.login("Worker_1", Role::OPERATOR, 0, 10).expect("login");
            let mut worker = Worker::new(
                &*ipc,
                1,
                Duration::from_millis(5),
                Duration::from_millis(5),
                42,
            );
            let result = worker.run(&sessions);
            sessions.logout().expect("logout");
            result
        })
    };

    // Production is flowing; drain so the belt never saturates.
    let belt = Belt::new(&*ipc);
    let mut drained = 0;
    wait_until(Duration::from_secs(5), || {
        while belt.stats().unwrap().count > 0 {
            let pkg = belt.pop().unwrap();
            assert!(pkg.id > 0);
            assert!(pkg.weight > 0.0);
            drained += 1;
        }
        drained >= 3
    });

    ipc.request_halt();
    producer.join().expect("join").expect("clean shift end");

    // The worker released its belt registration and its quota.
    ipc.with_belt(|s| {
        assert_eq!(s.workers, 0);
        assert!(s.users.iter().all(|u| !u.active));
    })
    .unwrap();
}

#[test]
fn saturated_worker_population_refuses_the_shift() {
    let ipc = LocalIpc::new();
    ipc.with_belt(|s| s.workers = MAX_BELT_WORKERS).unwrap();

    let mut sessions = SessionRegistry::new(&ipc);
    sessions.login("Worker_9", Role::OPERATOR, 0, 10).expect("login");

    let mut worker = Worker::new(
        &ipc,
        9,
        Duration::from_millis(5),
        Duration::from_millis(5),
        42,
    );
    worker.run(&sessions).expect("clean refusal");

    // Nothing was produced and the population was left untouched.
    ipc.with_belt(|s| {
        assert_eq!(s.workers, MAX_BELT_WORKERS);
        assert_eq!(s.total_packages_created, 0);
    })
    .unwrap();
}

#[test]
fn zero_quota_blocks_production() {
    let ipc = Arc::new(LocalIpc::new());

    let producer = {
        let ipc = Arc::clone(&ipc);
        thread::spawn(move || {
            let mut sessions = SessionRegistry::new(&*ipc);
            sessions.login("Worker_0", Role::OPERATOR, 0, 0).expect("login");
            let mut worker = Worker::new(
                &*ipc,
                0,
                Duration::from_millis(5),
                Duration::from_millis(5),
                42,
            );
            let result = worker.run(&sessions);
            sessions.logout().expect("logout");
            result
        })
    };

    thread::sleep(Duration::from_millis(150));
    ipc.with_belt(|s| assert_eq!(s.total_packages_created, 0)).unwrap();

    ipc.request_halt();
    producer.join().expect("join").expect("clean shift end");
}
