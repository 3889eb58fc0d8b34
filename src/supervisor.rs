//! # Supervisor: the orchestrator of IPC resources and role processes.
//!
//! The supervisor owns the only reference that may destroy `(S, Σ, Q)`.
//! It creates the resources, spawns the role processes, watches them, and
//! tears everything down on shutdown.
//!
//! ## Architecture
//! ```text
//! Supervisor::run()
//!     ├──► IpcContext::create_owner()        (S zeroed, Σ initialized, Q fresh)
//!     ├──► spawn roles (staggered):
//!     │        dispatcher, express, belt-monitor, truck×T, worker×W
//!     │        └──► JoinSet waits each child; exits become events
//!     ├──► subscriber_listener()
//!     │        ├──► updates AliveTracker
//!     │        └──► fans out to SubscriberSet
//!     └──► wait for:
//!           ├──► every role exits           → halt, destroy, Ok
//!           └──► OS signal                  → graceful shutdown:
//!                 ├──► running = false
//!                 ├──► END_WORK to every active session pid
//!                 ├──► SIGTERM children (breaks blocking waits)
//!                 ├──► wait up to Config::grace
//!                 └──► SIGKILL stragglers → Err(GraceExceeded)
//! ```
//!
//! ## Rules
//! - Alive tracking uses sequence numbers (handles out-of-order events).
//! - Subscriber fan-out is non-blocking (per-subscriber queues).
//! - Graceful shutdown waits at most `Config::grace`.
//! - The IPC resources are destroyed when the owner context drops — after
//!   the grace period, never before.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::{task::JoinSet, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::alive::AliveTracker;
use crate::config::Config;
use crate::error::{IpcError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::ipc::{Command, Ipc, IpcContext, RecipientTag};
use crate::shutdown::{self, ShutdownToken};
use crate::subscribers::{Subscribe, SubscriberSet};

/// One planned role process.
#[derive(Clone, Debug)]
struct RolePlan {
    /// Unique display name, e.g. `"truck-2"`.
    name: String,
    /// Sibling binary to execute.
    binary: &'static str,
    /// Optional numeric id argument.
    arg: Option<u32>,
}

/// Name → pid of live children, for signalling.
type ChildPids = Arc<Mutex<HashMap<String, u32>>>;

/// Orchestrates role processes, event delivery, and graceful shutdown.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    alive: Arc<AliveTracker>,
}

impl Supervisor {
    /// Creates a supervisor with the given config and subscribers.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(1024);
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        Self {
            cfg,
            bus,
            subs,
            alive: Arc::new(AliveTracker::new()),
        }
    }

    /// Runs the warehouse until every role exits or a shutdown signal
    /// arrives.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let token = ShutdownToken::new();
        let ctx = IpcContext::create_owner(&self.cfg, token)?;

        // Listener first, so early role events are not missed.
        let runtime_token = CancellationToken::new();
        self.subscriber_listener(&runtime_token);
        self.bus.publish(Event::now(EventKind::ResourcesReady));

        let pids: ChildPids = Arc::new(Mutex::new(HashMap::new()));
        let mut set: JoinSet<(String, Option<i32>)> = JoinSet::new();

        let result = self.spawn_and_drive(&ctx, &mut set, &pids).await;
        runtime_token.cancel();
        result
    }

    async fn spawn_and_drive(
        &self,
        ctx: &IpcContext,
        set: &mut JoinSet<(String, Option<i32>)>,
        pids: &ChildPids,
    ) -> Result<(), RuntimeError> {
        for plan in self.role_plan() {
            if let Err(e) = self.spawn_role(&plan, set, pids) {
                // A missing binary would strand the already-spawned roles;
                // unwind through the graceful path.
                self.bus.publish(
                    Event::now(EventKind::RoleFailed)
                        .with_role(&plan.name)
                        .with_error(e.to_string()),
                );
                let _ = self.graceful_shutdown(ctx, set, pids).await;
                return Err(e);
            }
            tokio::time::sleep(self.cfg.startup_stagger).await;
        }

        self.drive(ctx, set, pids).await
    }

    /// Current alive-role snapshot (monitoring/debugging).
    pub async fn snapshot(&self) -> Vec<String> {
        self.alive.snapshot().await
    }

    /// The spawn plan: one dispatcher, one express, one belt monitor,
    /// T trucks, W workers.
    fn role_plan(&self) -> Vec<RolePlan> {
        let mut plan = vec![
            RolePlan {
                name: "dispatcher".into(),
                binary: "dispatcher",
                arg: None,
            },
            RolePlan {
                name: "express".into(),
                binary: "express",
                arg: None,
            },
            RolePlan {
                name: "belt-monitor".into(),
                binary: "belt-monitor",
                arg: None,
            },
        ];
        for t in 1..=self.cfg.trucks {
            plan.push(RolePlan {
                name: format!("truck-{t}"),
                binary: "truck",
                arg: Some(t),
            });
        }
        for w in 1..=self.cfg.workers {
            plan.push(RolePlan {
                name: format!("worker-{w}"),
                binary: "worker",
                arg: Some(w),
            });
        }
        plan
    }

    fn spawn_role(
        &self,
        plan: &RolePlan,
        set: &mut JoinSet<(String, Option<i32>)>,
        pids: &ChildPids,
    ) -> Result<(), RuntimeError> {
        let spawn_err = |source| RuntimeError::Spawn {
            role: plan.name.clone(),
            source,
        };

        let mut command = tokio::process::Command::new(sibling_binary(plan.binary)?);
        if let Some(arg) = plan.arg {
            command.arg(arg.to_string());
        }
        let mut child = command.spawn().map_err(spawn_err)?;

        let pid = child.id().unwrap_or_default();
        pids.lock().expect("child pid map poisoned").insert(plan.name.clone(), pid);
        self.bus.publish(
            Event::now(EventKind::RoleSpawned)
                .with_role(&plan.name)
                .with_pid(pid),
        );

        let name = plan.name.clone();
        set.spawn(async move {
            let code = child.wait().await.ok().and_then(|status| status.code());
            (name, code)
        });
        Ok(())
    }

    /// Waits for either natural completion or a shutdown signal.
    async fn drive(
        &self,
        ctx: &IpcContext,
        set: &mut JoinSet<(String, Option<i32>)>,
        pids: &ChildPids,
    ) -> Result<(), RuntimeError> {
        let signal = shutdown::wait_for_shutdown_signal();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => {
                    self.bus.publish(Event::now(EventKind::ShutdownRequested));
                    return self.graceful_shutdown(ctx, set, pids).await;
                }
                joined = set.join_next() => {
                    if let Some(result) = joined {
                        self.report_child_exit(result, pids);
                    }
                    if set.is_empty() {
                        // Every role died on its own; nothing left to host.
                        warn!("all role processes exited, shutting the system down");
                        ctx.request_halt();
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Graceful path: halt flag, END_WORK broadcast, SIGTERM, grace wait.
    async fn graceful_shutdown(
        &self,
        ctx: &IpcContext,
        set: &mut JoinSet<(String, Option<i32>)>,
        pids: &ChildPids,
    ) -> Result<(), RuntimeError> {
        ctx.request_halt();
        self.broadcast_end_work(ctx);
        signal_children(pids, libc::SIGTERM);

        let grace = self.cfg.grace;
        let drain = async {
            while let Some(result) = set.join_next().await {
                self.report_child_exit(result, pids);
            }
        };

        match timeout(grace, drain).await {
            Ok(()) => {
                self.bus.publish(Event::now(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                self.bus.publish(Event::now(EventKind::GraceExceeded));
                let stuck = self.alive.snapshot().await;
                signal_children(pids, libc::SIGKILL);
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// `END_WORK` to every active session pid. A saturated queue loses the
    /// command for that recipient; SIGTERM still reaches it.
    fn broadcast_end_work(&self, ctx: &IpcContext) {
        let sessions = match ctx.with_belt(|s| s.active_session_pids()) {
            Ok(pids) => pids,
            Err(e) => {
                warn!(error = e.as_label(), "could not read session table for broadcast");
                return;
            }
        };
        for pid in sessions {
            match ctx.send(RecipientTag::for_pid(pid), Command::EndWork) {
                Ok(()) => {}
                Err(IpcError::QueueFull) => warn!(pid, "END_WORK lost, queue full"),
                Err(e) => warn!(pid, error = e.as_label(), "END_WORK not delivered"),
            }
        }
    }

    fn report_child_exit(
        &self,
        result: Result<(String, Option<i32>), tokio::task::JoinError>,
        pids: &ChildPids,
    ) {
        match result {
            Ok((name, code)) => {
                pids.lock().expect("child pid map poisoned").remove(&name);
                let event = match code {
                    Some(0) => Event::now(EventKind::RoleExited).with_role(&name).with_exit_code(0),
                    Some(code) => Event::now(EventKind::RoleFailed)
                        .with_role(&name)
                        .with_exit_code(code),
                    None => Event::now(EventKind::RoleFailed)
                        .with_role(&name)
                        .with_error("terminated by signal"),
                };
                self.bus.publish(event);
            }
            Err(join_err) => {
                self.bus.publish(
                    Event::now(EventKind::RoleFailed).with_error(join_err.to_string()),
                );
            }
        }
    }

    /// Spawns the background task that feeds the alive tracker and the
    /// subscriber set from the bus. Lives until `runtime_token` cancels.
    fn subscriber_listener(&self, runtime_token: &CancellationToken) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        let alive = Arc::clone(&self.alive);
        let rt = runtime_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = rt.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => {
                            let arc_ev = Arc::new(ev);
                            alive.update(&arc_ev).await;
                            set.emit_arc(arc_ev);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            }
        });
    }
}

/// Resolves a role binary next to the orchestrator executable.
fn sibling_binary(name: &str) -> Result<PathBuf, RuntimeError> {
    let spawn_err = |source| RuntimeError::Spawn {
        role: name.to_string(),
        source,
    };
    let exe = std::env::current_exe().map_err(&spawn_err)?;
    let dir = exe.parent().ok_or_else(|| {
        spawn_err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "orchestrator binary has no parent directory",
        ))
    })?;
    Ok(dir.join(name))
}

/// Best-effort signal to every live child; dead pids are ignored.
fn signal_children(pids: &ChildPids, signal: libc::c_int) {
    let map = pids.lock().expect("child pid map poisoned");
    for &pid in map.values() {
        if pid != 0 {
            unsafe {
                libc::kill(pid as libc::pid_t, signal);
            }
        }
    }
}
