//! The interactive console loop.
//!
//! Reads raw bytes from stdin behind a 100 ms poll so the loop can observe
//! shutdown between keystrokes, splits complete lines off itself (no
//! buffered reader — a reader's internal buffer would hide queued lines
//! from the poll), and renders one line of feedback per command.

use std::time::Duration;

use tracing::info;

use crate::error::IpcError;
use crate::ipc::Ipc;
use crate::sessions::SessionRegistry;
use crate::state::Role;
use crate::terminal::{actions, resolver, ActionOutcome, CliCommand};

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Operator console bound to a logged-in session.
pub struct Console<'a, I: Ipc> {
    ctx: &'a I,
    sessions: &'a SessionRegistry<'a, I>,
    pending: Vec<u8>,
    active: bool,
}

impl<'a, I: Ipc> Console<'a, I> {
    pub fn new(ctx: &'a I, sessions: &'a SessionRegistry<'a, I>) -> Self {
        Console {
            ctx,
            sessions,
            pending: Vec::new(),
            active: true,
        }
    }

    /// Runs until `exit`/`quit`, stdin EOF, or shutdown.
    pub fn run(&mut self) -> Result<(), IpcError> {
        self.print_menu()?;
        self.print_prompt()?;

        while self.active && self.ctx.is_running() {
            if !poll_stdin(POLL_TIMEOUT) {
                continue;
            }
            let mut chunk = [0u8; 4096];
            let n = read_stdin(&mut chunk);
            if n == 0 {
                // EOF: the operator closed the console.
                break;
            }
            self.pending.extend_from_slice(&chunk[..n]);

            while let Some(line) = self.next_line() {
                self.dispatch(&line)?;
                if !self.active {
                    return Ok(());
                }
                self.print_prompt()?;
            }
        }
        Ok(())
    }

    /// Splits one complete line off the pending buffer.
    fn next_line(&mut self) -> Option<String> {
        let nl = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=nl).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }

    fn dispatch(&mut self, line: &str) -> Result<(), IpcError> {
        if line.is_empty() {
            return Ok(());
        }
        let role = self.sessions.current_role()?;
        match resolver::resolve(line) {
            CliCommand::Vip => {
                let outcome = actions::handle_vip(self.ctx, role)?;
                self.render(&outcome, &format!("{CYAN}VIP request sent.{RESET}"));
            }
            CliCommand::Depart => {
                let outcome = actions::handle_depart(self.ctx, role)?;
                self.render(&outcome, &format!("{YELLOW}Departure signal sent.{RESET}"));
            }
            CliCommand::Stop => {
                let outcome = actions::handle_stop(self.ctx, role)?;
                self.render(&outcome, &format!("{RED}SYSTEM HALT COMMANDED.{RESET}"));
                if outcome == ActionOutcome::Sent {
                    self.active = false;
                }
            }
            CliCommand::Help => self.print_menu()?,
            CliCommand::Exit => {
                info!("console closed by operator");
                self.active = false;
            }
            CliCommand::Unknown => println!("  └─ {RED}Unknown command.{RESET}"),
        }
        Ok(())
    }

    fn render(&self, outcome: &ActionOutcome, success_line: &str) {
        match outcome {
            ActionOutcome::Sent => println!("  └─ {success_line}"),
            ActionOutcome::PermissionDenied { required } => {
                println!("  └─ {RED}Permission denied.{RESET} Need {required} role.");
            }
            ActionOutcome::TargetOffline { target } => {
                println!("  └─ {RED}Target offline:{RESET} no {target} available.");
            }
        }
    }

    fn print_menu(&self) -> Result<(), IpcError> {
        let session = self.sessions.current_session()?;
        let (user, org, role) = session
            .map(|s| (s.username_str().to_string(), s.org_id, s.role))
            .unwrap_or_else(|| ("Unknown".to_string(), -1, Role::NONE));

        println!();
        println!("╔══════════════════════════════════════════════════════╗");
        println!("║               WAREHOUSE COMMAND CENTER               ║");
        println!("╠══════════════════════════════════════════════════════╣");
        println!("║ User: {user:<15} Org: {org:<6} RoleMask: {:<4} ║", role.0);
        println!("╠══════════════════════╦═══════════════════════════════╣");
        println!("║ vip                  ║ Express batch (Operator)      ║");
        println!("║ depart               ║ Force truck depart (Operator) ║");
        if role.contains(Role::SYS_ADMIN) {
            println!("║ stop                 ║ {RED}EMERGENCY STOP (Admin){RESET}        ║");
        }
        println!("║ help                 ║ Print this menu               ║");
        println!("║ exit / quit          ║ Close console                 ║");
        println!("╚══════════════════════╩═══════════════════════════════╝");
        Ok(())
    }

    fn print_prompt(&self) -> Result<(), IpcError> {
        use std::io::Write;
        let role = self.sessions.current_role()?;
        if role.contains(Role::SYS_ADMIN) {
            print!("{RED}admin{RESET} # ");
        } else {
            print!("user $ ");
        }
        let _ = std::io::stdout().flush();
        Ok(())
    }
}

/// 100 ms bounded readiness check on stdin.
fn poll_stdin(timeout: Duration) -> bool {
    let mut fds = libc::pollfd {
        fd: libc::STDIN_FILENO,
        events: libc::POLLIN,
        revents: 0,
    };
    let rc = unsafe { libc::poll(&mut fds, 1, timeout.as_millis() as libc::c_int) };
    rc > 0 && (fds.revents & libc::POLLIN) != 0
}

/// Raw read so no user-space buffer hides input from the poll.
fn read_stdin(buf: &mut [u8]) -> usize {
    let n = unsafe {
        libc::read(
            libc::STDIN_FILENO,
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
        )
    };
    n.max(0) as usize
}
