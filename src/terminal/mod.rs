//! # Terminal: the operator command surface.
//!
//! A console process resolves lower-cased input lines against a fixed
//! command table and dispatches them subject to the operator's role mask.
//! Input polling is bounded (100 ms) so the console interleaves with
//! shutdown checks and never blocks indefinitely.

mod actions;
mod console;
mod resolver;

pub use actions::{handle_depart, handle_stop, handle_vip, ActionOutcome};
pub use console::Console;
pub use resolver::{resolve, CliCommand};
