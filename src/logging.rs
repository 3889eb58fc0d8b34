//! # Per-process log initialization.
//!
//! Every role process calls [`init`] with its name before touching IPC.
//! Behavior is driven by environment variables:
//!
//! - `LOG_TO_CONSOLE` ∈ {true,false} — stdout sink (default true)
//! - `LOG_TO_FILE` ∈ {true,false} — `logs/<proc>.log` sink (default true)
//! - `LOG_LEVEL` ∈ {trace,debug,info,warn,err,crit,off} — case-insensitive,
//!   default `info`; `crit` maps to `error`, which is the highest tracing
//!   level.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Maps a `LOG_LEVEL` string to a tracing filter. Unknown values fall back
/// to `info`.
pub fn level_from_str(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "err" | "error" | "crit" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => v.trim().eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}

/// Initializes the global subscriber for this process.
///
/// Safe to call once per process; errors opening the log file degrade to
/// console-only logging rather than aborting the role.
pub fn init(proc_name: &str) {
    let level = level_from_str(&std::env::var("LOG_LEVEL").unwrap_or_default());
    let to_console = env_flag("LOG_TO_CONSOLE", true);
    let to_file = env_flag("LOG_TO_FILE", true);

    let console_layer = to_console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
    });

    let file_layer = to_file
        .then(|| {
            let dir = Path::new("logs");
            fs::create_dir_all(dir).ok()?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(format!("{proc_name}.log")))
                .ok()?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        })
        .flatten();

    // A second init (tests, embedded use) is not an error worth dying for.
    let _ = tracing_subscriber::registry()
        .with(level)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_mapping_is_case_insensitive() {
        assert_eq!(level_from_str("TRACE"), LevelFilter::TRACE);
        assert_eq!(level_from_str("Debug"), LevelFilter::DEBUG);
        assert_eq!(level_from_str("warn"), LevelFilter::WARN);
        assert_eq!(level_from_str("ERR"), LevelFilter::ERROR);
        assert_eq!(level_from_str("crit"), LevelFilter::ERROR);
        assert_eq!(level_from_str("off"), LevelFilter::OFF);
    }

    #[test]
    fn unknown_level_defaults_to_info() {
        assert_eq!(level_from_str(""), LevelFilter::INFO);
        assert_eq!(level_from_str("verbose"), LevelFilter::INFO);
    }
}
