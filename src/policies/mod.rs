//! # Retry pacing policies.
//!
//! The dispatcher and the workers sleep between retries instead of spinning
//! on the dock or the quota. [`BackoffPolicy`] controls how those delays
//! grow; [`JitterPolicy`] de-synchronizes competing processes.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
