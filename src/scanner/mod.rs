//! Scanner Module - Barcode scanner burst detection
//!
//! Handheld scanners pretend to be keyboards: they type a whole code in a
//! few milliseconds and finish with Enter. This module watches keyboard
//! dispatch and tells those bursts apart from human typing by timing alone.
//!
//! - **Options** - `min_length`, `max_delay`, terminators, TOML loading
//! - **Classifier** - Pure timing state machine (`Idle` / `Accumulating`)
//! - **Timer** - Idle timeout for bursts that never get a terminator
//! - **Feedback** - Best-effort tone and vibration on a scan
//! - **Listener** - Capture-phase hook with start/stop lifecycle

mod classifier;
mod feedback;
mod listener;
mod options;
mod timer;

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

pub use classifier::{Decision, ScanBurstClassifier, ScanInput};
pub use feedback::{acknowledge, Feedback, FeedbackError, Silent, TerminalBell};
pub use listener::{last_scan, listen, reset_last_scan, ScannerHandle};
pub use options::{ConfigError, ScannerOptions, DEFAULT_MAX_DELAY, DEFAULT_MIN_LENGTH};
pub use timer::IdleTimer;

/// Errors starting a scanner listener.
#[derive(Debug, Error)]
pub enum ScannerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start idle timer: {0}")]
    Timer(#[from] std::io::Error),
}

/// Lock, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
