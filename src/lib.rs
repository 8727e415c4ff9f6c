//! # spark-scan
//!
//! Barcode scanner detection for terminal applications.
//!
//! Keyboard-wedge scanners type a full code in milliseconds and finish with
//! Enter. spark-scan watches the key stream in the capture phase, tells those
//! bursts apart from human typing by inter-key timing, and hands the decoded
//! code to a callback, without the scanner's Enter submitting whatever input
//! happened to have focus.
//!
//! ## Architecture
//!
//! ```text
//! crossterm → input::route_event → keyboard::dispatch
//!                                      ├─ capture: scanner listener → classifier → on_scan
//!                                      ├─ focused element handlers
//!                                      └─ key / global handlers
//!                                  → focus::apply_default_action
//! ```
//!
//! ## Modules
//!
//! - [`state`] - Keyboard events and dispatch, focus context, crossterm bridge
//! - [`scanner`] - Options, burst classifier, idle timer, feedback, listener

pub mod scanner;
pub mod state;

pub use scanner::{
    acknowledge, last_scan, listen, ConfigError, Decision, Feedback, FeedbackError,
    ScanBurstClassifier, ScanInput, ScannerError, ScannerHandle, ScannerOptions, Silent,
    TerminalBell,
};

pub use state::{
    dispatch as dispatch_keyboard, ElementKind, InputEvent, KeyState, KeyboardEvent, Modifiers,
};
