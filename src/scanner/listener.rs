//! Scanner Listener - wires the classifier into keyboard dispatch
//!
//! Registers a capture-phase handler so the classifier sees every key before
//! a focused input can swallow it, and owns the idle timer. On a completed
//! scan the terminator is stopped (prevent default + stop propagation), the
//! focused text input is cleared of the scanner's echo, the scan is
//! acknowledged, and the callback runs once with the payload.
//!
//! # Example
//!
//! ```ignore
//! use spark_scan::scanner::{listen, ScannerOptions, TerminalBell};
//!
//! let handle = listen(ScannerOptions::default(), |code| {
//!     println!("scanned {code}");
//! }, TerminalBell)?;
//!
//! // Later, on unmount:
//! handle.stop();
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use spark_signals::{signal, Signal};
use tracing::{debug, info, trace};

use crate::state::focus;
use crate::state::keyboard::{self, KeyboardEvent};

use super::classifier::{Decision, ScanBurstClassifier, ScanInput};
use super::feedback::{acknowledge, Feedback};
use super::lock;
use super::options::ScannerOptions;
use super::timer::IdleTimer;
use super::ScannerError;

// =============================================================================
// LAST SCAN SIGNAL
// =============================================================================

thread_local! {
    static LAST_SCAN: Signal<Option<String>> = signal(None);
}

/// Most recent scan payload delivered on this thread
pub fn last_scan() -> Option<String> {
    LAST_SCAN.with(|s| s.get())
}

/// Reset the last scan (for testing)
pub fn reset_last_scan() {
    LAST_SCAN.with(|s| s.set(None));
}

// =============================================================================
// LISTENER
// =============================================================================

struct Listener {
    enabled: Signal<bool>,
    classifier: Arc<Mutex<ScanBurstClassifier>>,
    timer: RefCell<Option<IdleTimer>>,
    on_scan: Box<dyn Fn(&str)>,
    feedback: Box<dyn Feedback>,
}

impl Listener {
    fn handle(&self, event: &KeyboardEvent) -> bool {
        if !self.enabled.get() {
            return false;
        }

        let focused = focus::get_focused_index();
        let in_modal = focus::focus_in_modal();
        let input = ScanInput::from_event(event, in_modal);

        let (decision, deadline) = {
            let mut classifier = lock(&self.classifier);
            let decision = classifier.classify(&input, event.timestamp);
            (decision, classifier.idle_deadline())
        };
        if let Some(timer) = self.timer.borrow().as_ref() {
            timer.sync(deadline);
        }

        match decision {
            Decision::Scan(payload) => {
                event.prevent_default();
                event.stop_propagation();

                if let Some(index) = focused.filter(|&i| focus::is_text_input(i)) {
                    focus::clear_value(index);
                }

                acknowledge(self.feedback.as_ref());
                info!(len = payload.chars().count(), "scan detected");
                LAST_SCAN.with(|s| s.set(Some(payload.clone())));
                (self.on_scan)(&payload);
                true
            }
            Decision::TooShort => {
                debug!(key = %event.key, "terminator after short burst ignored");
                false
            }
            Decision::Rejected => {
                debug!("burst abandoned as manual typing");
                false
            }
            other => {
                trace!(?other, key = %event.key, "scan classifier");
                false
            }
        }
    }

    fn disarm(&self) {
        lock(&self.classifier).reset();
        if let Some(timer) = self.timer.borrow().as_ref() {
            timer.cancel();
        }
    }
}

/// Handle for an active scanner listener.
///
/// Dropping the handle detaches it just like [`ScannerHandle::stop`].
pub struct ScannerHandle {
    listener: Rc<Listener>,
    detach: Option<Box<dyn FnOnce()>>,
}

impl ScannerHandle {
    /// Enable or disable interception. Takes effect on the next event;
    /// disabling drops any buffered burst and cancels the idle timer.
    pub fn set_enabled(&self, enabled: bool) {
        if self.listener.enabled.get() == enabled {
            return;
        }
        if !enabled {
            self.listener.disarm();
        }
        self.listener.enabled.set(enabled);
        debug!(enabled, "scanner toggled");
    }

    pub fn is_enabled(&self) -> bool {
        self.listener.enabled.get()
    }

    /// Characters currently buffered
    pub fn buffered(&self) -> String {
        lock(&self.listener.classifier).buffer().to_string()
    }

    /// Detach from keyboard dispatch and stop the idle timer.
    pub fn stop(self) {
        drop(self);
    }

    fn teardown(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
        self.listener.disarm();
        if let Some(timer) = self.listener.timer.borrow_mut().take() {
            timer.shutdown();
        }
    }
}

impl Drop for ScannerHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Start listening for scanner bursts on this thread's keyboard dispatch.
///
/// `on_scan` runs once per completed scan, inside dispatch, after the
/// terminator has been stopped.
pub fn listen<F, B>(options: ScannerOptions, on_scan: F, feedback: B) -> Result<ScannerHandle, ScannerError>
where
    F: Fn(&str) + 'static,
    B: Feedback + 'static,
{
    options.validate()?;

    let enabled = signal(options.enabled);
    let classifier = Arc::new(Mutex::new(ScanBurstClassifier::new(options)));

    let expiring = classifier.clone();
    let timer = IdleTimer::spawn(move |now| {
        if lock(&expiring).expire_idle(now) {
            debug!("unterminated scan burst cleared");
        }
    })?;

    let listener = Rc::new(Listener {
        enabled,
        classifier,
        timer: RefCell::new(Some(timer)),
        on_scan: Box::new(on_scan),
        feedback: Box::new(feedback),
    });

    let handler = listener.clone();
    let detach = keyboard::on_capture(move |event| handler.handle(event));

    Ok(ScannerHandle {
        listener,
        detach: Some(Box::new(detach)),
    })
}

// =============================================================================
// TESTS
// =============================================================================
