//! Scan burst classifier - the timing state machine.
//!
//! Pure: every transition takes the event and its timestamp, nothing reads a
//! clock or touches the terminal. The listener feeds it real events and acts
//! on the returned [`Decision`].
//!
//! ```text
//!   Idle ──char──▶ Accumulating ──char (< max_delay)──▶ Accumulating
//!     ▲                 │
//!     └── terminator / gap / idle timeout / modal ──┘
//! ```

use std::time::{Duration, Instant};

use tracing::trace;

use crate::state::keyboard::{self, KeyboardEvent, Modifiers};

use super::options::ScannerOptions;

/// What the classifier needs to know about one key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanInput<'a> {
    pub key: &'a str,
    pub modifiers: Modifiers,
    /// Key-down (press). Repeats and releases are ignored.
    pub is_press: bool,
    /// Focus sits inside a modal surface.
    pub in_modal: bool,
}

impl<'a> ScanInput<'a> {
    /// Plain key press outside any modal
    pub fn key(key: &'a str) -> Self {
        Self {
            key,
            modifiers: Modifiers::none(),
            is_press: true,
            in_modal: false,
        }
    }

    pub fn from_event(event: &'a KeyboardEvent, in_modal: bool) -> Self {
        Self {
            key: &event.key,
            modifiers: event.modifiers,
            is_press: event.is_press(),
            in_modal,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn in_modal(mut self) -> Self {
        self.in_modal = true;
        self
    }

    fn printable(&self) -> Option<char> {
        if self.modifiers.has_command() {
            return None;
        }
        keyboard::printable(self.key)
    }
}

/// Outcome of feeding one event to the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Not a key the classifier looks at; buffer untouched (the gap rule
    /// may still have dropped a stale burst).
    Ignored,
    /// Focus is inside a modal; any burst was dropped.
    Suppressed,
    /// Character appended to the burst.
    Accepted,
    /// Character arrived too slowly to continue the burst; burst dropped and
    /// the character not kept.
    Rejected,
    /// Terminator arrived after a burst shorter than `min_length`.
    TooShort,
    /// Terminator completed a burst: the scan payload.
    Scan(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Burst {
    #[default]
    Idle,
    Accumulating {
        chars: String,
        len: usize,
        last: Instant,
    },
}

/// Tells scanner bursts from human typing by inter-key timing.
#[derive(Debug, Clone)]
pub struct ScanBurstClassifier {
    options: ScannerOptions,
    burst: Burst,
}

impl ScanBurstClassifier {
    pub fn new(options: ScannerOptions) -> Self {
        Self {
            options,
            burst: Burst::Idle,
        }
    }

    pub fn options(&self) -> &ScannerOptions {
        &self.options
    }

    /// Characters buffered so far
    pub fn buffer(&self) -> &str {
        match &self.burst {
            Burst::Idle => "",
            Burst::Accumulating { chars, .. } => chars,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.burst == Burst::Idle
    }

    /// When the current burst expires if nothing else arrives
    pub fn idle_deadline(&self) -> Option<Instant> {
        match &self.burst {
            Burst::Idle => None,
            Burst::Accumulating { last, .. } => Some(*last + self.options.idle_timeout()),
        }
    }

    /// Drop any buffered burst
    pub fn reset(&mut self) {
        self.burst = Burst::Idle;
    }

    /// Clear a burst whose idle deadline has passed.
    /// Returns true if something was cleared.
    pub fn expire_idle(&mut self, now: Instant) -> bool {
        match self.idle_deadline() {
            Some(deadline) if now >= deadline => {
                trace!(buffered = self.buffer().len(), "scan burst idle timeout");
                self.reset();
                true
            }
            _ => false,
        }
    }

    /// Feed one key event observed at `now`.
    pub fn classify(&mut self, input: &ScanInput<'_>, now: Instant) -> Decision {
        if !input.is_press {
            return Decision::Ignored;
        }

        if input.in_modal {
            self.reset();
            return Decision::Suppressed;
        }

        // Gap rule: a stale burst is abandoned before this event counts
        let elapsed = self.elapsed(now);
        if elapsed.is_some_and(|gap| gap > self.options.max_delay) {
            trace!(buffered = self.buffer().len(), "scan burst gap exceeded");
            self.reset();
        }

        if self.options.is_terminator(input.key) {
            return match std::mem::take(&mut self.burst) {
                Burst::Idle => Decision::Ignored,
                Burst::Accumulating { chars, len, .. } if len >= self.options.min_length => {
                    Decision::Scan(chars)
                }
                Burst::Accumulating { len, .. } => {
                    trace!(len, "scan burst too short");
                    Decision::TooShort
                }
            };
        }

        let Some(c) = input.printable() else {
            return Decision::Ignored;
        };

        let max_delay = self.options.max_delay;
        match &mut self.burst {
            Burst::Accumulating { chars, len, last }
                if now.saturating_duration_since(*last) < max_delay =>
            {
                chars.push(c);
                *len += 1;
                *last = now;
                Decision::Accepted
            }
            Burst::Accumulating { .. } => {
                // Exactly max_delay: neither continuation nor fresh start
                self.burst = Burst::Idle;
                Decision::Rejected
            }
            Burst::Idle => {
                self.burst = Burst::Accumulating {
                    chars: c.to_string(),
                    len: 1,
                    last: now,
                };
                Decision::Accepted
            }
        }
    }

    fn elapsed(&self, now: Instant) -> Option<Duration> {
        match &self.burst {
            Burst::Idle => None,
            Burst::Accumulating { last, .. } => Some(now.saturating_duration_since(*last)),
        }
    }
}
