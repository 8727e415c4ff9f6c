//! Keyboard Module - Keyboard event state and handler registry
//!
//! State and handler registry for keyboard events.
//! Does NOT own stdin (that is the input module).
//!
//! Handlers are split into two phases, mirroring the browser model:
//!
//! - **Capture** handlers run first, before anything focused gets a chance.
//!   The scanner listener lives here so it sees keys that a text input
//!   would otherwise swallow.
//! - **Bubble** handlers (focused component, key-specific, global) run after.
//!
//! Any handler can stop propagation (return `true` or call
//! [`KeyboardEvent::stop_propagation`]) and can prevent the default action
//! ([`KeyboardEvent::prevent_default`]) the focused element would otherwise
//! apply.
//!
//! # API
//!
//! - `last_event` - Get last keyboard event
//! - `last_key` - Get last key pressed
//! - `on_capture(handler)` - Subscribe to all events in the capture phase
//! - `on(handler)` - Subscribe to all keyboard events
//! - `on_key(key, fn)` - Subscribe to specific key(s)
//! - `on_focused(i, fn)` - Subscribe when element i has focus
//!
//! # Example
//!
//! ```ignore
//! use spark_scan::state::keyboard;
//!
//! let cleanup = keyboard::on_capture(|event| {
//!     if event.key == "Enter" {
//!         event.prevent_default();
//!     }
//!     false // Keep propagating
//! });
//!
//! cleanup();
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use bitflags::bitflags;
use spark_signals::{signal, Signal};

use super::focus;

// =============================================================================
// TYPES
// =============================================================================

/// Keyboard modifier state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Create empty modifiers
    pub fn none() -> Self {
        Self::default()
    }

    /// Create modifiers with ctrl
    pub fn ctrl() -> Self {
        Self { ctrl: true, ..Self::default() }
    }

    /// Create modifiers with alt
    pub fn alt() -> Self {
        Self { alt: true, ..Self::default() }
    }

    /// Create modifiers with shift
    pub fn shift() -> Self {
        Self { shift: true, ..Self::default() }
    }

    /// Create modifiers with meta
    pub fn meta() -> Self {
        Self { meta: true, ..Self::default() }
    }

    /// True when a command modifier (ctrl, alt, meta) is held.
    /// Shift alone does not count; scanners send it for capitals.
    pub fn has_command(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// Key event state (press, repeat, release)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    Press,
    Repeat,
    Release,
}

bitflags! {
    /// Dispatch flags set by handlers while an event travels the chain.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventFlags: u8 {
        const DEFAULT_PREVENTED = 1 << 0;
        const PROPAGATION_STOPPED = 1 << 1;
    }
}

/// The character a key value types, if it is a single printable one.
pub fn printable(key: &str) -> Option<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => Some(c),
        _ => None,
    }
}

/// Keyboard event
#[derive(Clone, Debug, PartialEq)]
pub struct KeyboardEvent {
    /// The key that was pressed (e.g., "a", "Enter", "ArrowUp")
    pub key: String,
    /// Modifier keys state
    pub modifiers: Modifiers,
    /// Press/repeat/release state
    pub state: KeyState,
    /// Monotonic time the event was read
    pub timestamp: Instant,
    flags: Cell<EventFlags>,
}

impl KeyboardEvent {
    /// Create a simple key press event, stamped now
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_modifiers(key, Modifiers::default())
    }

    /// Create a key press with modifiers
    pub fn with_modifiers(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            state: KeyState::Press,
            timestamp: Instant::now(),
            flags: Cell::new(EventFlags::empty()),
        }
    }

    /// Replace the timestamp
    pub fn at(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Replace the press state
    pub fn with_state(mut self, state: KeyState) -> Self {
        self.state = state;
        self
    }

    /// Check if this is a press event
    pub fn is_press(&self) -> bool {
        self.state == KeyState::Press
    }

    /// The single character this key produces, if it is one.
    pub fn printable_char(&self) -> Option<char> {
        printable(&self.key)
    }

    /// Stop the focused element from applying its default action
    pub fn prevent_default(&self) {
        self.flags.set(self.flags.get() | EventFlags::DEFAULT_PREVENTED);
    }

    /// Stop later handlers from seeing this event
    pub fn stop_propagation(&self) {
        self.flags.set(self.flags.get() | EventFlags::PROPAGATION_STOPPED);
    }

    pub fn default_prevented(&self) -> bool {
        self.flags.get().contains(EventFlags::DEFAULT_PREVENTED)
    }

    pub fn propagation_stopped(&self) -> bool {
        self.flags.get().contains(EventFlags::PROPAGATION_STOPPED)
    }
}

/// Handler for keyboard events. Return true to consume the event.
pub type KeyHandler = Rc<dyn Fn(&KeyboardEvent) -> bool>;

/// Handler for specific key. Return true to consume the event.
pub type KeySpecificHandler = Rc<dyn Fn() -> bool>;

// =============================================================================
// STATE
// =============================================================================

thread_local! {
    static LAST_EVENT: Signal<Option<KeyboardEvent>> = signal(None);
}

/// Get the last keyboard event
pub fn last_event() -> Option<KeyboardEvent> {
    LAST_EVENT.with(|s| s.get())
}

/// Get the last key pressed
pub fn last_key() -> String {
    last_event().map(|e| e.key).unwrap_or_default()
}

// =============================================================================
// HANDLER REGISTRY
// =============================================================================

struct HandlerRegistry {
    capture_handlers: Vec<(usize, KeyHandler)>,
    global_handlers: Vec<(usize, KeyHandler)>,
    key_handlers: HashMap<String, Vec<(usize, KeySpecificHandler)>>,
    focused_handlers: HashMap<usize, Vec<(usize, KeyHandler)>>,
    next_id: usize,
}

impl HandlerRegistry {
    fn new() -> Self {
        Self {
            capture_handlers: Vec::new(),
            global_handlers: Vec::new(),
            key_handlers: HashMap::new(),
            focused_handlers: HashMap::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

thread_local! {
    static REGISTRY: RefCell<HandlerRegistry> = RefCell::new(HandlerRegistry::new());
}

// =============================================================================
// EVENT DISPATCH
// =============================================================================

/// Dispatch a keyboard event through capture, focused, key-specific and
/// global handlers, in that order.
/// Returns true if propagation was stopped.
///
/// Handler lists are snapshotted before calling out, so handlers may
/// subscribe or unsubscribe while an event is in flight.
pub fn dispatch(event: &KeyboardEvent) -> bool {
    // Always update reactive state
    LAST_EVENT.with(|s| s.set(Some(event.clone())));

    // Only dispatch press events to handlers
    if !event.is_press() {
        return false;
    }

    if dispatch_capture(event) {
        return true;
    }

    if let Some(index) = focus::get_focused_index() {
        if dispatch_focused(index, event) {
            return true;
        }
    }

    dispatch_to_handlers(event)
}

fn run(handlers: Vec<KeyHandler>, event: &KeyboardEvent) -> bool {
    for handler in handlers {
        if handler(event) || event.propagation_stopped() {
            event.stop_propagation();
            return true;
        }
    }
    false
}

/// Dispatch to capture-phase handlers only.
pub fn dispatch_capture(event: &KeyboardEvent) -> bool {
    let handlers: Vec<KeyHandler> = REGISTRY.with(|reg| {
        reg.borrow()
            .capture_handlers
            .iter()
            .map(|(_, h)| h.clone())
            .collect()
    });
    run(handlers, event)
}

/// Dispatch to key-specific and global handlers only (not focused).
pub fn dispatch_to_handlers(event: &KeyboardEvent) -> bool {
    let (key_handlers, global_handlers) = REGISTRY.with(|reg| {
        let reg = reg.borrow();
        let keyed: Vec<KeySpecificHandler> = reg
            .key_handlers
            .get(&event.key)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        let global: Vec<KeyHandler> =
            reg.global_handlers.iter().map(|(_, h)| h.clone()).collect();
        (keyed, global)
    });

    for handler in key_handlers {
        if handler() || event.propagation_stopped() {
            event.stop_propagation();
            return true;
        }
    }

    run(global_handlers, event)
}

/// Dispatch to focused element handlers.
/// Returns true if consumed.
pub fn dispatch_focused(focused_index: usize, event: &KeyboardEvent) -> bool {
    if !event.is_press() {
        return false;
    }

    let handlers: Vec<KeyHandler> = REGISTRY.with(|reg| {
        reg.borrow()
            .focused_handlers
            .get(&focused_index)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    });
    run(handlers, event)
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Subscribe to all keyboard events in the capture phase.
/// Capture handlers run in registration order before any other handler.
/// Returns cleanup function.
pub fn on_capture<F>(handler: F) -> impl FnOnce()
where
    F: Fn(&KeyboardEvent) -> bool + 'static,
{
    let id = REGISTRY.with(|reg| {
        let mut reg = reg.borrow_mut();
        let id = reg.next_id();
        reg.capture_handlers.push((id, Rc::new(handler)));
        id
    });

    move || {
        REGISTRY.with(|reg| {
            let mut reg = reg.borrow_mut();
            reg.capture_handlers.retain(|(handler_id, _)| *handler_id != id);
        });
    }
}

/// Subscribe to all keyboard events.
/// Return true from handler to consume the event.
/// Returns cleanup function.
pub fn on<F>(handler: F) -> impl FnOnce()
where
    F: Fn(&KeyboardEvent) -> bool + 'static,
{
    let id = REGISTRY.with(|reg| {
        let mut reg = reg.borrow_mut();
        let id = reg.next_id();
        reg.global_handlers.push((id, Rc::new(handler)));
        id
    });

    move || {
        REGISTRY.with(|reg| {
            let mut reg = reg.borrow_mut();
            reg.global_handlers.retain(|(handler_id, _)| *handler_id != id);
        });
    }
}

/// Subscribe to specific key(s).
/// Handler receives no arguments - check last_event if needed.
/// Return true to consume the event.
/// Returns cleanup function.
pub fn on_key<F>(key: &str, handler: F) -> impl FnOnce()
where
    F: Fn() -> bool + 'static,
{
    let key = key.to_string();
    let id = REGISTRY.with(|reg| {
        let mut reg = reg.borrow_mut();
        let id = reg.next_id();
        reg.key_handlers
            .entry(key.clone())
            .or_default()
            .push((id, Rc::new(handler)));
        id
    });

    move || {
        REGISTRY.with(|reg| {
            let mut reg = reg.borrow_mut();
            if let Some(handlers) = reg.key_handlers.get_mut(&key) {
                handlers.retain(|(handler_id, _)| *handler_id != id);
                if handlers.is_empty() {
                    reg.key_handlers.remove(&key);
                }
            }
        });
    }
}

/// Subscribe to events when a specific element has focus.
/// Return true from handler to consume the event.
/// Returns cleanup function.
pub fn on_focused<F>(index: usize, handler: F) -> impl FnOnce()
where
    F: Fn(&KeyboardEvent) -> bool + 'static,
{
    let id = REGISTRY.with(|reg| {
        let mut reg = reg.borrow_mut();
        let id = reg.next_id();
        reg.focused_handlers
            .entry(index)
            .or_default()
            .push((id, Rc::new(handler)));
        id
    });

    move || {
        REGISTRY.with(|reg| {
            let mut reg = reg.borrow_mut();
            if let Some(handlers) = reg.focused_handlers.get_mut(&index) {
                handlers.retain(|(handler_id, _)| *handler_id != id);
                if handlers.is_empty() {
                    reg.focused_handlers.remove(&index);
                }
            }
        });
    }
}

/// Number of capture handlers currently registered.
pub fn capture_handler_count() -> usize {
    REGISTRY.with(|reg| reg.borrow().capture_handlers.len())
}

/// Clean up all handlers for an element index.
/// Called when an element is released.
pub fn cleanup_index(index: usize) {
    REGISTRY.with(|reg| {
        reg.borrow_mut().focused_handlers.remove(&index);
    });
}

/// Clear all state and handlers.
pub fn cleanup() {
    REGISTRY.with(|reg| {
        let mut reg = reg.borrow_mut();
        reg.capture_handlers.clear();
        reg.global_handlers.clear();
        reg.key_handlers.clear();
        reg.focused_handlers.clear();
    });
    LAST_EVENT.with(|s| s.set(None));
}

/// Reset keyboard state (for testing)
pub fn reset_keyboard_state() {
    cleanup();
    REGISTRY.with(|reg| {
        reg.borrow_mut().next_id = 0;
    });
}

// =============================================================================
// TESTS
// =============================================================================
