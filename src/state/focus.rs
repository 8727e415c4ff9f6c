//! Focus System - Focused element and its context
//!
//! Keeps a small element tree so keyboard consumers can ask what kind of
//! thing currently has focus:
//! - `focused_index` signal (currently focused element)
//! - Element kinds (text input, content-editable region, modal surface)
//! - Parent links, so "is this inside a modal?" walks ancestors
//! - Text values for inputs, plus the default action that types into them
//!
//! # Example
//!
//! ```ignore
//! use spark_scan::state::focus::{self, ElementKind};
//!
//! let dialog = focus::register_element(ElementKind::Modal, None);
//! let field = focus::register_element(ElementKind::TextInput, Some(dialog));
//! focus::focus(field);
//!
//! assert!(focus::is_inside_modal(field));
//! ```

use std::cell::RefCell;

use spark_signals::{signal, Signal};

use super::keyboard::{self, KeyboardEvent};

// =============================================================================
// ELEMENTS
// =============================================================================

/// What an element is, as far as keyboard consumers care.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// Plain layout node
    Container,
    /// Single-line text field
    TextInput,
    /// Free-form editable region
    ContentEditable,
    /// Dialog surface that owns input while open
    Modal,
}

impl ElementKind {
    fn is_editable(self) -> bool {
        matches!(self, Self::TextInput | Self::ContentEditable)
    }
}

struct Element {
    kind: ElementKind,
    parent: Option<usize>,
    value: Signal<String>,
}

thread_local! {
    static ELEMENTS: RefCell<Vec<Option<Element>>> = RefCell::new(Vec::new());
    static FOCUSED_INDEX: Signal<Option<usize>> = signal(None);
}

/// Register an element and return its index.
/// Released slots are reused.
pub fn register_element(kind: ElementKind, parent: Option<usize>) -> usize {
    ELEMENTS.with(|elements| {
        let mut elements = elements.borrow_mut();
        let element = Element {
            kind,
            parent,
            value: signal(String::new()),
        };
        match elements.iter().position(Option::is_none) {
            Some(free) => {
                elements[free] = Some(element);
                free
            }
            None => {
                elements.push(Some(element));
                elements.len() - 1
            }
        }
    })
}

/// Release an element. Blurs it first if it has focus.
pub fn release_element(index: usize) {
    if get_focused_index() == Some(index) {
        blur();
    }
    ELEMENTS.with(|elements| {
        if let Some(slot) = elements.borrow_mut().get_mut(index) {
            *slot = None;
        }
    });
    keyboard::cleanup_index(index);
}

fn with_element<R>(index: usize, f: impl FnOnce(&Element) -> R) -> Option<R> {
    ELEMENTS.with(|elements| elements.borrow().get(index).and_then(Option::as_ref).map(f))
}

/// Kind of a registered element
pub fn element_kind(index: usize) -> Option<ElementKind> {
    with_element(index, |e| e.kind)
}

/// Check if an element is registered
pub fn is_registered(index: usize) -> bool {
    element_kind(index).is_some()
}

// =============================================================================
// FOCUSED INDEX
// =============================================================================

/// Get the currently focused element index
pub fn get_focused_index() -> Option<usize> {
    FOCUSED_INDEX.with(|s| s.get())
}

/// Check if any element is focused
pub fn has_focus() -> bool {
    get_focused_index().is_some()
}

/// Check if specific element is focused
pub fn is_focused(index: usize) -> bool {
    get_focused_index() == Some(index)
}

/// Focus a specific element by index
pub fn focus(index: usize) -> bool {
    if !is_registered(index) {
        return false;
    }
    if get_focused_index() != Some(index) {
        FOCUSED_INDEX.with(|s| s.set(Some(index)));
    }
    true
}

/// Clear focus (no element focused)
pub fn blur() {
    if has_focus() {
        FOCUSED_INDEX.with(|s| s.set(None));
    }
}

// =============================================================================
// CONTEXT QUERIES
// =============================================================================

/// Element is a plain text input
pub fn is_text_input(index: usize) -> bool {
    element_kind(index) == Some(ElementKind::TextInput)
}

/// Element is a content-editable region
pub fn is_content_editable(index: usize) -> bool {
    element_kind(index) == Some(ElementKind::ContentEditable)
}

/// Element is a modal, or sits somewhere beneath one
pub fn is_inside_modal(index: usize) -> bool {
    let mut current = Some(index);
    // Bounded walk; a malformed parent cycle can't spin forever
    let mut hops = ELEMENTS.with(|elements| elements.borrow().len());
    while let Some(i) = current {
        match with_element(i, |e| (e.kind, e.parent)) {
            Some((ElementKind::Modal, _)) => return true,
            Some((_, parent)) => current = parent,
            None => return false,
        }
        if hops == 0 {
            return false;
        }
        hops -= 1;
    }
    false
}

/// Focused element is inside a modal
pub fn focus_in_modal() -> bool {
    get_focused_index().is_some_and(is_inside_modal)
}

// =============================================================================
// VALUES
// =============================================================================

/// Current text value of an element (empty for non-editables)
pub fn get_value(index: usize) -> String {
    with_element(index, |e| e.value.get()).unwrap_or_default()
}

/// Set the text value of an editable element
pub fn set_value(index: usize, value: impl Into<String>) {
    let value = value.into();
    with_element(index, |e| {
        if e.kind.is_editable() {
            e.value.set(value);
        }
    });
}

/// Clear the text value of an element
pub fn clear_value(index: usize) {
    with_element(index, |e| {
        if !e.value.get().is_empty() {
            e.value.set(String::new());
        }
    });
}

/// Apply what the focused element does with a key nobody prevented:
/// editables insert printable characters and delete on Backspace.
/// Returns true if the element changed.
pub fn apply_default_action(event: &KeyboardEvent) -> bool {
    if event.default_prevented() || !event.is_press() || event.modifiers.has_command() {
        return false;
    }
    let Some(index) = get_focused_index() else {
        return false;
    };
    if !element_kind(index).is_some_and(ElementKind::is_editable) {
        return false;
    }

    let mut value = get_value(index);
    if let Some(c) = event.printable_char() {
        value.push(c);
    } else if event.key == "Backspace" {
        if value.pop().is_none() {
            return false;
        }
    } else {
        return false;
    }
    set_value(index, value);
    true
}

// =============================================================================
// RESET (for testing)
// =============================================================================

/// Reset all focus state (for testing)
pub fn reset_focus_state() {
    FOCUSED_INDEX.with(|s| s.set(None));
    ELEMENTS.with(|elements| elements.borrow_mut().clear());
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::keyboard::Modifiers;

    fn setup() {
        reset_focus_state();
    }

    #[test]
    fn test_initial_state() {
        setup();
        assert_eq!(get_focused_index(), None);
        assert!(!has_focus());
    }

    #[test]
    fn test_focus_and_blur() {
        setup();
        let field = register_element(ElementKind::TextInput, None);

        assert!(focus(field));
        assert!(is_focused(field));

        blur();
        assert!(!has_focus());
    }

    #[test]
    fn test_focus_unregistered() {
        setup();
        assert!(!focus(42));
        assert!(!has_focus());
    }

    #[test]
    fn test_release_blurs_and_reuses_slot() {
        setup();
        let a = register_element(ElementKind::TextInput, None);
        let _b = register_element(ElementKind::Container, None);
        focus(a);

        release_element(a);
        assert!(!has_focus());
        assert!(!is_registered(a));

        let c = register_element(ElementKind::ContentEditable, None);
        assert_eq!(c, a);
        assert!(is_content_editable(c));
    }

    #[test]
    fn test_modal_ancestry() {
        setup();
        let root = register_element(ElementKind::Container, None);
        let dialog = register_element(ElementKind::Modal, Some(root));
        let body = register_element(ElementKind::Container, Some(dialog));
        let field = register_element(ElementKind::TextInput, Some(body));
        let outside = register_element(ElementKind::TextInput, Some(root));

        assert!(is_inside_modal(dialog));
        assert!(is_inside_modal(field));
        assert!(!is_inside_modal(outside));
        assert!(!is_inside_modal(root));

        focus(field);
        assert!(focus_in_modal());
        focus(outside);
        assert!(!focus_in_modal());
    }

    #[test]
    fn test_default_action_types_into_input() {
        setup();
        let field = register_element(ElementKind::TextInput, None);
        focus(field);

        assert!(apply_default_action(&KeyboardEvent::new("h")));
        assert!(apply_default_action(&KeyboardEvent::new("i")));
        assert_eq!(get_value(field), "hi");

        assert!(apply_default_action(&KeyboardEvent::new("Backspace")));
        assert_eq!(get_value(field), "h");

        assert!(!apply_default_action(&KeyboardEvent::new("Enter")));
        assert!(!apply_default_action(&KeyboardEvent::with_modifiers("c", Modifiers::ctrl())));
        assert_eq!(get_value(field), "h");
    }

    #[test]
    fn test_default_action_respects_prevent_default() {
        setup();
        let field = register_element(ElementKind::TextInput, None);
        focus(field);

        let event = KeyboardEvent::new("x");
        event.prevent_default();
        assert!(!apply_default_action(&event));
        assert_eq!(get_value(field), "");
    }

    #[test]
    fn test_container_has_no_value() {
        setup();
        let panel = register_element(ElementKind::Container, None);
        focus(panel);

        assert!(!apply_default_action(&KeyboardEvent::new("x")));
        set_value(panel, "ignored");
        assert_eq!(get_value(panel), "");
    }

    #[test]
    fn test_clear_value() {
        setup();
        let field = register_element(ElementKind::TextInput, None);
        set_value(field, "A123");
        clear_value(field);
        assert_eq!(get_value(field), "");
    }
}
