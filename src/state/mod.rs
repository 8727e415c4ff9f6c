//! State Module - Runtime input state
//!
//! - **Keyboard** - Event types, capture/bubble dispatch, handler registry
//! - **Focus** - Focused element, element kinds, modal ancestry, input values
//! - **Input** - crossterm event conversion, polling and routing

pub mod focus;
pub mod input;
pub mod keyboard;

pub use focus::{
    apply_default_action, blur, clear_value, element_kind, focus, focus_in_modal,
    get_focused_index, get_value, has_focus, is_content_editable, is_focused, is_inside_modal,
    is_text_input, register_element, release_element, reset_focus_state, set_value,
    ElementKind,
};
pub use input::{convert_key_event, poll_event, read_event, route_event, InputEvent};
pub use keyboard::{
    capture_handler_count, dispatch, last_event, last_key, on, on_capture, on_focused, on_key,
    printable, reset_keyboard_state, EventFlags, KeyHandler, KeyState, KeyboardEvent, Modifiers,
};
