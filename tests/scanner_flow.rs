//! End-to-end: crossterm key events routed through dispatch, the scanner
//! listener and the focused input's default action.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

use spark_scan::scanner::{last_scan, listen, ScannerOptions, Silent};
use spark_scan::state::input::{convert_key_event_at, route_event, InputEvent};
use spark_scan::state::{focus, keyboard, ElementKind};

fn press(code: KeyCode, at: Instant) -> InputEvent {
    let raw = KeyEvent {
        code,
        modifiers: KeyModifiers::empty(),
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    };
    InputEvent::Key(convert_key_event_at(raw, at))
}

fn type_text(text: &str, start: Instant, step: Duration) -> Instant {
    let mut at = start;
    for (i, c) in text.chars().enumerate() {
        if i > 0 {
            at += step;
        }
        route_event(press(KeyCode::Char(c), at));
    }
    at
}

type Log = Rc<RefCell<Vec<String>>>;

fn setup() -> (usize, Log, Log, Box<dyn FnOnce()>) {
    keyboard::reset_keyboard_state();
    focus::reset_focus_state();

    let field = focus::register_element(ElementKind::TextInput, None);
    focus::focus(field);

    // Stands in for a form submitting its search box on Enter
    let submitted = Rc::new(RefCell::new(Vec::new()));
    let sink = submitted.clone();
    let unsubscribe = keyboard::on_key("Enter", move || {
        sink.borrow_mut().push(focus::get_value(field));
        true
    });

    (field, Rc::new(RefCell::new(Vec::new())), submitted, Box::new(unsubscribe))
}

#[test]
fn scanner_burst_is_captured_and_does_not_submit() {
    let (field, scans, submitted, unsubscribe) = setup();
    let sink = scans.clone();
    let handle = listen(
        ScannerOptions::default(),
        move |code| sink.borrow_mut().push(code.to_string()),
        Silent,
    )
    .unwrap();

    let t0 = Instant::now();
    let last = type_text("4006381333931", t0, Duration::from_millis(8));
    assert_eq!(focus::get_value(field), "4006381333931");

    route_event(press(KeyCode::Enter, last + Duration::from_millis(8)));

    assert_eq!(*scans.borrow(), vec!["4006381333931"]);
    assert_eq!(last_scan().as_deref(), Some("4006381333931"));
    assert!(submitted.borrow().is_empty());
    assert_eq!(focus::get_value(field), "");

    handle.stop();
    unsubscribe();
}

#[test]
fn human_typing_submits_normally() {
    let (field, scans, submitted, unsubscribe) = setup();
    let sink = scans.clone();
    let handle = listen(
        ScannerOptions::default(),
        move |code| sink.borrow_mut().push(code.to_string()),
        Silent,
    )
    .unwrap();

    let t0 = Instant::now();
    let last = type_text("bolts", t0, Duration::from_millis(180));
    route_event(press(KeyCode::Enter, last + Duration::from_millis(220)));

    assert!(scans.borrow().is_empty());
    assert_eq!(*submitted.borrow(), vec!["bolts"]);
    assert_eq!(focus::get_value(field), "bolts");

    handle.stop();
    unsubscribe();
}

#[test]
fn scan_inside_modal_is_left_to_the_modal() {
    keyboard::reset_keyboard_state();
    focus::reset_focus_state();

    let dialog = focus::register_element(ElementKind::Modal, None);
    let camera_field = focus::register_element(ElementKind::TextInput, Some(dialog));
    focus::focus(camera_field);

    let scans = Rc::new(RefCell::new(Vec::<String>::new()));
    let sink = scans.clone();
    let _handle = listen(
        ScannerOptions::default(),
        move |code| sink.borrow_mut().push(code.to_string()),
        Silent,
    )
    .unwrap();

    let t0 = Instant::now();
    let last = type_text("ABC123", t0, Duration::from_millis(5));
    route_event(press(KeyCode::Enter, last + Duration::from_millis(5)));

    assert!(scans.borrow().is_empty());
    assert_eq!(focus::get_value(camera_field), "ABC123");
}

#[test]
fn scanner_with_tab_suffix() {
    let (field, scans, submitted, unsubscribe) = setup();
    let sink = scans.clone();
    let options = ScannerOptions::default().with_terminators(["Tab"]);
    let handle = listen(options, move |code| sink.borrow_mut().push(code.to_string()), Silent)
        .unwrap();

    let t0 = Instant::now();
    let last = type_text("SKU-778", t0, Duration::from_millis(4));
    route_event(press(KeyCode::Tab, last + Duration::from_millis(4)));

    assert_eq!(*scans.borrow(), vec!["SKU-778"]);
    assert_eq!(focus::get_value(field), "");

    handle.stop();
    unsubscribe();
    assert_eq!(keyboard::capture_handler_count(), 0);

    // With everything detached, Enter reaches no one
    route_event(press(KeyCode::Enter, Instant::now()));
    assert!(submitted.borrow().is_empty());
}
