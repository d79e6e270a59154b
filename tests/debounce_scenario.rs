//! Button debouncing on flat states driven by the tick timer table.
//!
//! `Idle` moves to `Debouncing` on a press. `Debouncing` arms a 50 ms
//! one-shot and ignores further presses; when it fires the machine
//! settles in `Active`.

use hsm_runtime::core::{Event, Reply, StateTree};
use hsm_runtime::hsm_events;
use hsm_runtime::machine::{Delivery, Hsm};
use hsm_runtime::timer::{TickTimers, TimerId, TimerMode};
use tracing_subscriber::EnvFilter;

hsm_events! {
    enum Button {
        Press,
        DebounceDone,
        Release,
    }
}

#[derive(Default)]
struct Debouncer {
    timer: Option<TimerId>,
    ignored_presses: usize,
}

type Machine = Hsm<Debouncer, TickTimers>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn button() -> Machine {
    init_tracing();

    let mut tree: StateTree<Debouncer, TickTimers> = StateTree::new();
    let idle_slot = std::sync::Arc::new(std::sync::OnceLock::new());

    let active = {
        let idle_slot = std::sync::Arc::clone(&idle_slot);
        tree.add_state("Active", None, move |hsm: &mut Machine, event, _| {
            match Button::try_from(event) {
                Ok(Button::Release) => {
                    if let Some(&idle) = idle_slot.get() {
                        hsm.transition(idle).unwrap();
                    }
                    Reply::Handled
                }
                _ => Reply::bubble(event),
            }
        })
        .unwrap()
    };

    let debouncing = tree
        .add_state("Debouncing", None, move |hsm: &mut Machine, event, _| {
            match event {
                Event::ENTRY => {
                    let id = hsm
                        .timer_create(Button::DebounceDone, 50, TimerMode::OneShot)
                        .unwrap();
                    hsm.timer_start(id).unwrap();
                    hsm.context_mut().timer = Some(id);
                    return Reply::Handled;
                }
                Event::EXIT => {
                    if let Some(id) = hsm.context_mut().timer.take() {
                        hsm.timer_delete(id).unwrap();
                    }
                    return Reply::Handled;
                }
                _ => {}
            }
            match Button::try_from(event) {
                Ok(Button::Press) => {
                    hsm.context_mut().ignored_presses += 1;
                    Reply::Handled
                }
                Ok(Button::DebounceDone) => {
                    hsm.transition(active).unwrap();
                    Reply::Handled
                }
                _ => Reply::bubble(event),
            }
        })
        .unwrap();

    let idle = tree
        .add_state("Idle", None, move |hsm: &mut Machine, event, _| {
            match Button::try_from(event) {
                Ok(Button::Press) => {
                    hsm.transition(debouncing).unwrap();
                    Reply::Handled
                }
                _ => Reply::bubble(event),
            }
        })
        .unwrap();
    let _ = idle_slot.set(idle);

    Hsm::init("button", tree, idle, Some(TickTimers::new(4))).unwrap()
}

#[test]
fn press_debounces_into_active() {
    let mut hsm = button();
    assert_eq!(hsm.current_state_name(), "Idle");

    hsm.dispatch(Button::Press, None).unwrap();
    assert_eq!(hsm.current_state_name(), "Debouncing");
    assert_eq!(hsm.timers().in_use(), 1);

    assert_eq!(hsm.advance_ms(49).unwrap(), 0);
    assert_eq!(hsm.current_state_name(), "Debouncing");

    assert_eq!(hsm.advance_ms(1).unwrap(), 1);
    assert_eq!(hsm.current_state_name(), "Active");
    assert_eq!(hsm.timers().in_use(), 0);
    assert_eq!(hsm.platform().map(|ticks| ticks.armed()), Some(0));
}

#[test]
fn presses_during_debounce_are_swallowed() {
    let mut hsm = button();
    hsm.dispatch(Button::Press, None).unwrap();
    let debouncing = hsm.current_state();

    hsm.advance_ms(20).unwrap();
    let delivery = hsm.dispatch(Button::Press, None).unwrap();

    assert_eq!(delivery, Delivery::Handled { by: debouncing });
    assert_eq!(hsm.current_state(), debouncing);
    assert_eq!(hsm.context().ignored_presses, 1);

    // The second press does not extend the debounce window.
    hsm.advance_ms(30).unwrap();
    assert_eq!(hsm.current_state_name(), "Active");
}

#[test]
fn release_returns_to_idle_and_press_rearms() {
    let mut hsm = button();
    hsm.dispatch(Button::Press, None).unwrap();
    hsm.advance_ms(50).unwrap();

    hsm.dispatch(Button::Release, None).unwrap();
    assert_eq!(hsm.current_state_name(), "Idle");

    hsm.dispatch(Button::Press, None).unwrap();
    hsm.advance_ms(50).unwrap();
    assert_eq!(hsm.current_state_name(), "Active");

    let names: Vec<&str> = hsm
        .transitions()
        .path()
        .into_iter()
        .map(|state| hsm.tree().name(state))
        .collect();
    assert_eq!(
        names,
        ["Idle", "Debouncing", "Active", "Idle", "Debouncing", "Active"]
    );
    assert_eq!(hsm.now_ms(), 100);
}

#[test]
fn unhandled_events_are_dropped_in_idle() {
    let mut hsm = button();

    assert_eq!(hsm.dispatch(Button::Release, None), Ok(Delivery::Dropped));
    assert_eq!(hsm.advance_ms(100).unwrap(), 0);
    assert_eq!(hsm.current_state_name(), "Idle");
}
