//! hsm-runtime: hierarchical state machines with per-machine timers
//!
//! States form a tree. An event is offered to the innermost active state
//! and bubbles to its ancestors until one consumes it. A transition exits
//! every state up to the lowest common ancestor of source and target, then
//! enters every state down to the target, delivering `EXIT` and `ENTRY` to
//! each handler on the way.
//!
//! # Core Concepts
//!
//! - **StateTree**: Arena of named states with parent links, shareable between machines
//! - **Hsm**: One running machine with its current state, history and user context
//! - **Timers**: A fixed pool per machine, armed through a pluggable [`TimerPlatform`]
//!
//! Every running timer is stopped when its machine transitions, so a state
//! never receives a timeout armed by a state it has left.
//!
//! # Example
//!
//! ```rust
//! use hsm_runtime::core::{Event, Reply, StateTree};
//! use hsm_runtime::machine::Hsm;
//! use hsm_runtime::timer::{TickTimers, TimerMode};
//!
//! const PRESS: Event = Event::user(0);
//! const SETTLED: Event = Event::user(1);
//!
//! let mut tree: StateTree<(), TickTimers> = StateTree::new();
//! let active = tree.add_state("Active", None, |_, e, _| Reply::bubble(e)).unwrap();
//! let debouncing = tree
//!     .add_state("Debouncing", None, move |hsm, e, _| {
//!         if e == Event::ENTRY {
//!             if let Ok(id) = hsm.timer_create(SETTLED, 50, TimerMode::OneShot) {
//!                 hsm.timer_start(id).ok();
//!             }
//!         } else if e == SETTLED {
//!             hsm.transition(active).ok();
//!         } else {
//!             return Reply::bubble(e);
//!         }
//!         Reply::Handled
//!     })
//!     .unwrap();
//! let idle = tree
//!     .add_state("Idle", None, move |hsm, e, _| {
//!         if e == PRESS {
//!             hsm.transition(debouncing).ok();
//!             return Reply::Handled;
//!         }
//!         Reply::bubble(e)
//!     })
//!     .unwrap();
//!
//! let mut hsm = Hsm::init("button", tree, idle, Some(TickTimers::new(4))).unwrap();
//! hsm.dispatch(PRESS, None).unwrap();
//! assert_eq!(hsm.current_state_name(), "Debouncing");
//!
//! hsm.advance_ms(50).unwrap();
//! assert_eq!(hsm.current_state_name(), "Active");
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod error;
pub mod machine;
pub mod snapshot;
pub mod timer;

// Re-export commonly used types
pub use builder::{BuildError, HsmBuilder};
pub use config::HsmConfig;
pub use crate::core::{payload_as, Event, Payload, Reply, StateId, StateTree};
pub use error::HsmError;
pub use machine::{Delivery, Hsm};
pub use timer::{TickTimers, TimerId, TimerMode, TimerPlatform, TimerState, TimerTicket};
