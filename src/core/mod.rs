//! Core state machine types.
//!
//! This module contains the data the engine runs on:
//! - Event identifiers and handler replies
//! - State nodes and the hierarchy arena with LCA computation
//! - The bounded transition log
//!
//! Nothing here mutates a machine; the [`machine`](crate::machine) module
//! drives these types.

mod event;
mod history;
mod state;
mod tree;

pub use event::{payload_as, Event, Payload, Reply};
pub use history::{TransitionLog, TransitionRecord};
pub use state::{Handler, StateId, StateNode, TransitionHook};
pub use tree::{StatePath, StateTree};
