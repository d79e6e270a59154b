//! The running machine.
//!
//! [`Hsm`] binds a shared [`StateTree`](crate::core::StateTree) to its
//! own current state, timer pool and platform. Dispatch and query live in
//! `hsm`, the transition engine in `transition`, timer operations in
//! `timers`.

mod hsm;
mod timers;
mod transition;

pub use hsm::{Delivery, Hsm, Phase};
