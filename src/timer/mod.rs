//! Per-machine software timers.
//!
//! Each machine owns a fixed pool of timer slots. A slot is bound to an
//! event and a period; starting it asks the [`TimerPlatform`] to arm a
//! platform timer that later hands a [`TimerTicket`] back to
//! [`Hsm::timer_callback`](crate::machine::Hsm::timer_callback), which
//! dispatches the bound event.
//!
//! Slot lifecycle: `Idle -> Stopped` on create, `Stopped <-> Running` on
//! start/stop, back to `Idle` on delete.

mod platform;
mod pool;
mod tick;

pub use platform::{NoTimers, PlatformError, TimerPlatform};
pub use pool::TimerPool;
pub use tick::{TickHandle, TickTimers};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether a timer fires once or repeatedly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerMode {
    OneShot,
    Periodic,
}

/// Observable state of a timer slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    /// Free for allocation.
    Idle,
    /// Allocated but not armed on the platform.
    Stopped,
    /// Armed; the platform holds a live handle.
    Running,
}

/// Reference to an allocated timer slot.
///
/// Carries the slot's allocation generation, so a reference kept past
/// `timer_delete` is rejected even after the slot has been reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId {
    slot: u8,
    generation: u32,
}

impl TimerId {
    pub(crate) fn new(slot: usize, generation: u32) -> Self {
        // Pool capacity is bounded by `TIMER_POOL_LIMIT`, which fits in a u8.
        Self {
            slot: slot as u8,
            generation,
        }
    }

    /// Index of the slot in the machine's pool.
    pub fn slot(&self) -> usize {
        usize::from(self.slot)
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

/// Token handed to the platform when a timer is armed.
///
/// The platform returns it through
/// [`Hsm::timer_callback`](crate::machine::Hsm::timer_callback) on expiry.
/// Tickets from an earlier arming, or of a timer that has since been
/// stopped or deleted, are ignored there. Platforms running their expiry
/// in another context (ISR, timer task) may check [`TimerTicket::is_live`]
/// before posting the ticket to the driving task.
#[derive(Clone, Debug)]
pub struct TimerTicket {
    timer: TimerId,
    run: u32,
    live: Arc<AtomicBool>,
}

impl TimerTicket {
    pub(crate) fn new(timer: TimerId, run: u32) -> Self {
        Self {
            timer,
            run,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The timer this ticket belongs to.
    pub fn timer(&self) -> TimerId {
        self.timer
    }

    pub(crate) fn run(&self) -> u32 {
        self.run
    }

    /// False once the arming this ticket belongs to has been stopped,
    /// deleted, or has fired as a one-shot. Safe to call from any thread.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub(crate) fn revoke(&self) {
        self.live.store(false, Ordering::Release);
    }
}
