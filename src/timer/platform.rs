//! The platform timer interface consumed by the engine.

use super::TimerTicket;
use std::convert::Infallible;
use thiserror::Error;

/// Why a platform could not arm a timer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("no platform timer interface configured")]
    Unavailable,

    #[error("platform timer resources exhausted")]
    Exhausted,

    #[error("platform rejected the timer: {0}")]
    Rejected(String),
}

/// Timer backend supplied by the embedding system.
///
/// Implementations wrap an RTOS software timer, a tick counter driven by
/// a hardware timer interrupt, or a test double. The engine never assumes
/// a particular backend.
///
/// When the timer expires the platform must deliver the ticket to
/// [`Hsm::timer_callback`](crate::machine::Hsm::timer_callback) on the
/// same serial context that drives `dispatch`, typically by posting it
/// to the driving task's queue.
pub trait TimerPlatform {
    /// Platform-owned handle of an armed timer.
    type Handle;

    /// Arm a timer that expires after `period_ms`, repeatedly if `repeat`.
    fn start(
        &mut self,
        ticket: TimerTicket,
        period_ms: u32,
        repeat: bool,
    ) -> Result<Self::Handle, PlatformError>;

    /// Disarm a timer.
    ///
    /// `handle` may belong to a one-shot that has already expired while
    /// its ticket is still queued, for example when the timer is restarted
    /// or a transition runs before the ticket is delivered. Stopping such a
    /// handle must be a no-op and must not disturb a timer armed since.
    fn stop(&mut self, handle: Self::Handle);

    /// Monotonic milliseconds, wrapping at `u32::MAX`.
    fn now_ms(&self) -> u32;
}

/// Platform type for machines that use no timers.
///
/// It has no values; a machine typed with it always holds `None` for its
/// platform and every `timer_start` reports [`PlatformError::Unavailable`].
#[derive(Debug)]
pub enum NoTimers {}

impl TimerPlatform for NoTimers {
    type Handle = Infallible;

    fn start(&mut self, _: TimerTicket, _: u32, _: bool) -> Result<Infallible, PlatformError> {
        match *self {}
    }

    fn stop(&mut self, handle: Infallible) {
        match handle {}
    }

    fn now_ms(&self) -> u32 {
        match *self {}
    }
}
