//! Tick-driven software timer table.
//!
//! Models the common embedded backend where a hardware timer interrupt
//! advances a millisecond counter and counts down a fixed table of
//! software timers. Expired tickets are collected rather than invoked,
//! so the driving task can feed them to the machine in order.

use super::{PlatformError, TimerPlatform, TimerTicket};

struct TickEntry {
    ticket: TimerTicket,
    period_ms: u32,
    remaining_ms: u32,
    repeat: bool,
}

/// Handle of a timer armed in a [`TickTimers`] table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickHandle {
    index: usize,
    generation: u32,
}

/// Fixed-capacity software timers advanced by [`TickTimers::advance`].
///
/// # Example
///
/// ```rust
/// use hsm_runtime::timer::{TickTimers, TimerPlatform};
///
/// let mut ticks = TickTimers::new(4);
/// assert_eq!(ticks.now_ms(), 0);
/// assert!(ticks.advance(25).is_empty());
/// assert_eq!(ticks.now_ms(), 25);
/// ```
pub struct TickTimers {
    entries: Vec<Option<TickEntry>>,
    generations: Vec<u32>,
    now_ms: u32,
}

impl TickTimers {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: (0..capacity).map(|_| None).collect(),
            generations: vec![0; capacity],
            now_ms: 0,
        }
    }

    /// Number of armed timers.
    pub fn armed(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    /// Advance the clock by one millisecond.
    pub fn tick(&mut self) -> Vec<TimerTicket> {
        let mut expired = Vec::new();
        self.step(&mut expired);
        expired
    }

    /// Advance the clock by one millisecond, appending expired tickets to
    /// `expired`. A driver that reuses one buffer does not allocate per tick.
    pub fn tick_into(&mut self, expired: &mut Vec<TimerTicket>) {
        self.step(expired);
    }

    /// Advance the clock by `ms` milliseconds, returning every ticket that
    /// expired on the way, in expiry order.
    pub fn advance(&mut self, ms: u32) -> Vec<TimerTicket> {
        let mut expired = Vec::new();
        for _ in 0..ms {
            self.step(&mut expired);
        }
        expired
    }

    fn step(&mut self, expired: &mut Vec<TimerTicket>) {
        self.now_ms = self.now_ms.wrapping_add(1);

        for entry in self.entries.iter_mut() {
            let Some(timer) = entry else {
                continue;
            };
            timer.remaining_ms -= 1;
            if timer.remaining_ms > 0 {
                continue;
            }

            if timer.ticket.is_live() {
                expired.push(timer.ticket.clone());
            }
            if timer.repeat {
                timer.remaining_ms = timer.period_ms;
            } else {
                *entry = None;
            }
        }
    }
}

impl TimerPlatform for TickTimers {
    type Handle = TickHandle;

    fn start(
        &mut self,
        ticket: TimerTicket,
        period_ms: u32,
        repeat: bool,
    ) -> Result<TickHandle, PlatformError> {
        if period_ms == 0 {
            return Err(PlatformError::Rejected("zero period".to_string()));
        }
        let index = self
            .entries
            .iter()
            .position(Option::is_none)
            .ok_or(PlatformError::Exhausted)?;

        self.generations[index] = self.generations[index].wrapping_add(1);
        self.entries[index] = Some(TickEntry {
            ticket,
            period_ms,
            remaining_ms: period_ms,
            repeat,
        });
        Ok(TickHandle {
            index,
            generation: self.generations[index],
        })
    }

    fn stop(&mut self, handle: TickHandle) {
        if self.generations.get(handle.index) == Some(&handle.generation) {
            self.entries[handle.index] = None;
        }
    }

    fn now_ms(&self) -> u32 {
        self.now_ms
    }
}
