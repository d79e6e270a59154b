//! Fixed-capacity timer slot pool.
//!
//! The pool only does bookkeeping; talking to the platform is left to
//! the machine, which owns both.

use super::{TimerId, TimerMode, TimerState, TimerTicket};
use crate::core::Event;
use crate::error::HsmError;

enum Status<H> {
    Idle,
    Stopped,
    Running { handle: H, ticket: TimerTicket },
}

pub(crate) struct TimerSlot<H> {
    status: Status<H>,
    pub(crate) event: Event,
    pub(crate) period_ms: u32,
    pub(crate) mode: TimerMode,
    generation: u32,
    runs: u32,
}

impl<H> TimerSlot<H> {
    fn idle() -> Self {
        Self {
            status: Status::Idle,
            event: Event::NONE,
            period_ms: 0,
            mode: TimerMode::OneShot,
            generation: 0,
            runs: 0,
        }
    }

    pub(crate) fn state(&self) -> TimerState {
        match self.status {
            Status::Idle => TimerState::Idle,
            Status::Stopped => TimerState::Stopped,
            Status::Running { .. } => TimerState::Running,
        }
    }

    /// Ticket for the next arming of this slot.
    pub(crate) fn next_ticket(&mut self, id: TimerId) -> TimerTicket {
        self.runs = self.runs.wrapping_add(1);
        TimerTicket::new(id, self.runs)
    }

    pub(crate) fn arm(&mut self, handle: H, ticket: TimerTicket) {
        self.status = Status::Running { handle, ticket };
    }

    /// Leave `Running`, handing back the platform handle to stop.
    pub(crate) fn disarm(&mut self) -> Option<H> {
        match std::mem::replace(&mut self.status, Status::Stopped) {
            Status::Running { handle, ticket } => {
                ticket.revoke();
                Some(handle)
            }
            Status::Idle => {
                self.status = Status::Idle;
                None
            }
            Status::Stopped => None,
        }
    }

    /// A one-shot fired: the platform already disarmed it, so the handle
    /// is dropped instead of stopped.
    pub(crate) fn expire(&mut self) {
        drop(self.disarm());
    }

    pub(crate) fn accepts(&self, ticket: &TimerTicket) -> bool {
        match &self.status {
            Status::Running { ticket: armed, .. } => {
                armed.run() == ticket.run() && self.generation == ticket.timer().generation()
            }
            _ => false,
        }
    }
}

/// The fixed array of timer slots owned by one machine.
pub struct TimerPool<H> {
    slots: Vec<TimerSlot<H>>,
}

impl<H> TimerPool<H> {
    /// Pool with `capacity` idle slots. Allocated once; never grows.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| TimerSlot::idle()).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots that are not idle.
    pub fn in_use(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state() != TimerState::Idle)
            .count()
    }

    /// Claim the first idle slot and bind it, leaving it `Stopped`.
    pub(crate) fn allocate(
        &mut self,
        event: Event,
        period_ms: u32,
        mode: TimerMode,
    ) -> Result<TimerId, HsmError> {
        let capacity = self.capacity();
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.state() == TimerState::Idle)
            .ok_or(HsmError::NoFreeTimerSlot { capacity })?;

        slot.status = Status::Stopped;
        slot.event = event;
        slot.period_ms = period_ms;
        slot.mode = mode;
        Ok(TimerId::new(index, slot.generation))
    }

    /// Return a slot to `Idle`. The caller disarms it first.
    pub(crate) fn release(&mut self, id: TimerId) -> Result<(), HsmError> {
        let slot = self.get_mut(id)?;
        slot.status = Status::Idle;
        slot.event = Event::NONE;
        slot.generation = slot.generation.wrapping_add(1);
        Ok(())
    }

    /// The slot `id` refers to, if it is still allocated to that reference.
    pub(crate) fn get(&self, id: TimerId) -> Result<&TimerSlot<H>, HsmError> {
        match self.slots.get(id.slot()) {
            Some(slot) if slot.generation == id.generation() && slot.state() != TimerState::Idle => {
                Ok(slot)
            }
            _ => Err(HsmError::InvalidArgument("unknown or deleted timer")),
        }
    }

    pub(crate) fn get_mut(&mut self, id: TimerId) -> Result<&mut TimerSlot<H>, HsmError> {
        match self.slots.get_mut(id.slot()) {
            Some(slot) if slot.generation == id.generation() && slot.state() != TimerState::Idle => {
                Ok(slot)
            }
            _ => Err(HsmError::InvalidArgument("unknown or deleted timer")),
        }
    }

    /// Ids of every allocated slot.
    pub(crate) fn allocated(&self) -> Vec<TimerId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state() != TimerState::Idle)
            .map(|(index, slot)| TimerId::new(index, slot.generation))
            .collect()
    }

    /// Disarm every running slot, passing each handle to `stop`.
    ///
    /// Returns how many slots were running.
    pub(crate) fn disarm_all(&mut self, mut stop: impl FnMut(H)) -> usize {
        let mut disarmed = 0;
        for handle in self.slots.iter_mut().filter_map(TimerSlot::disarm) {
            stop(handle);
            disarmed += 1;
        }
        disarmed
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = &TimerSlot<H>> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_fills_first_idle_slot() {
        let mut pool: TimerPool<u32> = TimerPool::new(2);

        let a = pool.allocate(Event::user(0), 10, TimerMode::OneShot).unwrap();
        let b = pool.allocate(Event::user(1), 20, TimerMode::Periodic).unwrap();

        assert_eq!(a.slot(), 0);
        assert_eq!(b.slot(), 1);
        assert_eq!(pool.in_use(), 2);
        assert_eq!(pool.get(a).unwrap().state(), TimerState::Stopped);
    }

    #[test]
    fn exhausted_pool_reports_capacity() {
        let mut pool: TimerPool<u32> = TimerPool::new(1);
        pool.allocate(Event::user(0), 10, TimerMode::OneShot).unwrap();

        let result = pool.allocate(Event::user(1), 10, TimerMode::OneShot);

        assert_eq!(result, Err(HsmError::NoFreeTimerSlot { capacity: 1 }));
    }

    #[test]
    fn released_slot_is_reused_under_new_generation() {
        let mut pool: TimerPool<u32> = TimerPool::new(1);
        let first = pool.allocate(Event::user(0), 10, TimerMode::OneShot).unwrap();
        pool.release(first).unwrap();

        let second = pool.allocate(Event::user(1), 10, TimerMode::OneShot).unwrap();

        assert_eq!(first.slot(), second.slot());
        assert!(pool.get(first).is_err());
        assert!(pool.get(second).is_ok());
    }

    #[test]
    fn disarm_revokes_ticket_and_returns_handle() {
        let mut pool: TimerPool<u32> = TimerPool::new(1);
        let id = pool.allocate(Event::user(0), 10, TimerMode::Periodic).unwrap();
        let slot = pool.get_mut(id).unwrap();
        let ticket = slot.next_ticket(id);
        slot.arm(42, ticket.clone());
        assert!(slot.accepts(&ticket));

        let mut handles = Vec::new();
        assert_eq!(pool.disarm_all(|handle| handles.push(handle)), 1);
        assert_eq!(handles, [42]);
        assert!(!ticket.is_live());
        assert!(!pool.get(id).unwrap().accepts(&ticket));
        assert_eq!(pool.get(id).unwrap().state(), TimerState::Stopped);
    }

    #[test]
    fn older_ticket_is_rejected_after_rearm() {
        let mut pool: TimerPool<u32> = TimerPool::new(1);
        let id = pool.allocate(Event::user(0), 10, TimerMode::Periodic).unwrap();
        let slot = pool.get_mut(id).unwrap();
        let old = slot.next_ticket(id);
        slot.arm(1, old.clone());
        slot.disarm();
        let new = slot.next_ticket(id);
        slot.arm(2, new.clone());

        assert!(!slot.accepts(&old));
        assert!(slot.accepts(&new));
    }
}
