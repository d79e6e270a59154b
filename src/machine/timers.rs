//! Timer operations of a machine.
//!
//! Timers belong to the machine's pool, not to states. By convention a
//! state creates its timers in `ENTRY` and deletes them in `EXIT`; the
//! engine only force-stops running timers at the start of each
//! transition, so a state that forgets to delete leaks its slot.

use super::hsm::Hsm;
use crate::core::Event;
use crate::error::HsmError;
use crate::timer::{
    PlatformError, TickTimers, TimerId, TimerMode, TimerPlatform, TimerState, TimerTicket,
};
use tracing::{debug, trace, warn};

impl<C, P: TimerPlatform> Hsm<C, P> {
    /// Allocate a timer bound to `event`, leaving it stopped.
    pub fn timer_create(
        &mut self,
        event: impl Into<Event>,
        period_ms: u32,
        mode: TimerMode,
    ) -> Result<TimerId, HsmError> {
        let event = event.into();
        if period_ms == 0 {
            return Err(HsmError::InvalidArgument("timer period must be at least 1 ms"));
        }
        if event.is_engine_only() {
            return Err(HsmError::InvalidArgument(
                "timers cannot deliver NONE, ENTRY or EXIT",
            ));
        }

        let id = self.timers.allocate(event, period_ms, mode)?;
        debug!(
            machine = %self.name,
            slot = id.slot(),
            ?event,
            period_ms,
            ?mode,
            "timer created"
        );
        Ok(id)
    }

    /// Arm a timer on the platform, restarting it if it is already running.
    ///
    /// On platform failure the timer is left stopped.
    pub fn timer_start(&mut self, id: TimerId) -> Result<(), HsmError> {
        let slot = self.timers.get_mut(id)?;
        let Some(platform) = self.platform.as_mut() else {
            return Err(PlatformError::Unavailable.into());
        };

        if let Some(handle) = slot.disarm() {
            platform.stop(handle);
        }

        let ticket = slot.next_ticket(id);
        let repeat = slot.mode == TimerMode::Periodic;
        match platform.start(ticket.clone(), slot.period_ms, repeat) {
            Ok(handle) => {
                slot.arm(handle, ticket);
                trace!(machine = %self.name, slot = id.slot(), "timer started");
                Ok(())
            }
            Err(err) => {
                ticket.revoke();
                warn!(
                    machine = %self.name,
                    slot = id.slot(),
                    error = %err,
                    "platform refused to start timer"
                );
                Err(err.into())
            }
        }
    }

    /// Disarm a timer. Stopping a timer that is not running is a no-op.
    pub fn timer_stop(&mut self, id: TimerId) -> Result<(), HsmError> {
        let slot = self.timers.get_mut(id)?;
        if let Some(handle) = slot.disarm() {
            if let Some(platform) = self.platform.as_mut() {
                platform.stop(handle);
            }
            trace!(machine = %self.name, slot = id.slot(), "timer stopped");
        }
        Ok(())
    }

    /// Stop and start again with the full period.
    pub fn timer_restart(&mut self, id: TimerId) -> Result<(), HsmError> {
        self.timer_stop(id)?;
        self.timer_start(id)
    }

    /// Stop a timer and free its slot. `id` is invalid afterwards.
    pub fn timer_delete(&mut self, id: TimerId) -> Result<(), HsmError> {
        self.timer_stop(id)?;
        self.timers.release(id)?;
        debug!(machine = %self.name, slot = id.slot(), "timer deleted");
        Ok(())
    }

    /// Change the period; a running timer restarts with it.
    pub fn timer_set_period(&mut self, id: TimerId, period_ms: u32) -> Result<(), HsmError> {
        if period_ms == 0 {
            return Err(HsmError::InvalidArgument("timer period must be at least 1 ms"));
        }
        let slot = self.timers.get_mut(id)?;
        slot.period_ms = period_ms;
        if slot.state() == TimerState::Running {
            return self.timer_restart(id);
        }
        Ok(())
    }

    /// Change the event delivered on expiry.
    pub fn timer_set_event(&mut self, id: TimerId, event: impl Into<Event>) -> Result<(), HsmError> {
        let event = event.into();
        if event.is_engine_only() {
            return Err(HsmError::InvalidArgument(
                "timers cannot deliver NONE, ENTRY or EXIT",
            ));
        }
        self.timers.get_mut(id)?.event = event;
        Ok(())
    }

    pub fn timer_is_running(&self, id: TimerId) -> bool {
        self.timer_state(id) == TimerState::Running
    }

    /// State of a timer; `Idle` for deleted or unknown ids.
    pub fn timer_state(&self, id: TimerId) -> TimerState {
        self.timers
            .get(id)
            .map_or(TimerState::Idle, |slot| slot.state())
    }

    /// Stop every running timer without freeing any slot.
    ///
    /// Runs automatically at the start of every transition, so no timer
    /// of a state that has been left can fire into its successor.
    pub fn timer_stop_all(&mut self) -> usize {
        let platform = &mut self.platform;
        let stopped = self.timers.disarm_all(|handle| {
            if let Some(platform) = platform.as_mut() {
                platform.stop(handle);
            }
        });
        if stopped > 0 {
            debug!(machine = %self.name, stopped, "stopped running timers");
        }
        stopped
    }

    /// Stop and free every allocated timer.
    pub fn timer_delete_all(&mut self) -> usize {
        self.timer_stop_all();
        let allocated = self.timers.allocated();
        for &id in &allocated {
            // Ids come straight from the pool, so release cannot fail.
            let _ = self.timers.release(id);
        }
        allocated.len()
    }

    /// Deliver a platform expiry.
    ///
    /// Tickets of timers that were stopped, deleted or re-armed since are
    /// ignored and `Ok(false)` is returned. A one-shot timer is marked
    /// stopped before its event is dispatched, so handlers see it inactive.
    pub fn timer_callback(&mut self, ticket: &TimerTicket) -> Result<bool, HsmError> {
        if self.is_transitioning() {
            return Err(HsmError::DispatchDuringTransition);
        }
        let slot = match self.timers.get_mut(ticket.timer()) {
            Ok(slot) if slot.accepts(ticket) => slot,
            _ => {
                trace!(
                    machine = %self.name,
                    slot = ticket.timer().slot(),
                    "stale timer expiry ignored"
                );
                return Ok(false);
            }
        };

        let event = slot.event;
        if slot.mode == TimerMode::OneShot {
            slot.expire();
        }
        self.dispatch(event, None)?;
        Ok(true)
    }
}

impl<C> Hsm<C, TickTimers> {
    /// Advance the tick platform by `ms` milliseconds, one tick at a time,
    /// delivering every expiry as it happens.
    ///
    /// Returns how many expiries were dispatched.
    pub fn advance_ms(&mut self, ms: u32) -> Result<usize, HsmError> {
        let mut delivered = 0;
        let mut expired = Vec::new();
        for _ in 0..ms {
            expired.clear();
            match self.platform.as_mut() {
                Some(ticks) => ticks.tick_into(&mut expired),
                None => return Ok(delivered),
            }
            for ticket in &expired {
                if self.timer_callback(ticket)? {
                    delivered += 1;
                }
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{Event, Reply, StateTree};
    use crate::error::HsmError;
    use crate::machine::Hsm;
    use crate::timer::{PlatformError, TickTimers, TimerMode, TimerState, TimerTicket};
    use crate::timer::TimerPlatform;

    const TICK: Event = Event::user(0);
    const GO: Event = Event::user(1);

    #[derive(Default)]
    struct Counts {
        ticks: usize,
    }

    type TickHsm = Hsm<Counts, TickTimers>;

    fn machine() -> TickHsm {
        let mut tree: StateTree<Counts, TickTimers> = StateTree::new();
        let idle = tree
            .add_state("Idle", None, |hsm: &mut TickHsm, event, _| {
                if event == TICK {
                    hsm.context_mut().ticks += 1;
                    return Reply::Handled;
                }
                Reply::bubble(event)
            })
            .unwrap();
        Hsm::init("timers", tree, idle, Some(TickTimers::new(4))).unwrap()
    }

    #[test]
    fn zero_period_is_rejected() {
        let mut hsm = machine();
        let result = hsm.timer_create(TICK, 0, TimerMode::OneShot);
        assert!(matches!(result, Err(HsmError::InvalidArgument(_))));
    }

    #[test]
    fn engine_events_cannot_be_bound() {
        let mut hsm = machine();
        let result = hsm.timer_create(Event::ENTRY, 10, TimerMode::OneShot);
        assert!(matches!(result, Err(HsmError::InvalidArgument(_))));
    }

    #[test]
    fn pool_exhaustion_is_reported() {
        let mut hsm = machine();
        for _ in 0..4 {
            hsm.timer_create(TICK, 10, TimerMode::OneShot).unwrap();
        }
        let result = hsm.timer_create(TICK, 10, TimerMode::OneShot);
        assert_eq!(result, Err(HsmError::NoFreeTimerSlot { capacity: 4 }));
    }

    #[test]
    fn periodic_timer_dispatches_each_period() {
        let mut hsm = machine();
        let id = hsm.timer_create(TICK, 10, TimerMode::Periodic).unwrap();
        hsm.timer_start(id).unwrap();

        assert_eq!(hsm.advance_ms(35).unwrap(), 3);
        assert_eq!(hsm.context().ticks, 3);
        assert!(hsm.timer_is_running(id));
    }

    #[test]
    fn one_shot_stops_after_firing() {
        let mut hsm = machine();
        let id = hsm.timer_create(TICK, 10, TimerMode::OneShot).unwrap();
        hsm.timer_start(id).unwrap();

        hsm.advance_ms(50).unwrap();

        assert_eq!(hsm.context().ticks, 1);
        assert_eq!(hsm.timer_state(id), TimerState::Stopped);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut hsm = machine();
        let id = hsm.timer_create(TICK, 10, TimerMode::Periodic).unwrap();
        hsm.timer_start(id).unwrap();

        hsm.timer_stop(id).unwrap();
        hsm.timer_stop(id).unwrap();

        assert_eq!(hsm.advance_ms(30).unwrap(), 0);
        assert_eq!(hsm.timer_state(id), TimerState::Stopped);
    }

    #[test]
    fn restart_resets_countdown() {
        let mut hsm = machine();
        let id = hsm.timer_create(TICK, 10, TimerMode::OneShot).unwrap();
        hsm.timer_start(id).unwrap();
        hsm.advance_ms(8).unwrap();

        hsm.timer_restart(id).unwrap();
        hsm.advance_ms(8).unwrap();
        assert_eq!(hsm.context().ticks, 0);

        hsm.advance_ms(2).unwrap();
        assert_eq!(hsm.context().ticks, 1);
        assert_eq!(hsm.platform().map(|p| p.armed()), Some(0));
    }

    #[test]
    fn set_period_restarts_running_timer() {
        let mut hsm = machine();
        let id = hsm.timer_create(TICK, 100, TimerMode::OneShot).unwrap();
        hsm.timer_start(id).unwrap();

        hsm.timer_set_period(id, 5).unwrap();
        hsm.advance_ms(5).unwrap();

        assert_eq!(hsm.context().ticks, 1);
    }

    #[test]
    fn set_event_changes_delivered_event() {
        let mut hsm = machine();
        let id = hsm.timer_create(GO, 5, TimerMode::OneShot).unwrap();
        hsm.timer_set_event(id, TICK).unwrap();
        hsm.timer_start(id).unwrap();

        hsm.advance_ms(5).unwrap();

        assert_eq!(hsm.context().ticks, 1);
    }

    #[test]
    fn deleted_timer_id_is_rejected_after_reuse() {
        let mut hsm = machine();
        let old = hsm.timer_create(TICK, 10, TimerMode::OneShot).unwrap();
        hsm.timer_delete(old).unwrap();
        let new = hsm.timer_create(TICK, 10, TimerMode::OneShot).unwrap();

        assert_eq!(old.slot(), new.slot());
        assert!(matches!(hsm.timer_start(old), Err(HsmError::InvalidArgument(_))));
        assert_eq!(hsm.timer_state(old), TimerState::Idle);
        assert_eq!(hsm.timer_state(new), TimerState::Stopped);
    }

    #[test]
    fn delete_all_frees_every_slot() {
        let mut hsm = machine();
        let a = hsm.timer_create(TICK, 10, TimerMode::Periodic).unwrap();
        hsm.timer_create(TICK, 10, TimerMode::OneShot).unwrap();
        hsm.timer_start(a).unwrap();

        assert_eq!(hsm.timer_delete_all(), 2);
        assert_eq!(hsm.timers().in_use(), 0);
        assert_eq!(hsm.platform().map(|p| p.armed()), Some(0));
    }

    #[test]
    fn platform_failure_leaves_timer_stopped() {
        let mut tree: StateTree<Counts, TickTimers> = StateTree::new();
        let idle = tree
            .add_state("Idle", None, |_, event, _| Reply::bubble(event))
            .unwrap();
        let mut hsm = Hsm::init("tiny", tree, idle, Some(TickTimers::new(1))).unwrap();
        let a = hsm.timer_create(TICK, 10, TimerMode::OneShot).unwrap();
        let b = hsm.timer_create(TICK, 10, TimerMode::OneShot).unwrap();
        hsm.timer_start(a).unwrap();

        let result = hsm.timer_start(b);

        assert_eq!(
            result,
            Err(HsmError::PlatformTimerFailure(PlatformError::Exhausted))
        );
        assert_eq!(hsm.timer_state(b), TimerState::Stopped);
        assert_eq!(hsm.current_state(), idle);
    }

    #[test]
    fn start_without_platform_fails() {
        let mut tree: StateTree = StateTree::new();
        let idle = tree
            .add_state("Idle", None, |_, event, _| Reply::bubble(event))
            .unwrap();
        let mut hsm: Hsm = Hsm::init("bare", tree, idle, None).unwrap();
        let id = hsm.timer_create(TICK, 10, TimerMode::OneShot).unwrap();

        let result = hsm.timer_start(id);

        assert_eq!(
            result,
            Err(HsmError::PlatformTimerFailure(PlatformError::Unavailable))
        );
        assert_eq!(hsm.now_ms(), 0);
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut hsm = machine();
        let id = hsm.timer_create(TICK, 10, TimerMode::Periodic).unwrap();
        hsm.timer_start(id).unwrap();
        let ticket = TimerTicket::new(id, 0);

        assert_eq!(hsm.timer_callback(&ticket), Ok(false));
        assert_eq!(hsm.context().ticks, 0);
    }

    #[test]
    fn clock_comes_from_platform() {
        let mut hsm = machine();
        hsm.advance_ms(42).unwrap();
        assert_eq!(hsm.now_ms(), 42);
        assert_eq!(hsm.platform().map(|ticks| ticks.now_ms()), Some(42));
    }
}
