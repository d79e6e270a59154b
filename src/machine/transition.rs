//! The transition engine.
//!
//! A transition stops the machine's running timers, exits every state
//! from the current one up to (excluding) the lowest common ancestor,
//! runs the optional hook, then enters every state from below the LCA
//! down to the target. Requests made from `ENTRY`/`EXIT` handlers are
//! deferred and applied right after the running transition completes.

use super::hsm::{Hsm, Phase};
use crate::core::{Event, Payload, StateId, TransitionHook, TransitionRecord};
use crate::error::HsmError;
use crate::timer::TimerPlatform;
use tracing::debug;

impl<C, P: TimerPlatform> Hsm<C, P> {
    /// Transition to `target` with no parameter and no hook.
    pub fn transition(&mut self, target: StateId) -> Result<(), HsmError> {
        self.transition_with(target, None, None)
    }

    /// Transition to `target`.
    ///
    /// `param` is passed as the payload of every `EXIT` and `ENTRY` this
    /// transition runs. `hook` runs once, after the last exit and before
    /// the first entry.
    ///
    /// Called from an `ENTRY`/`EXIT` handler, the request is deferred
    /// until the running transition completes; `param` and `hook` are
    /// dropped in that case. A target nested deeper than the machine's
    /// `max_depth` is rejected with [`HsmError::DepthExceeded`] before
    /// anything runs. If the exit or entry path cannot be built the
    /// machine keeps its current state, but its timers have already been
    /// stopped.
    pub fn transition_with(
        &mut self,
        target: StateId,
        param: Payload<'_>,
        hook: Option<&TransitionHook<C, P>>,
    ) -> Result<(), HsmError> {
        if !self.tree.contains(target) {
            return Err(HsmError::InvalidArgument(
                "target state is not part of the state tree",
            ));
        }
        self.tree.check_chain(target, self.config.max_depth)?;

        if let Phase::Transitioning { pending } = &mut self.phase {
            if let Some(replaced) = pending.replace(target) {
                debug!(
                    machine = %self.name,
                    replaced = self.tree.name(replaced),
                    "deferred transition replaced"
                );
            }
            debug!(
                machine = %self.name,
                target = self.tree.name(target),
                "transition deferred"
            );
            return Ok(());
        }

        self.run_transitions(target, param, hook, false)
    }

    /// Transition back to the state active before the last transition,
    /// or to the initial state if there is none.
    pub fn transition_to_history(&mut self) -> Result<(), HsmError> {
        let target = match self.history {
            Some(state) if self.config.history => state,
            _ => self.initial,
        };
        self.transition(target)
    }

    /// Run a transition and then every transition it deferred.
    pub(crate) fn run_transitions(
        &mut self,
        target: StateId,
        param: Payload<'_>,
        hook: Option<&TransitionHook<C, P>>,
        deferred: bool,
    ) -> Result<(), HsmError> {
        let mut next = self.execute(target, param, hook, deferred)?;
        while let Some(target) = next {
            next = self.execute(target, None, None, true)?;
        }
        Ok(())
    }

    fn execute(
        &mut self,
        target: StateId,
        param: Payload<'_>,
        hook: Option<&TransitionHook<C, P>>,
        deferred: bool,
    ) -> Result<Option<StateId>, HsmError> {
        self.timer_stop_all();

        let source = self.current;
        let lca = if target == source {
            self.tree.parent(source)
        } else {
            self.tree.lca(source, target)
        };
        let exits = self.tree.path_to(source, lca)?;
        let entries = self.tree.path_to(target, lca)?;

        debug!(
            machine = %self.name,
            from = self.tree.name(source),
            to = self.tree.name(target),
            exits = exits.len(),
            entries = entries.len(),
            deferred,
            "transition"
        );

        if self.config.history {
            self.history = Some(source);
        }
        self.phase = Phase::Transitioning { pending: None };

        for &state in exits.iter() {
            self.call(state, Event::EXIT, param);
        }
        if let Some(hook) = hook {
            hook(self, param);
        }
        for &state in entries.iter().rev() {
            self.call(state, Event::ENTRY, param);
        }

        self.current = target;
        self.depth = self.tree.depth(target);
        let pending = self.finish_phase();

        let at_ms = self.now_ms();
        self.log.record(TransitionRecord {
            from: source,
            to: target,
            at_ms,
            deferred,
        });
        Ok(pending)
    }
}
