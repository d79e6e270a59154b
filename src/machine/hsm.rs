//! The machine instance: lifecycle, queries and event dispatch.

use crate::config::HsmConfig;
use crate::core::{Event, Payload, Reply, StateId, StateTree, TransitionLog};
use crate::error::HsmError;
use crate::snapshot::{MachineSnapshot, TimerSnapshot, SNAPSHOT_VERSION};
use crate::timer::{NoTimers, TimerPlatform, TimerPool};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Operational mode of a machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Ready to accept `dispatch` or `transition`.
    Idle,

    /// Running `EXIT`/`ENTRY` handlers. A `transition` requested now is
    /// recorded in `pending` and applied once the current one completes.
    Transitioning { pending: Option<StateId> },
}

/// Where a dispatched event ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// A handler consumed the event.
    Handled { by: StateId },

    /// Every state up to the root bubbled the event.
    Dropped,
}

/// A hierarchical state machine instance.
///
/// Owns the current/initial/history state, a fixed timer pool and the
/// platform timer interface. States come from a shared [`StateTree`].
///
/// `dispatch` and `transition` run to completion and are not reentrant
/// across threads; drive a machine from one task.
///
/// # Example
///
/// ```rust
/// use hsm_runtime::core::{Event, Reply, StateTree};
/// use hsm_runtime::machine::Hsm;
///
/// const TOGGLE: Event = Event::user(0);
///
/// let mut tree: StateTree = StateTree::new();
/// let off = tree.add_state("Off", None, |_, e, _| Reply::bubble(e)).unwrap();
/// let on = tree.add_state("On", None, move |hsm, e, _| {
///     if e == TOGGLE {
///         hsm.transition(off).ok();
///         return Reply::Handled;
///     }
///     Reply::bubble(e)
/// }).unwrap();
///
/// let mut hsm: Hsm = Hsm::init("lamp", tree, on, None).unwrap();
/// hsm.dispatch(TOGGLE, None).unwrap();
///
/// assert_eq!(hsm.current_state(), off);
/// assert_eq!(hsm.current_state_name(), "Off");
/// ```
pub struct Hsm<C = (), P = NoTimers>
where
    P: TimerPlatform,
{
    pub(crate) name: String,
    pub(crate) tree: Arc<StateTree<C, P>>,
    pub(crate) current: StateId,
    pub(crate) initial: StateId,
    pub(crate) history: Option<StateId>,
    pub(crate) depth: usize,
    pub(crate) phase: Phase,
    pub(crate) timers: TimerPool<P::Handle>,
    pub(crate) platform: Option<P>,
    pub(crate) context: C,
    pub(crate) config: HsmConfig,
    pub(crate) log: TransitionLog,
}

impl<C: Default, P: TimerPlatform> Hsm<C, P> {
    /// Create a machine with the default configuration and context, and
    /// enter `initial`.
    ///
    /// `platform` may be `None` for machines that use no timers.
    pub fn init(
        name: impl Into<String>,
        tree: impl Into<Arc<StateTree<C, P>>>,
        initial: StateId,
        platform: Option<P>,
    ) -> Result<Self, HsmError> {
        Self::start(
            name.into(),
            tree.into(),
            initial,
            platform,
            C::default(),
            HsmConfig::default(),
        )
    }

    /// Builder for a machine over `tree`.
    pub fn builder(tree: impl Into<Arc<StateTree<C, P>>>) -> crate::builder::HsmBuilder<C, P> {
        crate::builder::HsmBuilder::new(tree)
    }
}

impl<C, P: TimerPlatform> Hsm<C, P> {
    /// Assemble a machine and run the initial entry.
    ///
    /// The whole chain from the root down to `initial` is entered,
    /// ancestors first, as if transitioning from nothing.
    pub(crate) fn start(
        name: String,
        tree: Arc<StateTree<C, P>>,
        initial: StateId,
        platform: Option<P>,
        context: C,
        config: HsmConfig,
    ) -> Result<Self, HsmError> {
        if !tree.contains(initial) {
            return Err(HsmError::InvalidArgument(
                "initial state is not part of the state tree",
            ));
        }
        config
            .validate()
            .map_err(|_| HsmError::InvalidArgument("invalid configuration"))?;
        tree.check_chain(initial, config.max_depth)?;
        let entries = tree.path_to(initial, None)?;

        let mut hsm = Self {
            name,
            depth: tree.depth(initial),
            tree,
            current: initial,
            initial,
            history: None,
            phase: Phase::Transitioning { pending: None },
            timers: TimerPool::new(config.max_timers),
            platform,
            context,
            log: TransitionLog::with_capacity(config.trace_capacity),
            config,
        };

        debug!(
            machine = %hsm.name,
            initial = hsm.tree.name(initial),
            "entering initial state"
        );
        for &state in entries.iter().rev() {
            hsm.call(state, Event::ENTRY, None);
        }

        if let Some(next) = hsm.finish_phase() {
            hsm.run_transitions(next, None, None, true)?;
        }
        Ok(hsm)
    }

    /// Deliver an event to the current state, bubbling it to each ancestor
    /// until a handler consumes it or the root drops it.
    ///
    /// `ENTRY`, `EXIT` and `NONE` are reserved for the engine and rejected.
    pub fn dispatch(
        &mut self,
        event: impl Into<Event>,
        payload: Payload<'_>,
    ) -> Result<Delivery, HsmError> {
        let mut event = event.into();
        if event.is_engine_only() {
            return Err(HsmError::InvalidArgument(
                "NONE, ENTRY and EXIT cannot be dispatched",
            ));
        }
        if self.is_transitioning() {
            return Err(HsmError::DispatchDuringTransition);
        }

        let mut state = Some(self.current);
        while let Some(id) = state {
            match self.call(id, event, payload).forwarded() {
                None => return Ok(Delivery::Handled { by: id }),
                Some(next) => event = next,
            }
            state = self.tree.parent(id);
        }

        trace!(machine = %self.name, ?event, "event dropped at root");
        Ok(Delivery::Dropped)
    }

    /// Invoke one state's handler.
    pub(crate) fn call(&mut self, state: StateId, event: Event, payload: Payload<'_>) -> Reply {
        let Some(handler) = self.tree.handler(state) else {
            return Reply::Handled;
        };
        trace!(
            machine = %self.name,
            state = self.tree.name(state),
            ?event,
            "handler"
        );
        handler(self, event, payload)
    }

    /// Leave `Transitioning`, returning any deferred target.
    pub(crate) fn finish_phase(&mut self) -> Option<StateId> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Transitioning { pending } => pending,
            Phase::Idle => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_state(&self) -> StateId {
        self.current
    }

    pub fn current_state_name(&self) -> &str {
        self.tree.name(self.current)
    }

    pub fn initial_state(&self) -> StateId {
        self.initial
    }

    /// The state that was active before the last transition.
    pub fn history_state(&self) -> Option<StateId> {
        self.history
    }

    /// Depth of the current state, cached for diagnostics.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True if `state` is the current state or one of its ancestors.
    pub fn is_in_state(&self, state: StateId) -> bool {
        self.tree.is_ancestor_or_self(state, self.current)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.phase, Phase::Transitioning { .. })
    }

    pub fn tree(&self) -> &StateTree<C, P> {
        &self.tree
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn platform(&self) -> Option<&P> {
        self.platform.as_ref()
    }

    pub fn platform_mut(&mut self) -> Option<&mut P> {
        self.platform.as_mut()
    }

    pub fn config(&self) -> &HsmConfig {
        &self.config
    }

    /// Recently completed transitions.
    pub fn transitions(&self) -> &TransitionLog {
        &self.log
    }

    pub fn timers(&self) -> &TimerPool<P::Handle> {
        &self.timers
    }

    /// Platform clock, or `0` without a platform.
    pub fn now_ms(&self) -> u32 {
        self.platform.as_ref().map_or(0, |platform| platform.now_ms())
    }

    /// Serializable view of the machine for diagnostics.
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            version: SNAPSHOT_VERSION,
            name: self.name.clone(),
            current: self.current_state_name().to_string(),
            depth: self.depth,
            history: self.history.map(|state| self.tree.name(state).to_string()),
            transitioning: self.is_transitioning(),
            timers: self
                .timers
                .slots()
                .enumerate()
                .map(|(slot, timer)| TimerSnapshot {
                    slot,
                    state: timer.state(),
                    event: timer.event,
                    period_ms: timer.period_ms,
                    mode: timer.mode,
                })
                .collect(),
        }
    }
}

impl<C, P: TimerPlatform> fmt::Debug for Hsm<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hsm")
            .field("name", &self.name)
            .field("current", &self.current_state_name())
            .field("phase", &self.phase)
            .field("timers_in_use", &self.timers.in_use())
            .finish_non_exhaustive()
    }
}
