//! State nodes and handler types.
//!
//! A state is an immutable node: a name, an optional parent and an event
//! handler. States live in a [`StateTree`](super::StateTree) arena and are
//! referred to by [`StateId`], so any number of machines can share one tree.

use super::event::{Event, Payload, Reply};
use crate::machine::Hsm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stable index of a state inside its tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(u16);

impl StateId {
    pub(crate) fn new(index: usize) -> Self {
        // Tree construction caps the arena at u16::MAX nodes.
        StateId(index as u16)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateId({})", self.0)
    }
}

/// Event handler of a state.
///
/// Receives the machine, the event and its payload. During `ENTRY` and
/// `EXIT` the payload is the transition parameter. The handler may call
/// `transition` and timer operations on the machine; calling `dispatch`
/// on its own machine from `ENTRY`/`EXIT` is rejected.
pub type Handler<C, P> = Arc<dyn Fn(&mut Hsm<C, P>, Event, Payload<'_>) -> Reply + Send + Sync>;

/// Hook run once per transition, after all exits and before any entry.
pub type TransitionHook<C, P> = dyn Fn(&mut Hsm<C, P>, Payload<'_>);

/// A named behavior unit in the hierarchy.
pub struct StateNode<C, P>
where
    P: crate::timer::TimerPlatform,
{
    pub(crate) name: String,
    pub(crate) parent: Option<StateId>,
    pub(crate) handler: Handler<C, P>,
}

impl<C, P> StateNode<C, P>
where
    P: crate::timer::TimerPlatform,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }
}

impl<C, P> fmt::Debug for StateNode<C, P>
where
    P: crate::timer::TimerPlatform,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}
