//! The state hierarchy and common-ancestor computation.

use super::event::{Event, Payload, Reply};
use super::state::{Handler, StateId, StateNode};
use crate::config::{HsmConfig, DEFAULT_MAX_DEPTH, DEPTH_LIMIT};
use crate::error::HsmError;
use crate::machine::Hsm;
use crate::timer::TimerPlatform;
use std::sync::Arc;

/// States on one side of a transition, bounded by [`DEPTH_LIMIT`].
pub type StatePath = heapless::Vec<StateId, DEPTH_LIMIT>;

/// Arena of states forming the hierarchy used by one or more machines.
///
/// Several roots are allowed; states under different roots share the
/// implicit top as their common ancestor. Parents must be created before
/// their children, which rules out cycles.
///
/// # Example
///
/// ```rust
/// use hsm_runtime::core::{Reply, StateTree};
///
/// let mut tree: StateTree = StateTree::new();
/// let root = tree.add_state("Root", None, |_, event, _| Reply::bubble(event)).unwrap();
/// let a = tree.add_state("A", Some(root), |_, event, _| Reply::bubble(event)).unwrap();
/// let a1 = tree.add_state("A1", Some(a), |_, _, _| Reply::Handled).unwrap();
/// let b = tree.add_state("B", Some(root), |_, event, _| Reply::bubble(event)).unwrap();
///
/// assert_eq!(tree.depth(a1), 2);
/// assert_eq!(tree.lca(a1, b), Some(root));
/// ```
pub struct StateTree<C = (), P = crate::timer::NoTimers>
where
    P: TimerPlatform,
{
    nodes: Vec<StateNode<C, P>>,
    max_depth: usize,
}

impl<C, P: TimerPlatform> Default for StateTree<C, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, P: TimerPlatform> StateTree<C, P> {
    /// Empty tree with the default depth limit.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Empty tree whose depth limit comes from `config`.
    ///
    /// Only `max_depth` is read; it must lie in `1..=32`.
    pub fn with_config(config: &HsmConfig) -> Result<Self, HsmError> {
        if !(1..=DEPTH_LIMIT).contains(&config.max_depth) {
            return Err(HsmError::InvalidArgument("max_depth must be between 1 and 32"));
        }
        Ok(Self {
            nodes: Vec::new(),
            max_depth: config.max_depth,
        })
    }

    /// Add a state under `parent` (or as a root).
    ///
    /// Fails with [`HsmError::InvalidArgument`] for an unknown parent and
    /// with [`HsmError::DepthExceeded`] if the new state's chain would be
    /// longer than the configured maximum.
    pub fn add_state<F>(
        &mut self,
        name: impl Into<String>,
        parent: Option<StateId>,
        handler: F,
    ) -> Result<StateId, HsmError>
    where
        F: Fn(&mut Hsm<C, P>, Event, Payload<'_>) -> Reply + Send + Sync + 'static,
    {
        self.add_state_with(name, parent, Arc::new(handler))
    }

    /// Add a state with an already shared handler.
    pub fn add_state_with(
        &mut self,
        name: impl Into<String>,
        parent: Option<StateId>,
        handler: Handler<C, P>,
    ) -> Result<StateId, HsmError> {
        if self.nodes.len() >= usize::from(u16::MAX) {
            return Err(HsmError::InvalidArgument("state tree is full"));
        }
        let chain = match parent {
            Some(parent) => {
                if !self.contains(parent) {
                    return Err(HsmError::InvalidArgument("unknown parent state"));
                }
                self.depth(parent) + 2
            }
            None => 1,
        };
        if chain > self.max_depth {
            return Err(HsmError::DepthExceeded {
                depth: chain,
                max: self.max_depth,
            });
        }

        let id = StateId::new(self.nodes.len());
        self.nodes.push(StateNode {
            name: name.into(),
            parent,
            handler,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// True if `id` was created by this tree.
    pub fn contains(&self, id: StateId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node(&self, id: StateId) -> Option<&StateNode<C, P>> {
        self.nodes.get(id.index())
    }

    /// Diagnostic name of a state; empty for unknown ids.
    pub fn name(&self, id: StateId) -> &str {
        self.node(id).map(StateNode::name).unwrap_or_default()
    }

    pub fn parent(&self, id: StateId) -> Option<StateId> {
        self.node(id).and_then(StateNode::parent)
    }

    /// Look a state up by name.
    pub fn find(&self, name: &str) -> Option<StateId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(StateId::new)
    }

    /// Number of parent hops from `id` to its root.
    pub fn depth(&self, id: StateId) -> usize {
        self.ancestors(id).count().saturating_sub(1)
    }

    /// Fail with [`HsmError::DepthExceeded`] if the chain from the root
    /// down to `id` holds more than `max_depth` states.
    pub(crate) fn check_chain(&self, id: StateId, max_depth: usize) -> Result<(), HsmError> {
        let chain = self.depth(id) + 1;
        if chain > max_depth {
            return Err(HsmError::DepthExceeded {
                depth: chain,
                max: max_depth,
            });
        }
        Ok(())
    }

    /// `id` followed by each of its ancestors up to the root.
    pub fn ancestors(&self, id: StateId) -> impl Iterator<Item = StateId> + '_ {
        let start = self.contains(id).then_some(id);
        std::iter::successors(start, move |&state| self.parent(state))
    }

    /// True if `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: StateId, id: StateId) -> bool {
        self.ancestors(id).any(|state| state == ancestor)
    }

    /// Lowest common ancestor of two states.
    ///
    /// Brings both states to the same depth, then walks them upward in
    /// lockstep. `None` means the states live under different roots.
    pub fn lca(&self, a: StateId, b: StateId) -> Option<StateId> {
        if !self.contains(a) || !self.contains(b) {
            return None;
        }
        let (mut a, mut b) = (Some(a), Some(b));
        let mut depth_a = a.map_or(0, |s| self.depth(s));
        let mut depth_b = b.map_or(0, |s| self.depth(s));

        while depth_a > depth_b {
            a = a.and_then(|s| self.parent(s));
            depth_a -= 1;
        }
        while depth_b > depth_a {
            b = b.and_then(|s| self.parent(s));
            depth_b -= 1;
        }
        while a != b {
            a = a.and_then(|s| self.parent(s));
            b = b.and_then(|s| self.parent(s));
        }
        a
    }

    /// States from `from` upward, stopping before `stop` (or after the
    /// root when `stop` is `None`).
    pub fn path_to(&self, from: StateId, stop: Option<StateId>) -> Result<StatePath, HsmError> {
        let mut path = StatePath::new();
        for state in self.ancestors(from) {
            if Some(state) == stop {
                break;
            }
            if path.len() >= self.max_depth || path.push(state).is_err() {
                return Err(HsmError::DepthExceeded {
                    depth: path.len() + 1,
                    max: self.max_depth,
                });
            }
        }
        Ok(path)
    }

    pub(crate) fn handler(&self, id: StateId) -> Option<Handler<C, P>> {
        self.node(id).map(|node| Arc::clone(&node.handler))
    }
}
