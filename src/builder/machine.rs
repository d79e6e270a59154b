//! Builder for constructing machines.

use crate::builder::error::BuildError;
use crate::config::HsmConfig;
use crate::core::{StateId, StateTree};
use crate::machine::Hsm;
use crate::timer::{NoTimers, TimerPlatform};
use std::sync::Arc;

/// Builder for a machine with a fluent API.
///
/// Use it over [`Hsm::init`] to supply a user context, a configuration,
/// or to share one [`StateTree`] between several machines.
///
/// # Example
///
/// ```rust
/// use hsm_runtime::builder::HsmBuilder;
/// use hsm_runtime::config::HsmConfig;
/// use hsm_runtime::core::{Reply, StateTree};
/// use std::sync::Arc;
///
/// let mut tree: StateTree<u32> = StateTree::new();
/// let idle = tree.add_state("Idle", None, |_, e, _| Reply::bubble(e)).unwrap();
/// let tree = Arc::new(tree);
///
/// let hsm = HsmBuilder::with_context(Arc::clone(&tree), 7u32)
///     .name("left")
///     .initial(idle)
///     .config(HsmConfig { max_timers: 2, ..HsmConfig::default() })
///     .build()
///     .unwrap();
///
/// assert_eq!(*hsm.context(), 7);
/// assert_eq!(hsm.timers().capacity(), 2);
/// ```
pub struct HsmBuilder<C = (), P: TimerPlatform = NoTimers> {
    tree: Arc<StateTree<C, P>>,
    name: String,
    initial: Option<StateId>,
    platform: Option<P>,
    context: C,
    config: HsmConfig,
}

impl<C: Default, P: TimerPlatform> HsmBuilder<C, P> {
    /// Create a new builder with a default context.
    pub fn new(tree: impl Into<Arc<StateTree<C, P>>>) -> Self {
        Self::with_context(tree, C::default())
    }
}

impl<C, P: TimerPlatform> HsmBuilder<C, P> {
    /// Create a new builder carrying `context`.
    pub fn with_context(tree: impl Into<Arc<StateTree<C, P>>>, context: C) -> Self {
        Self {
            tree: tree.into(),
            name: String::from("hsm"),
            initial: None,
            platform: None,
            context,
            config: HsmConfig::default(),
        }
    }

    /// Set the machine name used in logs and snapshots.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: StateId) -> Self {
        self.initial = Some(state);
        self
    }

    /// Set the timer platform. Without one, starting a timer fails.
    pub fn platform(mut self, platform: P) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Replace the user context.
    pub fn context(mut self, context: C) -> Self {
        self.context = context;
        self
    }

    pub fn config(mut self, config: HsmConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the machine and enter its initial state.
    /// Returns an error if required fields are missing or entry fails.
    pub fn build(self) -> Result<Hsm<C, P>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;
        self.config.validate()?;

        let hsm = Hsm::start(
            self.name,
            self.tree,
            initial,
            self.platform,
            self.context,
            self.config,
        )?;
        Ok(hsm)
    }
}
