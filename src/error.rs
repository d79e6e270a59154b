//! Errors reported by the engine.

use crate::timer::PlatformError;
use thiserror::Error;

/// Errors returned by state tree construction, dispatch, transitions
/// and timer operations.
///
/// All of them are caller bugs except [`HsmError::NoFreeTimerSlot`] and
/// [`HsmError::PlatformTimerFailure`], which are recoverable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HsmError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("State hierarchy depth {depth} exceeds the configured maximum of {max}")]
    DepthExceeded { depth: usize, max: usize },

    #[error("No free timer slot (pool capacity {capacity})")]
    NoFreeTimerSlot { capacity: usize },

    #[error("Platform timer failure: {0}")]
    PlatformTimerFailure(#[from] PlatformError),

    #[error("Dispatch is not allowed while a transition is executing")]
    DispatchDuringTransition,
}
