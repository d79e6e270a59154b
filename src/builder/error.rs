//! Build errors for the machine builder.

use crate::config::ConfigError;
use crate::error::HsmError;
use thiserror::Error;

/// Errors that can occur when building a machine.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("Invalid machine configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Entering the initial state failed: {0}")]
    Init(#[from] HsmError),
}
