//! Builder API for ergonomic machine construction.
//!
//! This module provides a fluent builder for machines that need a user
//! context, a configuration or a shared state tree, and a macro for
//! declaring application event enums.

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::HsmBuilder;
