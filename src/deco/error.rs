//! Error types for the decompression engine.

use thiserror::Error;

/// Errors raised while configuring the engine or computing a profile.
///
/// None of these are transient: the computation is deterministic, so a
/// failure always points at bad input or a bug.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecoError {
    /// Invalid rates, gradient factors or gas mix list.
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation was called with arguments it does not accept.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The engine produced an inconsistent step. The profile is unsafe.
    #[error("invariant breach, profile is unsafe: {0}")]
    Invariant(String),

    /// A pipeline consumer rejected a step.
    #[error("validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, DecoError>;
