//! Runtime error types.

use mucbot_core::PatternError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors reported by a [`Transport`](crate::transport::Transport).
#[derive(Error, Debug)]
pub enum TransportError {
    /// The session could not be established.
    #[error("Failed to connect: {0}")]
    Connect(String),

    /// A message could not be handed to the session.
    #[error("Failed to send message: {0}")]
    Send(String),

    /// The session is gone.
    #[error("Transport closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors that can end [`Bot::run`](crate::bot::Bot::run).
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be resolved or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A handler pattern failed to compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The transport reported an unrecoverable session error.
    #[error("Fatal session error: {0}")]
    Fatal(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
