//! Shared error model for cross-crate APIs.

use thiserror::Error;

/// Unified result type used by all public interfaces in `kvtx`.
pub type KvResult<T> = Result<T, KvError>;

/// Error categories surfaced by session control, admission and batch execution.
///
/// Admission and session-state variants are returned before anything is staged. Execution-time
/// failures never reach the caller directly: the batch executor converts them into
/// `TransactionAborted` (or `CompensationFailed` when rollback itself misbehaves).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KvError {
    /// `MULTI` called while the session is already staging commands.
    #[error("MULTI calls can not be nested")]
    AlreadyInTransaction,

    /// `EXEC`/`DISCARD` called without a preceding `MULTI`.
    #[error("{0} without MULTI")]
    NoTransactionActive(&'static str),

    /// Command name is absent from the command table.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Command is denylisted or cannot report the keys it touches.
    #[error("command '{0}' cannot be used in MULTI")]
    ForbiddenInTransaction(String),

    /// Argument count violates the command's arity rule.
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(String),

    /// One queued command failed while the batch was executing.
    #[error("{0}")]
    CommandExecution(String),

    /// Batch hit a command failure and every applied effect was compensated.
    #[error("Transaction discarded because of previous errors.")]
    TransactionAborted,

    /// Batch aborted and at least one compensating command failed during replay.
    #[error("Transaction rollback incomplete: {failed} compensating command(s) failed")]
    CompensationFailed {
        /// Number of compensating command lines that returned an error.
        failed: usize,
    },

    /// Configuration is invalid for the requested operation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Runtime state does not allow this operation.
    #[error("invalid engine state: {0}")]
    InvalidState(&'static str),
}

impl KvError {
    /// Returns the machine-readable reply category for this error.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::TransactionAborted => "EXECABORT",
            Self::CompensationFailed { .. } => "ROLLBACKFAIL",
            _ => "ERR",
        }
    }
}
