//! Transaction configuration shared by engine bootstrap code.

use crate::error::{KvError, KvResult};
use crate::ids::QueueCapacity;

/// What the batch executor does when a compensating command fails during rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompensationPolicy {
    /// Replay every remaining undo entry, then report the failures.
    #[default]
    ContinueAndReport,
    /// Stop replay at the first failing compensating command and report it.
    StopOnFirstFailure,
}

/// Bootstrap configuration for the transaction engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Commands rejected at admission even when they can report their keys.
    ///
    /// Names are compared case-insensitively.
    pub forbidden_commands: Vec<String>,
    /// Rollback behavior when a compensating command fails.
    pub compensation_policy: CompensationPolicy,
    /// Optional cap on the number of commands staged by one session.
    pub max_queued_commands: Option<QueueCapacity>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            forbidden_commands: vec!["FLUSHDB".to_owned(), "FLUSHALL".to_owned()],
            compensation_policy: CompensationPolicy::default(),
            max_queued_commands: None,
        }
    }
}

impl TransactionConfig {
    /// Checks that the configuration can be used to build an engine.
    ///
    /// # Errors
    ///
    /// Returns `KvError::InvalidConfig` when a denylist entry is blank.
    pub fn validate(&self) -> KvResult<()> {
        if self
            .forbidden_commands
            .iter()
            .any(|name| name.trim().is_empty())
        {
            return Err(KvError::InvalidConfig(
                "forbidden command names must not be blank",
            ));
        }
        Ok(())
    }
}
