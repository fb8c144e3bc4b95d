//! Admission gate between a `MULTI` session and its pending queue.
//!
//! A command enters the queue only when it is known, not denylisted, able to report its keys,
//! and called with a valid argument count. A malformed command is rejected here instead of
//! being queued to fail at `EXEC`, so it never occupies a slot in an atomic batch.

use std::sync::Arc;

use kvtx_common::config::TransactionConfig;
use kvtx_common::error::{KvError, KvResult};
use kvtx_common::ids::QueueCapacity;
use kvtx_core::command::{CommandFrame, CommandReply};
use kvtx_core::containers::HotSet;
use kvtx_core::dispatch::{CommandRegistry, CommandSpec};

use crate::session::TransactionSession;

/// Validates candidate commands against the command table before they are staged.
#[derive(Debug, Clone)]
pub struct AdmissionValidator {
    registry: Arc<CommandRegistry>,
    forbidden: HotSet<String>,
    max_queued: Option<QueueCapacity>,
}

impl AdmissionValidator {
    /// Builds a validator over `registry` with the denylist and queue cap from `config`.
    #[must_use]
    pub fn new(registry: Arc<CommandRegistry>, config: &TransactionConfig) -> Self {
        Self {
            registry,
            forbidden: config
                .forbidden_commands
                .iter()
                .map(|name| name.trim().to_ascii_uppercase())
                .collect(),
            max_queued: config.max_queued_commands,
        }
    }

    /// Checks whether `frame` may be staged, returning its table entry.
    ///
    /// # Errors
    ///
    /// Returns, in check order: `KvError::UnknownCommand` when the name is absent from the
    /// table, `KvError::ForbiddenInTransaction` when the name is denylisted or the command has
    /// no prepare step, and `KvError::WrongArity` when the argument count is invalid.
    pub fn admit(&self, frame: &CommandFrame) -> KvResult<&CommandSpec> {
        let display_name = frame.name.to_ascii_lowercase();
        let Some(spec) = self.registry.lookup(&frame.name) else {
            return Err(KvError::UnknownCommand(display_name));
        };
        if self.forbidden.contains(spec.name) || spec.prepare.is_none() {
            return Err(KvError::ForbiddenInTransaction(display_name));
        }
        if !spec.arity.accepts(frame.args.len()) {
            return Err(KvError::WrongArity(display_name));
        }
        Ok(spec)
    }

    /// Admits `frame` and appends it to the session queue.
    ///
    /// Returns the `QUEUED` acknowledgement, not the command's eventual result.
    ///
    /// # Errors
    ///
    /// Returns any `admit` error, `KvError::InvalidState` when the queue is full or the session
    /// is not in `MULTI` mode. The queue is unchanged on every error path.
    pub fn enqueue(
        &self,
        session: &mut TransactionSession,
        frame: CommandFrame,
    ) -> KvResult<CommandReply> {
        let _ = self.admit(&frame)?;
        if self
            .max_queued
            .is_some_and(|cap| session.queued_commands().len() >= cap.get())
        {
            return Err(KvError::InvalidState("transaction queue is full"));
        }
        session.queue_command(frame)?;
        Ok(CommandReply::Queued)
    }
}
