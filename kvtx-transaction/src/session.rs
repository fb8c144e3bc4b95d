//! Connection-scoped transaction queue state.
//!
//! Transaction intent lives at the client-connection level (`MULTI` queue); actual execution is
//! delegated to the engine when `EXEC` arrives. The buffer is non-empty only while `in_multi` is
//! set, and both are cleared together on `EXEC` and `DISCARD`.

use kvtx_common::error::{KvError, KvResult};
use kvtx_common::ids::SessionId;
use kvtx_core::command::CommandFrame;

/// Mutable transaction state attached to one client connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSession {
    id: SessionId,
    in_multi: bool,
    queued_commands: Vec<CommandFrame>,
}

impl TransactionSession {
    /// Creates idle session state for connection `id`.
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Returns the owning connection id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Starts transaction queue mode for this connection.
    ///
    /// # Errors
    ///
    /// Returns `KvError::AlreadyInTransaction` when a transaction is already open. The queue is
    /// left untouched in that case.
    pub fn begin(&mut self) -> KvResult<()> {
        if self.in_multi {
            return Err(KvError::AlreadyInTransaction);
        }
        self.in_multi = true;
        Ok(())
    }

    /// Appends one already-admitted command to the queue.
    ///
    /// # Errors
    ///
    /// Returns `KvError::InvalidState` when the session is not in `MULTI` mode.
    pub fn queue_command(&mut self, frame: CommandFrame) -> KvResult<()> {
        if !self.in_multi {
            return Err(KvError::InvalidState("command queued without MULTI"));
        }
        self.queued_commands.push(frame);
        Ok(())
    }

    /// Discards queued transaction commands and exits `MULTI` mode.
    ///
    /// # Errors
    ///
    /// Returns `KvError::NoTransactionActive` when no transaction is open.
    pub fn discard(&mut self) -> KvResult<()> {
        if !self.in_multi {
            return Err(KvError::NoTransactionActive("DISCARD"));
        }
        self.in_multi = false;
        self.queued_commands.clear();
        Ok(())
    }

    /// Exits `MULTI` mode and hands over the queued commands for execution.
    ///
    /// # Errors
    ///
    /// Returns `KvError::NoTransactionActive` when no transaction is open.
    pub fn take_queued_for_exec(&mut self) -> KvResult<Vec<CommandFrame>> {
        if !self.in_multi {
            return Err(KvError::NoTransactionActive("EXEC"));
        }
        self.in_multi = false;
        Ok(std::mem::take(&mut self.queued_commands))
    }

    /// Returns whether this connection is currently in `MULTI` mode.
    #[must_use]
    pub fn in_multi(&self) -> bool {
        self.in_multi
    }

    /// Returns the commands staged so far.
    #[must_use]
    pub fn queued_commands(&self) -> &[CommandFrame] {
        &self.queued_commands
    }
}
