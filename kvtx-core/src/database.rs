//! Shared keyspace execution entry point.

use std::sync::{Arc, Mutex, MutexGuard};

use kvtx_common::error::{KvError, KvResult};

use crate::command::{CommandFrame, CommandReply};
use crate::dispatch::{CommandRegistry, Keyspace, StoredValue};

/// Keyspace plus the read-only command table that operates on it.
///
/// Logical isolation between sessions comes from key locks held by the caller. The inner mutex
/// only guards memory for the duration of one command, so `exec_with_lock` never blocks on
/// another session's batch.
#[derive(Debug)]
pub struct Database {
    registry: Arc<CommandRegistry>,
    keyspace: Mutex<Keyspace>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new(Arc::new(CommandRegistry::with_builtin_commands()))
    }
}

impl Database {
    /// Creates an empty database bound to `registry`.
    #[must_use]
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            keyspace: Mutex::new(Keyspace::default()),
        }
    }

    /// Returns the command table used by this database.
    #[must_use]
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Executes one command line, assuming the caller already holds its key locks.
    #[must_use]
    pub fn exec_with_lock(&self, frame: &CommandFrame) -> CommandReply {
        let mut keyspace = match self.lock_keyspace() {
            Ok(keyspace) => keyspace,
            Err(error) => return CommandReply::from(error),
        };
        tracing::trace!(command = %frame.name, argc = frame.args.len(), "exec_with_lock");
        self.registry.dispatch(frame, &mut keyspace)
    }

    /// Captures the compensating command lines for `frame` from the current keyspace state.
    ///
    /// # Errors
    ///
    /// Returns `KvError::InvalidState` when the keyspace mutex is poisoned.
    pub fn undo_lines(&self, frame: &CommandFrame) -> KvResult<Vec<CommandFrame>> {
        let keyspace = self.lock_keyspace()?;
        Ok(self.registry.undo_lines(frame, &keyspace))
    }

    /// Returns a copy of the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `KvError::InvalidState` when the keyspace mutex is poisoned.
    pub fn value(&self, key: &[u8]) -> KvResult<Option<StoredValue>> {
        Ok(self.lock_keyspace()?.get(key).cloned())
    }

    /// Returns a full copy of the keyspace.
    ///
    /// # Errors
    ///
    /// Returns `KvError::InvalidState` when the keyspace mutex is poisoned.
    pub fn snapshot(&self) -> KvResult<Keyspace> {
        Ok(self.lock_keyspace()?.clone())
    }

    fn lock_keyspace(&self) -> KvResult<MutexGuard<'_, Keyspace>> {
        self.keyspace
            .lock()
            .map_err(|_| KvError::InvalidState("keyspace mutex is poisoned"))
    }
}
