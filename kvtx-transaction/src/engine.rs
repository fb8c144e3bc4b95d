//! Transaction entry points exposed to the connection layer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use kvtx_common::config::{CompensationPolicy, TransactionConfig};
use kvtx_common::error::{KvError, KvResult};
use kvtx_common::ids::BatchId;
use kvtx_core::Database;
use kvtx_core::command::{CommandFrame, CommandReply};

use crate::admission::AdmissionValidator;
use crate::coordinator::LockCoordinator;
use crate::executor::{BatchExecutor, BatchOutcome};
use crate::plan::TransactionPlan;
use crate::session::TransactionSession;

/// Shared transaction engine. One instance serves every session of a database.
#[derive(Debug)]
pub struct TransactionEngine {
    database: Arc<Database>,
    admission: AdmissionValidator,
    locks: LockCoordinator,
    compensation_policy: CompensationPolicy,
    next_batch_id: AtomicU64,
}

impl Default for TransactionEngine {
    fn default() -> Self {
        Self::from_parts(Arc::new(Database::default()), &TransactionConfig::default())
    }
}

impl TransactionEngine {
    /// Builds an engine over `database` after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns `KvError::InvalidConfig` when `config` fails validation.
    pub fn new(database: Arc<Database>, config: &TransactionConfig) -> KvResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(database, config))
    }

    fn from_parts(database: Arc<Database>, config: &TransactionConfig) -> Self {
        let admission = AdmissionValidator::new(Arc::clone(database.registry()), config);
        Self {
            database,
            admission,
            locks: LockCoordinator::default(),
            compensation_policy: config.compensation_policy,
            next_batch_id: AtomicU64::new(1),
        }
    }

    /// Returns the database this engine executes against.
    #[must_use]
    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Handles `MULTI`.
    ///
    /// # Errors
    ///
    /// Returns `KvError::AlreadyInTransaction` when `session` is already staging.
    pub fn begin(&self, session: &mut TransactionSession) -> KvResult<CommandReply> {
        session.begin()?;
        tracing::debug!(session = session.id(), "transaction started");
        Ok(CommandReply::ok())
    }

    /// Stages one command inside `MULTI`.
    ///
    /// # Errors
    ///
    /// Returns the admission error for unknown, forbidden, or malformed commands. The queue is
    /// unchanged on error.
    pub fn enqueue(
        &self,
        session: &mut TransactionSession,
        frame: CommandFrame,
    ) -> KvResult<CommandReply> {
        let command = frame.canonical_name();
        let reply = self.admission.enqueue(session, frame)?;
        tracing::debug!(
            session = session.id(),
            command = %command,
            queued = session.queued_commands().len(),
            "command queued"
        );
        Ok(reply)
    }

    /// Handles `DISCARD`.
    ///
    /// # Errors
    ///
    /// Returns `KvError::NoTransactionActive` when `session` is not staging.
    pub fn discard(&self, session: &mut TransactionSession) -> KvResult<CommandReply> {
        let dropped = session.queued_commands().len();
        session.discard()?;
        tracing::debug!(session = session.id(), dropped, "transaction discarded");
        Ok(CommandReply::ok())
    }

    /// Handles `EXEC`: takes the queue, clears session state, and runs the batch atomically.
    ///
    /// # Errors
    ///
    /// Returns `KvError::NoTransactionActive` without an open transaction,
    /// `KvError::TransactionAborted` when a queued command failed and the batch was compensated,
    /// and `KvError::CompensationFailed` when compensation itself hit errors.
    pub fn commit(&self, session: &mut TransactionSession) -> KvResult<Vec<CommandReply>> {
        let commands = session.take_queued_for_exec()?;
        tracing::debug!(
            session = session.id(),
            commands = commands.len(),
            "committing transaction"
        );
        self.execute_batch(commands)?.into_result()
    }

    /// Plans, locks and runs `commands` as one batch.
    ///
    /// # Errors
    ///
    /// Returns planning errors for commands that are unknown or cannot report their keys, and
    /// `KvError::InvalidState` when the lock table is poisoned. Command failures are reported
    /// through `BatchOutcome::Compensated`, not as errors.
    pub fn execute_batch(&self, commands: Vec<CommandFrame>) -> KvResult<BatchOutcome> {
        if commands.is_empty() {
            return Ok(BatchOutcome::Committed(Vec::new()));
        }
        let mut executor = BatchExecutor::new(&self.database, self.compensation_policy);
        let plan = TransactionPlan::build(
            self.allocate_batch_id(),
            self.database.registry(),
            commands,
        )?;
        let locks = self.locks.acquire_for_batch(plan.batch_id, &plan.access)?;
        let outcome = executor.run(&locks, &plan.commands);
        let locked_keys = locks.requests().len();
        drop(locks);
        tracing::debug!(
            batch = plan.batch_id,
            locked_keys,
            phase = ?outcome.phase(),
            "batch finished"
        );
        Ok(outcome)
    }

    /// Runs one command outside any transaction, isolated from concurrent batches.
    ///
    /// Commands that cannot report their keys run under the keyspace-wide lock.
    #[must_use]
    pub fn execute_single(&self, frame: &CommandFrame) -> CommandReply {
        let registry = self.database.registry();
        let spec = match registry.validate_frame(frame) {
            Ok(spec) => spec,
            Err(error) => return CommandReply::from(error),
        };
        let Some(prepare) = spec.prepare else {
            let _exclusive = self.locks.acquire_exclusive();
            return self.database.exec_with_lock(frame);
        };

        let access = prepare(&frame.args);
        match self.locks.acquire_for_batch(self.allocate_batch_id(), &access) {
            Ok(_locks) => self.database.exec_with_lock(frame),
            Err(error) => CommandReply::from(error),
        }
    }

    /// Routes one command for `session`, the way a connection handler would.
    ///
    /// `MULTI`, `EXEC` and `DISCARD` drive the session state. Any other command is staged while
    /// a transaction is open and executed immediately otherwise. Errors become error replies.
    pub fn handle(&self, session: &mut TransactionSession, frame: CommandFrame) -> CommandReply {
        let command = frame.canonical_name();
        let result = match command.as_str() {
            "MULTI" | "EXEC" | "DISCARD" if !frame.args.is_empty() => {
                Err(KvError::WrongArity(command.to_ascii_lowercase()))
            }
            "MULTI" => self.begin(session),
            "EXEC" => self.commit(session).map(CommandReply::Array),
            "DISCARD" => self.discard(session),
            _ if session.in_multi() => self.enqueue(session, frame),
            _ => Ok(self.execute_single(&frame)),
        };
        result.unwrap_or_else(CommandReply::from)
    }

    fn allocate_batch_id(&self) -> BatchId {
        self.next_batch_id.fetch_add(1, Ordering::Relaxed)
    }
}
