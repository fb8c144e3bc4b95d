//! Sequential batch execution with undo-based compensation.
//!
//! Before each command runs, its compensating lines are captured from the keyspace state it is
//! about to change. The first error reply stops the batch; every applied command is then
//! compensated in reverse order while the batch still holds its key locks.

use kvtx_common::config::CompensationPolicy;
use kvtx_common::error::{KvError, KvResult};
use kvtx_common::ids::BatchId;
use kvtx_core::Database;
use kvtx_core::command::{CommandFrame, CommandReply};

use crate::coordinator::BatchLocks;

/// Lifecycle of one batch. `Committed` and `Compensated` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    /// Key sets are being derived from the queued commands.
    Planning,
    /// Every key lock of the batch is held.
    Locked,
    /// Commands are running in queue order.
    Executing,
    /// Every command succeeded.
    Committed,
    /// A command failed and compensation is replaying.
    Aborting,
    /// Compensation finished.
    Compensated,
}

impl BatchPhase {
    /// Returns whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Compensated)
    }
}

/// Terminal result of one executed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// One reply per queued command, in queue order.
    Committed(Vec<CommandReply>),
    /// A command failed and the applied prefix was compensated.
    Compensated {
        /// Zero-based queue index of the failing command.
        failed_index: usize,
        /// Failure of that command, `KvError::CommandExecution` for an error reply.
        error: KvError,
        /// Number of compensating commands that themselves failed.
        compensation_failures: usize,
    },
}

impl BatchOutcome {
    /// Returns the terminal phase this outcome corresponds to.
    #[must_use]
    pub fn phase(&self) -> BatchPhase {
        match self {
            Self::Committed(_) => BatchPhase::Committed,
            Self::Compensated { .. } => BatchPhase::Compensated,
        }
    }

    /// Converts the outcome into the caller-visible batch result.
    ///
    /// # Errors
    ///
    /// Returns `KvError::TransactionAborted` for a cleanly compensated batch and
    /// `KvError::CompensationFailed` when part of the compensation could not be applied.
    pub fn into_result(self) -> KvResult<Vec<CommandReply>> {
        match self {
            Self::Committed(replies) => Ok(replies),
            Self::Compensated {
                compensation_failures: 0,
                ..
            } => Err(KvError::TransactionAborted),
            Self::Compensated {
                compensation_failures,
                ..
            } => Err(KvError::CompensationFailed {
                failed: compensation_failures,
            }),
        }
    }

    /// Converts the outcome into the aggregate reply or the abort error reply.
    #[must_use]
    pub fn into_reply(self) -> CommandReply {
        match self.into_result() {
            Ok(replies) => CommandReply::Array(replies),
            Err(error) => CommandReply::from(error),
        }
    }
}

/// Stack of undo entries, one per successfully applied command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoLog {
    entries: Vec<Vec<CommandFrame>>,
}

impl UndoLog {
    /// Records the undo entry of a command that has just been applied.
    pub fn push(&mut self, entry: Vec<CommandFrame>) {
        self.entries.push(entry);
    }

    /// Returns the number of recorded entries, empty ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pops entries newest first and runs each entry's lines in their recorded order.
    ///
    /// Returns the number of compensating commands that replied with an error.
    pub fn replay(
        mut self,
        batch_id: BatchId,
        database: &Database,
        policy: CompensationPolicy,
    ) -> usize {
        let mut failures = 0_usize;
        while let Some(entry) = self.entries.pop() {
            for frame in entry {
                let reply = database.exec_with_lock(&frame);
                if !reply.is_error() {
                    continue;
                }
                failures += 1;
                tracing::error!(
                    batch = batch_id,
                    command = %frame.name,
                    reply = ?reply,
                    "compensating command failed"
                );
                if policy == CompensationPolicy::StopOnFirstFailure {
                    return failures;
                }
            }
        }
        failures
    }
}

/// Runs the queued commands of one locked batch.
#[derive(Debug)]
pub struct BatchExecutor<'a> {
    database: &'a Database,
    policy: CompensationPolicy,
    phase: BatchPhase,
}

impl<'a> BatchExecutor<'a> {
    /// Creates an executor in the `Planning` phase.
    #[must_use]
    pub fn new(database: &'a Database, policy: CompensationPolicy) -> Self {
        Self {
            database,
            policy,
            phase: BatchPhase::Planning,
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    /// Executes `commands` in order under `locks`.
    ///
    /// The guard is taken by reference so the caller's scope keeps ownership of the locks until
    /// compensation has finished.
    pub fn run(&mut self, locks: &BatchLocks<'_>, commands: &[CommandFrame]) -> BatchOutcome {
        let batch_id = locks.batch_id();
        self.advance(batch_id, BatchPhase::Locked);
        self.advance(batch_id, BatchPhase::Executing);

        let mut replies = Vec::with_capacity(commands.len());
        let mut undo_log = UndoLog::default();
        for (index, frame) in commands.iter().enumerate() {
            let undo = match self.database.undo_lines(frame) {
                Ok(undo) => undo,
                Err(error) => return self.abort(batch_id, index, error, undo_log),
            };
            let reply = self.database.exec_with_lock(frame);
            if let CommandReply::Error { category, message } = &reply {
                let error = KvError::CommandExecution(format!("{category} {message}"));
                return self.abort(batch_id, index, error, undo_log);
            }
            undo_log.push(undo);
            replies.push(reply);
        }

        self.advance(batch_id, BatchPhase::Committed);
        BatchOutcome::Committed(replies)
    }

    fn abort(
        &mut self,
        batch_id: BatchId,
        failed_index: usize,
        error: KvError,
        undo_log: UndoLog,
    ) -> BatchOutcome {
        tracing::warn!(
            batch = batch_id,
            failed_index,
            error = %error,
            applied = undo_log.len(),
            "batch aborted, compensating applied commands"
        );
        self.advance(batch_id, BatchPhase::Aborting);
        let compensation_failures = if undo_log.is_empty() {
            0
        } else {
            undo_log.replay(batch_id, self.database, self.policy)
        };
        self.advance(batch_id, BatchPhase::Compensated);
        BatchOutcome::Compensated {
            failed_index,
            error,
            compensation_failures,
        }
    }

    fn advance(&mut self, batch_id: BatchId, next: BatchPhase) {
        tracing::trace!(batch = batch_id, from = ?self.phase, to = ?next, "batch phase");
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchExecutor, BatchOutcome, BatchPhase, UndoLog};
    use crate::coordinator::LockCoordinator;
    use kvtx_common::config::CompensationPolicy;
    use kvtx_common::error::KvError;
    use kvtx_core::Database;
    use kvtx_core::command::{CommandFrame, CommandReply};
    use kvtx_core::dispatch::{KeyAccess, StoredValue};
    use googletest::prelude::*;
    use rstest::rstest;

    fn frame(name: &str, args: &[&[u8]]) -> CommandFrame {
        CommandFrame::new(name, args.iter().map(|arg| arg.to_vec()).collect())
    }

    fn run_batch(database: &Database, commands: &[CommandFrame]) -> (BatchOutcome, BatchPhase) {
        let coordinator = LockCoordinator::default();
        let locks = coordinator
            .acquire_for_batch(1, &KeyAccess::default())
            .expect("empty lock set");
        let mut executor = BatchExecutor::new(database, CompensationPolicy::default());
        let outcome = executor.run(&locks, commands);
        (outcome, executor.phase())
    }

    #[rstest]
    fn successful_batch_returns_every_reply_in_order() {
        let database = Database::default();
        let (outcome, phase) = run_batch(
            &database,
            &[
                frame("SET", &[b"a", b"1"]),
                frame("INCR", &[b"a"]),
                frame("GET", &[b"a"]),
            ],
        );

        assert_that!(phase, eq(BatchPhase::Committed));
        assert_that!(
            &outcome,
            eq(&BatchOutcome::Committed(vec![
                CommandReply::ok(),
                CommandReply::Integer(2),
                CommandReply::BulkString(b"2".to_vec()),
            ]))
        );
    }

    #[rstest]
    fn failing_command_restores_absent_key_and_skips_the_rest() {
        let database = Database::default();
        let (outcome, phase) = run_batch(
            &database,
            &[
                frame("SET", &[b"a", b"1"]),
                frame("LPUSH", &[b"a", b"x"]),
                frame("SET", &[b"b", b"never"]),
            ],
        );

        assert_that!(phase, eq(BatchPhase::Compensated));
        assert_that!(
            &outcome.clone().into_result(),
            eq(&Err(KvError::TransactionAborted))
        );
        let BatchOutcome::Compensated {
            failed_index,
            error,
            ..
        } = outcome
        else {
            panic!("batch should have been compensated");
        };
        assert_that!(failed_index, eq(1_usize));
        assert_that!(
            &error,
            eq(&KvError::CommandExecution(
                "WRONGTYPE Operation against a key holding the wrong kind of value".to_owned()
            ))
        );
        assert_that!(&database.value(b"a"), eq(&Ok(None)));
        assert_that!(&database.value(b"b"), eq(&Ok(None)));
    }

    #[rstest]
    fn compensation_restores_prior_values_in_reverse_order() {
        let database = Database::default();
        let _ = database.exec_with_lock(&frame("SET", &[b"a", b"old"]));
        let _ = database.exec_with_lock(&frame("RPUSH", &[b"l", b"x", b"y"]));
        let before = database.snapshot().expect("healthy keyspace");

        let (outcome, _) = run_batch(
            &database,
            &[
                frame("SET", &[b"a", b"mid"]),
                frame("APPEND", &[b"a", b"-tail"]),
                frame("LPUSH", &[b"l", b"z"]),
                frame("RPOP", &[b"l"]),
                frame("DEL", &[b"l"]),
                frame("INCR", &[b"a"]),
            ],
        );

        assert_that!(outcome.phase(), eq(BatchPhase::Compensated));
        assert_that!(&database.snapshot(), eq(&Ok(before)));
        assert_that!(
            &database.value(b"a"),
            eq(&Ok(Some(StoredValue::String(b"old".to_vec()))))
        );
    }

    #[rstest]
    fn failure_on_the_first_command_has_nothing_to_compensate() {
        let database = Database::default();
        let _ = database.exec_with_lock(&frame("RPUSH", &[b"l", b"x"]));
        let before = database.snapshot().expect("healthy keyspace");

        let (outcome, phase) = run_batch(
            &database,
            &[frame("INCR", &[b"l"]), frame("SET", &[b"l", b"1"])],
        );

        assert_that!(phase, eq(BatchPhase::Compensated));
        assert_that!(
            &outcome.into_result(),
            eq(&Err(KvError::TransactionAborted))
        );
        assert_that!(&database.snapshot(), eq(&Ok(before)));
    }

    #[rstest]
    fn abort_reply_carries_the_execabort_category() {
        let reply = BatchOutcome::Compensated {
            failed_index: 0,
            error: KvError::CommandExecution("WRONGTYPE".to_owned()),
            compensation_failures: 0,
        }
        .into_reply();
        assert_that!(
            &reply,
            eq(&CommandReply::Error {
                category: "EXECABORT",
                message: "Transaction discarded because of previous errors.".to_owned(),
            })
        );
    }

    #[rstest]
    #[case(CompensationPolicy::ContinueAndReport, 2_usize, true)]
    #[case(CompensationPolicy::StopOnFirstFailure, 1_usize, false)]
    fn replay_applies_the_compensation_policy(
        #[case] policy: CompensationPolicy,
        #[case] expected_failures: usize,
        #[case] older_entry_applied: bool,
    ) {
        let database = Database::default();
        let _ = database.exec_with_lock(&frame("SET", &[b"s", b"text"]));

        let mut undo_log = UndoLog::default();
        undo_log.push(vec![frame("SET", &[b"restored", b"1"])]);
        undo_log.push(vec![frame("INCR", &[b"s"]), frame("LPUSH", &[b"s", b"x"])]);

        let failures = undo_log.replay(9, &database, policy);
        assert_that!(failures, eq(expected_failures));
        let restored = database.value(b"restored").expect("healthy keyspace");
        assert_that!(restored.is_some(), eq(older_entry_applied));
    }

    #[rstest]
    fn failed_compensation_is_reported_distinctly() {
        let outcome = BatchOutcome::Compensated {
            failed_index: 3,
            error: KvError::CommandExecution("ERR boom".to_owned()),
            compensation_failures: 2,
        };
        assert_that!(
            &outcome.into_result(),
            eq(&Err(KvError::CompensationFailed { failed: 2 }))
        );
    }

    #[rstest]
    fn new_executor_starts_in_planning() {
        let database = Database::default();
        let executor = BatchExecutor::new(&database, CompensationPolicy::default());
        assert_that!(executor.phase(), eq(BatchPhase::Planning));
        assert_that!(executor.phase().is_terminal(), eq(false));
        assert_that!(BatchPhase::Compensated.is_terminal(), eq(true));
    }
}
