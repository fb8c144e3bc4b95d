//! Transaction plan model.
//!
//! Planning is static analysis over argument shapes: it asks each command's prepare step for
//! the keys it will write and read, without touching the keyspace. It runs before any lock is
//! held.

use kvtx_common::error::{KvError, KvResult};
use kvtx_common::ids::BatchId;
use kvtx_core::command::CommandFrame;
use kvtx_core::dispatch::{CommandRegistry, KeyAccess};

/// Full execution plan for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPlan {
    /// Monotonic batch id, also the lock owner id.
    pub batch_id: BatchId,
    /// Command lines in queue order.
    pub commands: Vec<CommandFrame>,
    /// Concatenated key sets of every command. Duplicates are preserved.
    pub access: KeyAccess,
}

impl TransactionPlan {
    /// Plans `commands` against the command table.
    ///
    /// # Errors
    ///
    /// Returns the first `plan_command` error.
    pub fn build(
        batch_id: BatchId,
        registry: &CommandRegistry,
        commands: Vec<CommandFrame>,
    ) -> KvResult<Self> {
        let access = plan_batch(registry, &commands)?;
        Ok(Self {
            batch_id,
            commands,
            access,
        })
    }
}

/// Returns the write and read keys of one command.
///
/// # Errors
///
/// Returns `KvError::UnknownCommand` for names missing from the table and
/// `KvError::ForbiddenInTransaction` for commands without a prepare step.
pub fn plan_command(registry: &CommandRegistry, frame: &CommandFrame) -> KvResult<KeyAccess> {
    if let Some(access) = registry.prepare(frame) {
        return Ok(access);
    }
    let display_name = frame.name.to_ascii_lowercase();
    if registry.lookup(&frame.name).is_some() {
        Err(KvError::ForbiddenInTransaction(display_name))
    } else {
        Err(KvError::UnknownCommand(display_name))
    }
}

/// Concatenates the key sets of every command in queue order.
///
/// # Errors
///
/// Returns the first `plan_command` error.
pub fn plan_batch(registry: &CommandRegistry, commands: &[CommandFrame]) -> KvResult<KeyAccess> {
    let mut access = KeyAccess::default();
    for frame in commands {
        access.extend(plan_command(registry, frame)?);
    }
    Ok(access)
}

#[cfg(test)]
mod tests {
    use super::{TransactionPlan, plan_batch, plan_command};
    use kvtx_common::error::KvError;
    use kvtx_core::command::CommandFrame;
    use kvtx_core::dispatch::{CommandRegistry, KeyAccess};
    use googletest::prelude::*;
    use rstest::rstest;

    #[rstest]
    fn batch_plan_concatenates_keys_and_keeps_duplicates() {
        let registry = CommandRegistry::with_builtin_commands();
        let commands = vec![
            CommandFrame::new("SET", vec![b"a".to_vec(), b"1".to_vec()]),
            CommandFrame::new("GET", vec![b"a".to_vec()]),
            CommandFrame::new("INCR", vec![b"a".to_vec()]),
            CommandFrame::new("MGET", vec![b"b".to_vec(), b"c".to_vec()]),
        ];

        let access = plan_batch(&registry, &commands).expect("all commands have prepare steps");
        assert_that!(
            &access,
            eq(&KeyAccess {
                write_keys: vec![b"a".to_vec(), b"a".to_vec()],
                read_keys: vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()],
            })
        );
    }

    #[rstest]
    fn planning_does_not_require_valid_values() {
        let registry = CommandRegistry::with_builtin_commands();
        let frame = CommandFrame::new("INCRBY", vec![b"n".to_vec(), b"not-a-number".to_vec()]);
        let access = plan_command(&registry, &frame).expect("prepare only inspects shapes");
        assert_that!(&access.write_keys, eq(&vec![b"n".to_vec()]));
    }

    #[rstest]
    fn plan_command_rejects_commands_without_prepare() {
        let registry = CommandRegistry::with_builtin_commands();
        let result = plan_command(&registry, &CommandFrame::new("DBSIZE", Vec::new()));
        assert_that!(
            &result,
            eq(&Err(KvError::ForbiddenInTransaction("dbsize".to_owned())))
        );
    }

    #[rstest]
    fn plan_command_rejects_unknown_commands() {
        let registry = CommandRegistry::with_builtin_commands();
        let result = plan_command(&registry, &CommandFrame::new("NOPE", vec![b"k".to_vec()]));
        assert_that!(&result, eq(&Err(KvError::UnknownCommand("nope".to_owned()))));
    }

    #[rstest]
    fn empty_batch_plans_to_empty_access() {
        let registry = CommandRegistry::with_builtin_commands();
        let plan = TransactionPlan::build(3, &registry, Vec::new()).expect("empty plan is valid");
        assert_that!(plan.batch_id, eq(3_u64));
        assert_that!(plan.access.is_empty(), eq(true));
    }
}
