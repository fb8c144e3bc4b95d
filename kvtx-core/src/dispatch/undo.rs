//! Compensating command generation.
//!
//! Undo lines are computed from the keyspace right before a command runs. Replaying them after
//! the command restores every key it could have touched.

use super::{Keyspace, StoredValue};
use crate::command::CommandFrame;

/// Restores the given keys to their current state, key by key.
///
/// Absent keys compensate to `DEL`, strings to `SET`, lists to `DEL` followed by one `RPUSH`
/// holding every element in order.
pub(super) fn snapshot_keys(keys: &[Vec<u8>], keyspace: &Keyspace) -> Vec<CommandFrame> {
    let mut undo = Vec::with_capacity(keys.len());
    for key in keys {
        match keyspace.get(key) {
            None => undo.push(CommandFrame::new("DEL", vec![key.clone()])),
            Some(StoredValue::String(value)) => {
                undo.push(CommandFrame::new("SET", vec![key.clone(), value.clone()]));
            }
            Some(StoredValue::List(items)) => {
                undo.push(CommandFrame::new("DEL", vec![key.clone()]));
                let mut args = Vec::with_capacity(items.len() + 1);
                args.push(key.clone());
                args.extend(items.iter().cloned());
                undo.push(CommandFrame::new("RPUSH", args));
            }
        }
    }
    undo
}

pub(super) fn undo_lpush(args: &[Vec<u8>], keyspace: &Keyspace) -> Vec<CommandFrame> {
    undo_push(args, "LPOP", keyspace)
}

pub(super) fn undo_rpush(args: &[Vec<u8>], keyspace: &Keyspace) -> Vec<CommandFrame> {
    undo_push(args, "RPOP", keyspace)
}

/// A push onto an existing list is reverted by popping the same number of elements from the
/// same end, avoiding a full copy of the list.
fn undo_push(args: &[Vec<u8>], pop_command: &str, keyspace: &Keyspace) -> Vec<CommandFrame> {
    let Some(key) = args.first() else {
        return Vec::new();
    };
    let pushed = args.len().saturating_sub(1);
    match keyspace.get(key) {
        None => vec![CommandFrame::new("DEL", vec![key.clone()])],
        Some(StoredValue::List(_)) => vec![CommandFrame::new(
            pop_command,
            vec![key.clone(), pushed.to_string().into_bytes()],
        )],
        // The push fails with WRONGTYPE and has no effect to revert.
        Some(StoredValue::String(_)) => Vec::new(),
    }
}
