use super::parse_numbers::parse_signed;
use super::{Keyspace, StoredValue};
use crate::command::{CommandFrame, CommandReply};

const NOT_AN_INTEGER: &str = "value is not an integer or out of range";

pub(super) fn handle_incr(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    mutate_counter_by(&frame.args[0], 1, keyspace)
}

pub(super) fn handle_decr(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    mutate_counter_by(&frame.args[0], -1, keyspace)
}

pub(super) fn handle_incrby(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let Some(delta) = parse_signed(&frame.args[1]) else {
        return CommandReply::error(NOT_AN_INTEGER);
    };
    mutate_counter_by(&frame.args[0], delta, keyspace)
}

pub(super) fn handle_decrby(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let Some(amount) = parse_signed(&frame.args[1]) else {
        return CommandReply::error(NOT_AN_INTEGER);
    };
    let Some(delta) = amount.checked_neg() else {
        return CommandReply::error(NOT_AN_INTEGER);
    };
    mutate_counter_by(&frame.args[0], delta, keyspace)
}

/// Applies one signed integer delta to a key using Redis-compatible counter semantics.
///
/// Missing keys are treated as zero and created. The keyspace is left untouched on any error.
fn mutate_counter_by(key: &[u8], delta: i64, keyspace: &mut Keyspace) -> CommandReply {
    let current = match keyspace.get(key) {
        Some(StoredValue::String(value)) => {
            let Some(current) = parse_signed(value) else {
                return CommandReply::error(NOT_AN_INTEGER);
            };
            current
        }
        Some(StoredValue::List(_)) => return CommandReply::wrong_type(),
        None => 0_i64,
    };

    let Some(next) = current.checked_add(delta) else {
        return CommandReply::error("increment or decrement would overflow");
    };

    let _ = keyspace.insert(key, StoredValue::String(next.to_string().into_bytes()));
    CommandReply::Integer(next)
}
