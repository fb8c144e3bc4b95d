use super::{Keyspace, StoredValue};
use crate::command::{CommandFrame, CommandReply};

pub(super) fn handle_ping(frame: &CommandFrame, _keyspace: &mut Keyspace) -> CommandReply {
    match frame.args.first() {
        Some(message) => CommandReply::BulkString(message.clone()),
        None => CommandReply::SimpleString("PONG".to_owned()),
    }
}

pub(super) fn handle_echo(frame: &CommandFrame, _keyspace: &mut Keyspace) -> CommandReply {
    CommandReply::BulkString(frame.args[0].clone())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetCondition {
    Always,
    IfMissing,
    IfExists,
}

fn parse_set_condition(options: &[Vec<u8>]) -> Result<SetCondition, CommandReply> {
    let mut condition = SetCondition::Always;
    for option in options {
        let next = if option.eq_ignore_ascii_case(b"NX") {
            SetCondition::IfMissing
        } else if option.eq_ignore_ascii_case(b"XX") {
            SetCondition::IfExists
        } else {
            return Err(CommandReply::error("syntax error"));
        };
        if condition != SetCondition::Always && condition != next {
            return Err(CommandReply::error("syntax error"));
        }
        condition = next;
    }
    Ok(condition)
}

pub(super) fn handle_set(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let key = &frame.args[0];
    let value = frame.args[1].clone();
    let condition = match parse_set_condition(&frame.args[2..]) {
        Ok(condition) => condition,
        Err(reply) => return reply,
    };

    let exists = keyspace.contains_key(key);
    let allowed = match condition {
        SetCondition::Always => true,
        SetCondition::IfMissing => !exists,
        SetCondition::IfExists => exists,
    };
    if !allowed {
        return CommandReply::Null;
    }

    let _ = keyspace.insert(key, StoredValue::String(value));
    CommandReply::ok()
}

pub(super) fn handle_setnx(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let key = &frame.args[0];
    if keyspace.contains_key(key) {
        return CommandReply::Integer(0);
    }
    let _ = keyspace.insert(key, StoredValue::String(frame.args[1].clone()));
    CommandReply::Integer(1)
}

pub(super) fn handle_get(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    match keyspace.get(&frame.args[0]) {
        Some(StoredValue::String(value)) => CommandReply::BulkString(value.clone()),
        Some(StoredValue::List(_)) => CommandReply::wrong_type(),
        None => CommandReply::Null,
    }
}

pub(super) fn handle_getset(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let key = &frame.args[0];
    let previous = match keyspace.get(key) {
        Some(StoredValue::String(value)) => CommandReply::BulkString(value.clone()),
        Some(StoredValue::List(_)) => return CommandReply::wrong_type(),
        None => CommandReply::Null,
    };
    let _ = keyspace.insert(key, StoredValue::String(frame.args[1].clone()));
    previous
}

pub(super) fn handle_append(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let key = &frame.args[0];
    let suffix = &frame.args[1];
    let length = match keyspace.get_mut(key) {
        Some(StoredValue::String(value)) => {
            value.extend_from_slice(suffix);
            value.len()
        }
        Some(StoredValue::List(_)) => return CommandReply::wrong_type(),
        None => {
            let _ = keyspace.insert(key, StoredValue::String(suffix.clone()));
            suffix.len()
        }
    };
    CommandReply::Integer(i64::try_from(length).unwrap_or(i64::MAX))
}

pub(super) fn handle_strlen(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let length = match keyspace.get(&frame.args[0]) {
        Some(StoredValue::String(value)) => value.len(),
        Some(StoredValue::List(_)) => return CommandReply::wrong_type(),
        None => 0_usize,
    };
    CommandReply::Integer(i64::try_from(length).unwrap_or(i64::MAX))
}

/// Arity guarantees a non-empty, even argument list.
pub(super) fn handle_mset(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    for pair in frame.args.chunks_exact(2) {
        let _ = keyspace.insert(&pair[0], StoredValue::String(pair[1].clone()));
    }
    CommandReply::ok()
}

pub(super) fn handle_mget(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let values = frame
        .args
        .iter()
        .map(|key| match keyspace.get(key) {
            Some(StoredValue::String(value)) => CommandReply::BulkString(value.clone()),
            _ => CommandReply::Null,
        })
        .collect();
    CommandReply::Array(values)
}
