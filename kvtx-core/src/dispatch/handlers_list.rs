use std::collections::VecDeque;

use super::parse_numbers::{parse_count, parse_signed, resolve_inclusive_range};
use super::{Keyspace, StoredValue};
use crate::command::{CommandFrame, CommandReply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListEnd {
    Head,
    Tail,
}

pub(super) fn handle_lpush(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    push_values(frame, ListEnd::Head, keyspace)
}

pub(super) fn handle_rpush(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    push_values(frame, ListEnd::Tail, keyspace)
}

pub(super) fn handle_lpop(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    pop_values(frame, ListEnd::Head, keyspace)
}

pub(super) fn handle_rpop(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    pop_values(frame, ListEnd::Tail, keyspace)
}

pub(super) fn handle_llen(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    match keyspace.get(&frame.args[0]) {
        Some(StoredValue::List(items)) => {
            CommandReply::Integer(i64::try_from(items.len()).unwrap_or(i64::MAX))
        }
        Some(StoredValue::String(_)) => CommandReply::wrong_type(),
        None => CommandReply::Integer(0),
    }
}

pub(super) fn handle_lrange(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let (Some(start), Some(end)) = (parse_signed(&frame.args[1]), parse_signed(&frame.args[2]))
    else {
        return CommandReply::error("value is not an integer or out of range");
    };

    let items = match keyspace.get(&frame.args[0]) {
        Some(StoredValue::List(items)) => items,
        Some(StoredValue::String(_)) => return CommandReply::wrong_type(),
        None => return CommandReply::Array(Vec::new()),
    };
    let Some((start_index, end_index)) = resolve_inclusive_range(start, end, items.len()) else {
        return CommandReply::Array(Vec::new());
    };
    CommandReply::Array(
        items
            .range(start_index..=end_index)
            .cloned()
            .map(CommandReply::BulkString)
            .collect(),
    )
}

fn push_values(frame: &CommandFrame, end: ListEnd, keyspace: &mut Keyspace) -> CommandReply {
    let key = &frame.args[0];
    let values = &frame.args[1..];

    if !keyspace.contains_key(key) {
        let _ = keyspace.insert(key, StoredValue::List(VecDeque::new()));
    }
    let Some(StoredValue::List(items)) = keyspace.get_mut(key) else {
        return CommandReply::wrong_type();
    };
    for value in values {
        match end {
            ListEnd::Head => items.push_front(value.clone()),
            ListEnd::Tail => items.push_back(value.clone()),
        }
    }
    CommandReply::Integer(i64::try_from(items.len()).unwrap_or(i64::MAX))
}

fn pop_values(frame: &CommandFrame, end: ListEnd, keyspace: &mut Keyspace) -> CommandReply {
    let key = &frame.args[0];
    let count = match frame.args.get(1).map(|raw| parse_count(raw)) {
        Some(None) => return CommandReply::error("value is out of range, must be positive"),
        Some(count) => count,
        None => None,
    };

    let items = match keyspace.get_mut(key) {
        Some(StoredValue::List(items)) => items,
        Some(StoredValue::String(_)) => return CommandReply::wrong_type(),
        None => return CommandReply::Null,
    };

    let mut pop_one = || match end {
        ListEnd::Head => items.pop_front(),
        ListEnd::Tail => items.pop_back(),
    };
    let reply = match count {
        None => pop_one().map_or(CommandReply::Null, CommandReply::BulkString),
        Some(count) => CommandReply::Array(
            std::iter::from_fn(pop_one)
                .take(count)
                .map(CommandReply::BulkString)
                .collect(),
        ),
    };
    keyspace.remove_if_empty_list(key);
    reply
}
