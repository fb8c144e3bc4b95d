use super::Keyspace;
use crate::command::{CommandFrame, CommandReply};

pub(super) fn handle_del(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let deleted = frame
        .args
        .iter()
        .filter(|key| keyspace.remove(key).is_some())
        .count();
    CommandReply::Integer(i64::try_from(deleted).unwrap_or(i64::MAX))
}

pub(super) fn handle_exists(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let existing = frame
        .args
        .iter()
        .filter(|key| keyspace.contains_key(key))
        .count();
    CommandReply::Integer(i64::try_from(existing).unwrap_or(i64::MAX))
}

pub(super) fn handle_type(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let name = keyspace
        .get(&frame.args[0])
        .map_or("none", |value| value.type_name());
    CommandReply::SimpleString(name.to_owned())
}

pub(super) fn handle_rename(frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    let source = &frame.args[0];
    let destination = &frame.args[1];
    let Some(value) = keyspace.remove(source) else {
        return CommandReply::error("no such key");
    };
    let _ = keyspace.insert(destination, value);
    CommandReply::ok()
}

pub(super) fn handle_dbsize(_frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    CommandReply::Integer(i64::try_from(keyspace.len()).unwrap_or(i64::MAX))
}

pub(super) fn handle_flush(_frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
    keyspace.clear();
    CommandReply::ok()
}
