use super::{CommandArity, CommandRegistry, KeyAccess, Keyspace, StoredValue};
use crate::command::{CommandFrame, CommandReply};
use kvtx_common::error::KvError;
use googletest::prelude::*;
use rstest::rstest;

fn frame(parts: &[&[u8]]) -> CommandFrame {
    let name = String::from_utf8(parts[0].to_vec()).expect("command name is utf-8");
    CommandFrame::new(name, parts[1..].iter().map(|part| part.to_vec()).collect())
}

fn run(registry: &CommandRegistry, keyspace: &mut Keyspace, parts: &[&[u8]]) -> CommandReply {
    registry.dispatch(&frame(parts), keyspace)
}

#[rstest]
#[case(CommandArity::Exact(2), 2, true)]
#[case(CommandArity::Exact(2), 3, false)]
#[case(CommandArity::AtLeast(1), 0, false)]
#[case(CommandArity::AtLeast(1), 7, true)]
#[case(CommandArity::Between(1, 2), 2, true)]
#[case(CommandArity::Between(1, 2), 3, false)]
#[case(CommandArity::Pairs(1), 0, false)]
#[case(CommandArity::Pairs(1), 3, false)]
#[case(CommandArity::Pairs(1), 4, true)]
fn arity_rule_accepts_expected_counts(
    #[case] arity: CommandArity,
    #[case] argc: usize,
    #[case] expected: bool,
) {
    assert_that!(arity.accepts(argc), eq(expected));
}

#[rstest]
fn lookup_is_case_insensitive() {
    let registry = CommandRegistry::with_builtin_commands();
    assert_that!(registry.lookup("set").map(|spec| spec.name), eq(Some("SET")));
    assert_that!(registry.lookup("lPuSh").map(|spec| spec.name), eq(Some("LPUSH")));
    assert_that!(registry.lookup("nope").is_none(), eq(true));
}

#[rstest]
fn validate_frame_reports_unknown_and_wrong_arity() {
    let registry = CommandRegistry::with_builtin_commands();

    let unknown = registry
        .validate_frame(&frame(&[b"NOPE", b"x"]))
        .map(|spec| spec.name);
    assert_that!(
        &unknown,
        eq(&Err::<&str, _>(KvError::UnknownCommand("nope".to_owned())))
    );

    let arity = registry
        .validate_frame(&frame(&[b"GET"]))
        .map(|spec| spec.name);
    assert_that!(
        &arity,
        eq(&Err::<&str, _>(KvError::WrongArity("get".to_owned())))
    );
}

#[rstest]
#[case(&[b"SET".as_slice(), b"k", b"v"], vec![b"k".to_vec()], vec![])]
#[case(&[b"GET".as_slice(), b"k"], vec![], vec![b"k".to_vec()])]
#[case(&[b"MSET".as_slice(), b"a", b"1", b"b", b"2"], vec![b"a".to_vec(), b"b".to_vec()], vec![])]
#[case(&[b"MGET".as_slice(), b"a", b"b", b"a"], vec![], vec![b"a".to_vec(), b"b".to_vec(), b"a".to_vec()])]
#[case(&[b"RENAME".as_slice(), b"src", b"dst"], vec![b"src".to_vec(), b"dst".to_vec()], vec![])]
#[case(&[b"PING".as_slice()], vec![], vec![])]
fn prepare_reports_write_and_read_keys(
    #[case] parts: &[&[u8]],
    #[case] write_keys: Vec<Vec<u8>>,
    #[case] read_keys: Vec<Vec<u8>>,
) {
    let registry = CommandRegistry::with_builtin_commands();
    assert_that!(
        &registry.prepare(&frame(parts)),
        eq(&Some(KeyAccess {
            write_keys,
            read_keys
        }))
    );
}

#[rstest]
fn prepare_is_absent_for_whole_keyspace_commands() {
    let registry = CommandRegistry::with_builtin_commands();
    assert_that!(registry.prepare(&frame(&[b"DBSIZE"])).is_none(), eq(true));
    assert_that!(registry.prepare(&frame(&[b"FLUSHDB"])).is_none(), eq(true));
}

#[rstest]
fn string_commands_round_trip_through_keyspace() {
    let registry = CommandRegistry::with_builtin_commands();
    let mut keyspace = Keyspace::default();

    assert_that!(
        &run(&registry, &mut keyspace, &[b"SET", b"k", b"v"]),
        eq(&CommandReply::ok())
    );
    assert_that!(
        &run(&registry, &mut keyspace, &[b"SET", b"k", b"other", b"NX"]),
        eq(&CommandReply::Null)
    );
    assert_that!(
        &run(&registry, &mut keyspace, &[b"APPEND", b"k", b"!"]),
        eq(&CommandReply::Integer(2))
    );
    assert_that!(
        &run(&registry, &mut keyspace, &[b"GETSET", b"k", b"next"]),
        eq(&CommandReply::BulkString(b"v!".to_vec()))
    );
    assert_that!(
        &run(&registry, &mut keyspace, &[b"MGET", b"k", b"missing"]),
        eq(&CommandReply::Array(vec![
            CommandReply::BulkString(b"next".to_vec()),
            CommandReply::Null,
        ]))
    );
}

#[rstest]
fn counter_rejects_non_integer_without_mutation() {
    let registry = CommandRegistry::with_builtin_commands();
    let mut keyspace = Keyspace::default();

    let _ = run(&registry, &mut keyspace, &[b"SET", b"n", b"abc"]);
    let reply = run(&registry, &mut keyspace, &[b"INCR", b"n"]);
    assert_that!(reply.is_error(), eq(true));
    assert_that!(
        keyspace.get(b"n"),
        eq(Some(&StoredValue::String(b"abc".to_vec())))
    );

    assert_that!(
        &run(&registry, &mut keyspace, &[b"DECRBY", b"fresh", b"5"]),
        eq(&CommandReply::Integer(-5))
    );
}

#[rstest]
fn list_push_on_string_key_is_wrongtype() {
    let registry = CommandRegistry::with_builtin_commands();
    let mut keyspace = Keyspace::default();

    let _ = run(&registry, &mut keyspace, &[b"SET", b"a", b"1"]);
    let reply = run(&registry, &mut keyspace, &[b"LPUSH", b"a", b"x"]);
    assert_that!(&reply, eq(&CommandReply::wrong_type()));
    assert_that!(
        keyspace.get(b"a"),
        eq(Some(&StoredValue::String(b"1".to_vec())))
    );
}

#[rstest]
fn list_commands_follow_redis_ordering() {
    let registry = CommandRegistry::with_builtin_commands();
    let mut keyspace = Keyspace::default();

    assert_that!(
        &run(&registry, &mut keyspace, &[b"RPUSH", b"l", b"a", b"b"]),
        eq(&CommandReply::Integer(2))
    );
    assert_that!(
        &run(&registry, &mut keyspace, &[b"LPUSH", b"l", b"z"]),
        eq(&CommandReply::Integer(3))
    );
    assert_that!(
        &run(&registry, &mut keyspace, &[b"LRANGE", b"l", b"0", b"-1"]),
        eq(&CommandReply::Array(vec![
            CommandReply::BulkString(b"z".to_vec()),
            CommandReply::BulkString(b"a".to_vec()),
            CommandReply::BulkString(b"b".to_vec()),
        ]))
    );
    assert_that!(
        &run(&registry, &mut keyspace, &[b"RPOP", b"l", b"2"]),
        eq(&CommandReply::Array(vec![
            CommandReply::BulkString(b"b".to_vec()),
            CommandReply::BulkString(b"a".to_vec()),
        ]))
    );
    assert_that!(
        &run(&registry, &mut keyspace, &[b"LPOP", b"l"]),
        eq(&CommandReply::BulkString(b"z".to_vec()))
    );
    assert_that!(keyspace.contains_key(b"l"), eq(false));
}

#[rstest]
fn undo_lines_snapshot_write_keys_before_execution() {
    let registry = CommandRegistry::with_builtin_commands();
    let mut keyspace = Keyspace::default();
    let _ = run(&registry, &mut keyspace, &[b"SET", b"a", b"old"]);
    let _ = run(&registry, &mut keyspace, &[b"RPUSH", b"l", b"x", b"y"]);

    let undo = registry.undo_lines(&frame(&[b"MSET", b"a", b"1", b"b", b"2"]), &keyspace);
    assert_that!(
        &undo,
        eq(&vec![
            frame(&[b"SET", b"a", b"old"]),
            frame(&[b"DEL", b"b"]),
        ])
    );

    let undo = registry.undo_lines(&frame(&[b"DEL", b"l"]), &keyspace);
    assert_that!(
        &undo,
        eq(&vec![frame(&[b"DEL", b"l"]), frame(&[b"RPUSH", b"l", b"x", b"y"])])
    );

    let undo = registry.undo_lines(&frame(&[b"GET", b"a"]), &keyspace);
    assert_that!(undo.is_empty(), eq(true));
}

#[rstest]
fn push_undo_pops_the_same_number_of_elements() {
    let registry = CommandRegistry::with_builtin_commands();
    let mut keyspace = Keyspace::default();

    let undo = registry.undo_lines(&frame(&[b"LPUSH", b"l", b"a"]), &keyspace);
    assert_that!(&undo, eq(&vec![frame(&[b"DEL", b"l"])]));

    let _ = run(&registry, &mut keyspace, &[b"RPUSH", b"l", b"base"]);
    let push = frame(&[b"LPUSH", b"l", b"a", b"b"]);
    let undo = registry.undo_lines(&push, &keyspace);
    assert_that!(&undo, eq(&vec![frame(&[b"LPOP", b"l", b"2"])]));

    let _ = registry.dispatch(&push, &mut keyspace);
    for line in &undo {
        let _ = registry.dispatch(line, &mut keyspace);
    }
    assert_that!(
        &run(&registry, &mut keyspace, &[b"LRANGE", b"l", b"0", b"-1"]),
        eq(&CommandReply::Array(vec![CommandReply::BulkString(
            b"base".to_vec()
        )]))
    );
}

#[rstest]
fn rename_undo_restores_both_sides() {
    let registry = CommandRegistry::with_builtin_commands();
    let mut keyspace = Keyspace::default();
    let _ = run(&registry, &mut keyspace, &[b"SET", b"src", b"v"]);
    let before = keyspace.clone();

    let rename = frame(&[b"RENAME", b"src", b"dst"]);
    let undo = registry.undo_lines(&rename, &keyspace);
    assert_that!(&registry.dispatch(&rename, &mut keyspace), eq(&CommandReply::ok()));
    for line in &undo {
        assert_that!(registry.dispatch(line, &mut keyspace).is_error(), eq(false));
    }
    assert_that!(&keyspace, eq(&before));
}

#[rstest]
fn flush_clears_every_key() {
    let registry = CommandRegistry::with_builtin_commands();
    let mut keyspace = Keyspace::default();
    let _ = run(&registry, &mut keyspace, &[b"MSET", b"a", b"1", b"b", b"2"]);
    assert_that!(
        &run(&registry, &mut keyspace, &[b"DBSIZE"]),
        eq(&CommandReply::Integer(2))
    );
    assert_that!(&run(&registry, &mut keyspace, &[b"FLUSHDB"]), eq(&CommandReply::ok()));
    assert_that!(keyspace.is_empty(), eq(true));
}

#[rstest]
fn mset_with_dangling_key_is_an_arity_error() {
    let registry = CommandRegistry::with_builtin_commands();
    let mut keyspace = Keyspace::default();
    let reply = run(&registry, &mut keyspace, &[b"MSET", b"a", b"1", b"b"]);
    assert_that!(
        &reply,
        eq(&CommandReply::from(KvError::WrongArity("mset".to_owned())))
    );
    assert_that!(keyspace.is_empty(), eq(true));
}
