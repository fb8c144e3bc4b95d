use kvtx_common::error::{KvError, KvResult};

use super::command_spec::{
    no_keys, read_all_keys, read_first_key, write_all_keys, write_even_position_keys,
    write_first_key, write_first_two_keys,
};
use super::handlers_counter::{handle_decr, handle_decrby, handle_incr, handle_incrby};
use super::handlers_keyspace::{
    handle_dbsize, handle_del, handle_exists, handle_flush, handle_rename, handle_type,
};
use super::handlers_list::{
    handle_llen, handle_lpop, handle_lpush, handle_lrange, handle_rpop, handle_rpush,
};
use super::handlers_string::{
    handle_append, handle_echo, handle_get, handle_getset, handle_mget, handle_mset, handle_ping,
    handle_set, handle_setnx, handle_strlen,
};
use super::undo::{snapshot_keys, undo_lpush, undo_rpush};
use super::{CommandArity, CommandHandler, CommandSpec, KeyAccess, Keyspace};
use crate::command::{CommandFrame, CommandReply};
use crate::containers::HotMap as HashMap;

/// Runtime command registry.
///
/// Read-only once built; the transaction engine shares one instance across sessions.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    entries: HashMap<String, CommandSpec>,
}

impl CommandRegistry {
    /// Builds an empty command registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Builds a registry preloaded with the builtin command set.
    #[must_use]
    pub fn with_builtin_commands() -> Self {
        let mut registry = Self::new();
        registry.register_connection_commands();
        registry.register_string_commands();
        registry.register_counter_commands();
        registry.register_keyspace_commands();
        registry.register_list_commands();
        registry
    }

    fn register_connection_commands(&mut self) {
        self.register(CommandSpec {
            name: "PING",
            arity: CommandArity::Between(0, 1),
            prepare: Some(no_keys),
            undo: None,
            handler: handle_ping,
        });
        self.register(CommandSpec {
            name: "ECHO",
            arity: CommandArity::Exact(1),
            prepare: Some(no_keys),
            undo: None,
            handler: handle_echo,
        });
    }

    fn register_string_commands(&mut self) {
        self.register(CommandSpec {
            name: "SET",
            arity: CommandArity::AtLeast(2),
            prepare: Some(write_first_key),
            undo: None,
            handler: handle_set,
        });
        self.register(CommandSpec {
            name: "SETNX",
            arity: CommandArity::Exact(2),
            prepare: Some(write_first_key),
            undo: None,
            handler: handle_setnx,
        });
        self.register(CommandSpec {
            name: "GET",
            arity: CommandArity::Exact(1),
            prepare: Some(read_first_key),
            undo: None,
            handler: handle_get,
        });
        self.register(CommandSpec {
            name: "GETSET",
            arity: CommandArity::Exact(2),
            prepare: Some(write_first_key),
            undo: None,
            handler: handle_getset,
        });
        self.register(CommandSpec {
            name: "APPEND",
            arity: CommandArity::Exact(2),
            prepare: Some(write_first_key),
            undo: None,
            handler: handle_append,
        });
        self.register(CommandSpec {
            name: "STRLEN",
            arity: CommandArity::Exact(1),
            prepare: Some(read_first_key),
            undo: None,
            handler: handle_strlen,
        });
        self.register(CommandSpec {
            name: "MSET",
            arity: CommandArity::Pairs(1),
            prepare: Some(write_even_position_keys),
            undo: None,
            handler: handle_mset,
        });
        self.register(CommandSpec {
            name: "MGET",
            arity: CommandArity::AtLeast(1),
            prepare: Some(read_all_keys),
            undo: None,
            handler: handle_mget,
        });
    }

    fn register_counter_commands(&mut self) {
        for (name, arity, handler) in [
            ("INCR", CommandArity::Exact(1), handle_incr as CommandHandler),
            ("DECR", CommandArity::Exact(1), handle_decr),
            ("INCRBY", CommandArity::Exact(2), handle_incrby),
            ("DECRBY", CommandArity::Exact(2), handle_decrby),
        ] {
            self.register(CommandSpec {
                name,
                arity,
                prepare: Some(write_first_key),
                undo: None,
                handler,
            });
        }
    }

    fn register_keyspace_commands(&mut self) {
        self.register(CommandSpec {
            name: "DEL",
            arity: CommandArity::AtLeast(1),
            prepare: Some(write_all_keys),
            undo: None,
            handler: handle_del,
        });
        self.register(CommandSpec {
            name: "EXISTS",
            arity: CommandArity::AtLeast(1),
            prepare: Some(read_all_keys),
            undo: None,
            handler: handle_exists,
        });
        self.register(CommandSpec {
            name: "TYPE",
            arity: CommandArity::Exact(1),
            prepare: Some(read_first_key),
            undo: None,
            handler: handle_type,
        });
        self.register(CommandSpec {
            name: "RENAME",
            arity: CommandArity::Exact(2),
            prepare: Some(write_first_two_keys),
            undo: None,
            handler: handle_rename,
        });
        // Whole-keyspace commands cannot enumerate their keys, so they carry no prepare step.
        self.register(CommandSpec {
            name: "DBSIZE",
            arity: CommandArity::Exact(0),
            prepare: None,
            undo: None,
            handler: handle_dbsize,
        });
        self.register(CommandSpec {
            name: "FLUSHDB",
            arity: CommandArity::Exact(0),
            prepare: None,
            undo: None,
            handler: handle_flush,
        });
        self.register(CommandSpec {
            name: "FLUSHALL",
            arity: CommandArity::Exact(0),
            prepare: None,
            undo: None,
            handler: handle_flush,
        });
    }

    fn register_list_commands(&mut self) {
        self.register(CommandSpec {
            name: "LPUSH",
            arity: CommandArity::AtLeast(2),
            prepare: Some(write_first_key),
            undo: Some(undo_lpush),
            handler: handle_lpush,
        });
        self.register(CommandSpec {
            name: "RPUSH",
            arity: CommandArity::AtLeast(2),
            prepare: Some(write_first_key),
            undo: Some(undo_rpush),
            handler: handle_rpush,
        });
        self.register(CommandSpec {
            name: "LPOP",
            arity: CommandArity::Between(1, 2),
            prepare: Some(write_first_key),
            undo: None,
            handler: handle_lpop,
        });
        self.register(CommandSpec {
            name: "RPOP",
            arity: CommandArity::Between(1, 2),
            prepare: Some(write_first_key),
            undo: None,
            handler: handle_rpop,
        });
        self.register(CommandSpec {
            name: "LLEN",
            arity: CommandArity::Exact(1),
            prepare: Some(read_first_key),
            undo: None,
            handler: handle_llen,
        });
        self.register(CommandSpec {
            name: "LRANGE",
            arity: CommandArity::Exact(3),
            prepare: Some(read_first_key),
            undo: None,
            handler: handle_lrange,
        });
    }

    /// Registers or replaces one command in the table.
    pub fn register(&mut self, spec: CommandSpec) {
        let _ = self.entries.insert(spec.name.to_owned(), spec);
    }

    /// Looks up a command by name, case-insensitively.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.entries.get(&name.to_ascii_uppercase())
    }

    /// Validates command existence and arity without executing handler logic.
    ///
    /// # Errors
    ///
    /// Returns `KvError::UnknownCommand` for names missing from the table and
    /// `KvError::WrongArity` for an argument count the command does not accept.
    pub fn validate_frame(&self, frame: &CommandFrame) -> KvResult<&CommandSpec> {
        let Some(spec) = self.lookup(&frame.name) else {
            return Err(KvError::UnknownCommand(frame.name.to_ascii_lowercase()));
        };
        if !spec.arity.accepts(frame.args.len()) {
            return Err(KvError::WrongArity(frame.name.to_ascii_lowercase()));
        }
        Ok(spec)
    }

    /// Runs the command's static key analysis.
    ///
    /// Returns `None` when the command is unknown or has no prepare step.
    #[must_use]
    pub fn prepare(&self, frame: &CommandFrame) -> Option<KeyAccess> {
        let prepare = self.lookup(&frame.name)?.prepare?;
        Some(prepare(&frame.args))
    }

    /// Builds the compensating command lines for `frame` against the current keyspace state.
    ///
    /// Commands with a custom undo step use it; everything else snapshots its write keys.
    /// Read-only and unknown commands yield an empty list.
    #[must_use]
    pub fn undo_lines(&self, frame: &CommandFrame, keyspace: &Keyspace) -> Vec<CommandFrame> {
        let Some(spec) = self.lookup(&frame.name) else {
            return Vec::new();
        };
        if let Some(undo) = spec.undo {
            return undo(&frame.args, keyspace);
        }
        let Some(prepare) = spec.prepare else {
            return Vec::new();
        };
        let access = prepare(&frame.args);
        snapshot_keys(&access.write_keys, keyspace)
    }

    /// Dispatches one canonical command frame to its registered handler.
    #[must_use]
    pub fn dispatch(&self, frame: &CommandFrame, keyspace: &mut Keyspace) -> CommandReply {
        match self.validate_frame(frame) {
            Ok(spec) => (spec.handler)(frame, keyspace),
            Err(error) => CommandReply::from(error),
        }
    }
}
