use kvtx_common::ids::Key;

use super::{CommandHandler, Keyspace};
use crate::command::CommandFrame;

/// Static key analysis callback: maps argument tokens to the keys a command writes and reads.
///
/// Implementations must not touch the keyspace; they run before any lock is held.
pub type PrepareFn = fn(&[Vec<u8>]) -> KeyAccess;

/// Compensation callback: given argument tokens and the keyspace state right before the command
/// runs, returns the command lines that restore that state.
pub type UndoFn = fn(&[Vec<u8>], &Keyspace) -> Vec<CommandFrame>;

/// Arity constraints for a command, counted without the command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandArity {
    /// Command must have exactly this many arguments.
    Exact(usize),
    /// Command must have at least this many arguments.
    AtLeast(usize),
    /// Command must have between `min` and `max` arguments, both inclusive.
    Between(usize, usize),
    /// Command takes key/value pairs: an even count of at least `2 * min_pairs` arguments.
    Pairs(usize),
}

impl CommandArity {
    /// Returns whether `argc` arguments satisfy this rule.
    #[must_use]
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            Self::Exact(expected) => argc == expected,
            Self::AtLeast(minimum) => argc >= minimum,
            Self::Between(minimum, maximum) => (minimum..=maximum).contains(&argc),
            Self::Pairs(min_pairs) => {
                argc >= min_pairs.saturating_mul(2) && argc.is_multiple_of(2)
            }
        }
    }
}

/// Write and read key lists reported by one command, or accumulated over a batch.
///
/// Both lists may contain duplicates; deduplication belongs to the lock coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyAccess {
    /// Keys the command may modify.
    pub write_keys: Vec<Key>,
    /// Keys the command only observes.
    pub read_keys: Vec<Key>,
}

impl KeyAccess {
    /// Appends another access set, preserving order and duplicates.
    pub fn extend(&mut self, other: KeyAccess) {
        self.write_keys.extend(other.write_keys);
        self.read_keys.extend(other.read_keys);
    }

    /// Returns whether neither list holds a key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.write_keys.is_empty() && self.read_keys.is_empty()
    }
}

/// Metadata and callbacks for one command table entry.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Canonical uppercase command name.
    pub name: &'static str,
    /// Arity constraint used for lightweight input validation.
    pub arity: CommandArity,
    /// Key analysis. `None` marks the command as ineligible for transactional batching.
    pub prepare: Option<PrepareFn>,
    /// Custom compensation. `None` falls back to snapshotting every write key.
    pub undo: Option<UndoFn>,
    /// Handler callback.
    pub handler: CommandHandler,
}

pub(super) fn no_keys(_args: &[Vec<u8>]) -> KeyAccess {
    KeyAccess::default()
}

pub(super) fn write_first_key(args: &[Vec<u8>]) -> KeyAccess {
    KeyAccess {
        write_keys: args.first().cloned().into_iter().collect(),
        read_keys: Vec::new(),
    }
}

pub(super) fn read_first_key(args: &[Vec<u8>]) -> KeyAccess {
    KeyAccess {
        write_keys: Vec::new(),
        read_keys: args.first().cloned().into_iter().collect(),
    }
}

pub(super) fn write_all_keys(args: &[Vec<u8>]) -> KeyAccess {
    KeyAccess {
        write_keys: args.to_vec(),
        read_keys: Vec::new(),
    }
}

pub(super) fn read_all_keys(args: &[Vec<u8>]) -> KeyAccess {
    KeyAccess {
        write_keys: Vec::new(),
        read_keys: args.to_vec(),
    }
}

/// Keys sit at even positions of `key value [key value ...]` argument lists.
pub(super) fn write_even_position_keys(args: &[Vec<u8>]) -> KeyAccess {
    KeyAccess {
        write_keys: args.iter().step_by(2).cloned().collect(),
        read_keys: Vec::new(),
    }
}

pub(super) fn write_first_two_keys(args: &[Vec<u8>]) -> KeyAccess {
    KeyAccess {
        write_keys: args.iter().take(2).cloned().collect(),
        read_keys: Vec::new(),
    }
}
