//! Command registration and dispatch.
//!
//! Protocol parsing produces a canonical command frame, then a registry resolves the matching
//! entry. Each entry carries its arity rule, a static key analysis used for lock planning, an
//! optional custom undo step, and the handler that mutates the keyspace.

use crate::command::{CommandFrame, CommandReply};

#[path = "dispatch/parse_numbers.rs"]
mod parse_numbers;
#[path = "dispatch/command_spec.rs"]
mod command_spec;
#[path = "dispatch/state.rs"]
mod state;
#[path = "dispatch/handlers_string.rs"]
mod handlers_string;
#[path = "dispatch/handlers_counter.rs"]
mod handlers_counter;
#[path = "dispatch/handlers_keyspace.rs"]
mod handlers_keyspace;
#[path = "dispatch/handlers_list.rs"]
mod handlers_list;
#[path = "dispatch/undo.rs"]
mod undo;
#[path = "dispatch/registry.rs"]
mod registry;

pub use command_spec::{CommandArity, CommandSpec, KeyAccess, PrepareFn, UndoFn};
pub use registry::CommandRegistry;
pub use state::{Keyspace, StoredValue};

/// Handler function signature used by command registry entries.
pub type CommandHandler = fn(&CommandFrame, &mut Keyspace) -> CommandReply;

#[cfg(test)]
#[path = "dispatch/tests.rs"]
mod tests;
