//! Keyspace engine collaborators consumed by the transaction layer.
//!
//! The transaction engine only needs three things from here: a read-only command table that can
//! validate arity and report keys statically, an execution entry point that runs one command
//! under externally held locks, and undo capture for compensation.

pub mod command;
pub mod containers;
pub mod database;
pub mod dispatch;

pub use database::Database;
