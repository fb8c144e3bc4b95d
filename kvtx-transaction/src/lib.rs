//! `MULTI`/`EXEC` command batching over the shared keyspace.
//!
//! A session stages admitted commands; `EXEC` plans their key sets, locks the union in one global
//! order, runs the batch sequentially and compensates applied commands from an undo log when one
//! of them fails.

pub mod admission;
pub mod coordinator;
pub mod engine;
pub mod executor;
pub mod lock_table;
pub mod plan;
pub mod session;

pub use engine::TransactionEngine;
pub use executor::{BatchOutcome, BatchPhase};
pub use session::TransactionSession;
