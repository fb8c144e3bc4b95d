//! Canonical identifier types used by sessions, batches and the lock table.

/// Client session identifier assigned by the connection layer.
pub type SessionId = u64;

/// Monotonic batch identifier allocated once per `EXEC` or locked single command.
pub type BatchId = u64;

/// Owned key bytes as stored in the keyspace and lock table.
pub type Key = Vec<u8>;

/// Bounded staging capacity for one session queue.
///
/// Zero is not a meaningful cap: a transaction that can hold no commands is indistinguishable
/// from a disabled feature, so it is rejected at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueCapacity(usize);

impl QueueCapacity {
    /// Creates a validated queue capacity.
    ///
    /// Returns `None` for zero.
    #[must_use]
    pub fn new(value: usize) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    /// Returns the inner capacity.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}
