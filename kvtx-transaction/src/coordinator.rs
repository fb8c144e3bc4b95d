//! Batch-wide lock acquisition over a planned key set.
//!
//! Every batch requests its keys in one global order (lexicographic by key bytes), so two
//! overlapping batches can never wait on each other in opposite directions. Locks are held by a
//! guard and released when the guard drops, on success and abort alike.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kvtx_common::error::KvResult;
use kvtx_common::ids::{BatchId, Key};
use kvtx_core::containers::HotMap as HashMap;
use kvtx_core::dispatch::KeyAccess;

use crate::lock_table::{KeyLockTable, LockMode};

/// Owns the shared key lock table plus the whole-keyspace barrier.
///
/// Key-locked batches hold the barrier in shared mode. Commands that cannot report their keys
/// take it exclusively and therefore run alone.
#[derive(Debug, Default)]
pub struct LockCoordinator {
    table: KeyLockTable,
    barrier: RwLock<()>,
}

impl LockCoordinator {
    /// Blocks until `batch_id` holds every key in `access`.
    ///
    /// A key named in both lists is taken in write mode only.
    ///
    /// # Errors
    ///
    /// Returns `KvError::InvalidState` when the lock table mutex is poisoned.
    pub fn acquire_for_batch(
        &self,
        batch_id: BatchId,
        access: &KeyAccess,
    ) -> KvResult<BatchLocks<'_>> {
        let requests = ordered_lock_requests(access);
        let barrier = self.barrier.read().unwrap_or_else(PoisonError::into_inner);
        self.table.acquire_all(batch_id, &requests)?;
        tracing::debug!(
            batch = batch_id,
            keys = requests.len(),
            "acquired batch key locks"
        );
        Ok(BatchLocks {
            table: &self.table,
            batch_id,
            requests,
            _barrier: barrier,
        })
    }

    /// Blocks until no key-locked batch is running and keeps new ones out.
    #[must_use]
    pub fn acquire_exclusive(&self) -> ExclusiveLock<'_> {
        let barrier = self.barrier.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!("acquired keyspace-wide lock");
        ExclusiveLock { _barrier: barrier }
    }

    /// Returns whether any batch currently holds `key`.
    ///
    /// # Errors
    ///
    /// Returns `KvError::InvalidState` when the lock table mutex is poisoned.
    pub fn is_locked(&self, key: &[u8]) -> KvResult<bool> {
        self.table.is_locked(key)
    }
}

/// Key locks held by one batch. Dropping the guard releases them.
#[derive(Debug)]
#[must_use = "locks are released as soon as the guard is dropped"]
pub struct BatchLocks<'a> {
    table: &'a KeyLockTable,
    batch_id: BatchId,
    requests: Vec<(Key, LockMode)>,
    _barrier: RwLockReadGuard<'a, ()>,
}

impl BatchLocks<'_> {
    /// Returns the lock owner id.
    #[must_use]
    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// Returns the deduplicated requests in acquisition order.
    #[must_use]
    pub fn requests(&self) -> &[(Key, LockMode)] {
        &self.requests
    }
}

impl Drop for BatchLocks<'_> {
    fn drop(&mut self) {
        self.table.release_all(self.batch_id, &self.requests);
        tracing::debug!(
            batch = self.batch_id,
            keys = self.requests.len(),
            "released batch key locks"
        );
    }
}

/// Keyspace-wide exclusive access. Dropping the guard releases it.
#[derive(Debug)]
#[must_use = "the keyspace lock is released as soon as the guard is dropped"]
pub struct ExclusiveLock<'a> {
    _barrier: RwLockWriteGuard<'a, ()>,
}

/// Deduplicates `access` into sorted lock requests where write supersedes read.
#[must_use]
pub fn ordered_lock_requests(access: &KeyAccess) -> Vec<(Key, LockMode)> {
    let mut by_key = HashMap::<&[u8], LockMode>::new();
    for key in &access.read_keys {
        let _ = by_key.entry(key.as_slice()).or_insert(LockMode::Read);
    }
    for key in &access.write_keys {
        let _ = by_key.insert(key.as_slice(), LockMode::Write);
    }

    let mut requests = by_key
        .into_iter()
        .map(|(key, mode)| (key.to_vec(), mode))
        .collect::<Vec<_>>();
    requests.sort_unstable_by(|(left, _), (right, _)| left.cmp(right));
    requests
}
