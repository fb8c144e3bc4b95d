//! Shared/exclusive key locks with blocking acquisition.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use kvtx_common::error::{KvError, KvResult};
use kvtx_common::ids::{BatchId, Key};
use kvtx_core::containers::{HotMap as HashMap, HotSet as HashSet};

/// Requested access for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockMode {
    /// Shared access; compatible with other readers.
    Read,
    /// Exclusive access.
    Write,
}

#[derive(Debug, Default)]
struct KeyLockState {
    /// Shared readers currently holding the key.
    readers: HashSet<BatchId>,
    /// Exclusive writer currently holding the key.
    writer: Option<BatchId>,
}

impl KeyLockState {
    fn can_grant(&self, owner: BatchId, mode: LockMode) -> bool {
        if self.writer.is_some_and(|writer| writer != owner) {
            return false;
        }
        match mode {
            LockMode::Read => true,
            LockMode::Write => self.readers.iter().all(|reader| *reader == owner),
        }
    }

    fn grant(&mut self, owner: BatchId, mode: LockMode) {
        match mode {
            LockMode::Read => {
                let _ = self.readers.insert(owner);
            }
            LockMode::Write => self.writer = Some(owner),
        }
    }

    fn release(&mut self, owner: BatchId) {
        if self.writer == Some(owner) {
            self.writer = None;
        }
        let _ = self.readers.remove(&owner);
    }

    fn is_free(&self) -> bool {
        self.writer.is_none() && self.readers.is_empty()
    }
}

/// Process-wide key lock table shared by every session.
///
/// Acquisition blocks the calling thread until the key is compatible with the request. Callers
/// must acquire multi-key sets in one global order; the table itself does not detect deadlocks.
#[derive(Debug, Default)]
pub struct KeyLockTable {
    locks: Mutex<HashMap<Key, KeyLockState>>,
    released: Condvar,
}

impl KeyLockTable {
    /// Blocks until `owner` holds `key` in `mode`.
    ///
    /// # Errors
    ///
    /// Returns `KvError::InvalidState` when the lock table mutex is poisoned.
    pub fn acquire(&self, owner: BatchId, key: &[u8], mode: LockMode) -> KvResult<()> {
        let locks = self.lock_state()?;
        let mut locks = self
            .released
            .wait_while(locks, |locks| {
                locks
                    .get(key)
                    .is_some_and(|state| !state.can_grant(owner, mode))
            })
            .map_err(|_| KvError::InvalidState("key lock table mutex is poisoned"))?;
        locks.entry(key.to_vec()).or_default().grant(owner, mode);
        Ok(())
    }

    /// Acquires every request in the given order, blocking on each key in turn.
    ///
    /// On failure, keys acquired by this call are released before returning.
    ///
    /// # Errors
    ///
    /// Returns `KvError::InvalidState` when the lock table mutex is poisoned.
    pub fn acquire_all(&self, owner: BatchId, requests: &[(Key, LockMode)]) -> KvResult<()> {
        for (index, (key, mode)) in requests.iter().enumerate() {
            if let Err(error) = self.acquire(owner, key, *mode) {
                self.release_all(owner, &requests[..index]);
                return Err(error);
            }
        }
        Ok(())
    }

    /// Releases every key in `requests` held by `owner` and wakes waiters.
    ///
    /// Release recovers a poisoned table so that it can run from `Drop`.
    pub fn release_all(&self, owner: BatchId, requests: &[(Key, LockMode)]) {
        if requests.is_empty() {
            return;
        }
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, _) in requests {
            let mut remove_state = false;
            if let Some(state) = locks.get_mut(key.as_slice()) {
                state.release(owner);
                remove_state = state.is_free();
            }
            if remove_state {
                let _ = locks.remove(key.as_slice());
            }
        }
        drop(locks);
        self.released.notify_all();
    }

    /// Returns whether any owner currently holds `key`.
    ///
    /// # Errors
    ///
    /// Returns `KvError::InvalidState` when the lock table mutex is poisoned.
    pub fn is_locked(&self, key: &[u8]) -> KvResult<bool> {
        Ok(self
            .lock_state()?
            .get(key)
            .is_some_and(|state| !state.is_free()))
    }

    fn lock_state(&self) -> KvResult<MutexGuard<'_, HashMap<Key, KeyLockState>>> {
        self.locks
            .lock()
            .map_err(|_| KvError::InvalidState("key lock table mutex is poisoned"))
    }
}
