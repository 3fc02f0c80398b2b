//! Per-asset mutual exclusion.
//!
//! Two uploads for the same asset would otherwise race on the record's
//! read-modify-write and the slower one would overwrite the faster one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as TableMutex, MutexGuard as TableGuard};

use tokio::sync::{Mutex, OwnedMutexGuard};

use tubely_models::AssetId;

/// Table of per-asset locks. Cloning shares the table.
///
/// The table sits behind a blocking mutex that is never held across an
/// `.await`.
#[derive(Clone, Default)]
pub struct AssetLocks {
    locks: Arc<TableMutex<HashMap<AssetId, Arc<Mutex<()>>>>>,
}

/// Held for the duration of one operation on an asset.
pub struct AssetLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    asset_id: AssetId,
    locks: AssetLocks,
}

impl AssetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> TableGuard<'_, HashMap<AssetId, Arc<Mutex<()>>>> {
        // A panic while holding the table cannot leave the map inconsistent
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait for exclusive access to `asset_id`.
    pub async fn acquire(&self, asset_id: AssetId) -> AssetLockGuard {
        let lock = self.table().entry(asset_id).or_default().clone();

        AssetLockGuard {
            guard: Some(lock.lock_owned().await),
            asset_id,
            locks: self.clone(),
        }
    }

    /// Number of assets with a live lock entry.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for AssetLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Drop the entry once nobody holds or waits on it
        let mut locks = self.locks.table();
        let idle = locks
            .get(&self.asset_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.asset_id);
        }
    }
}
