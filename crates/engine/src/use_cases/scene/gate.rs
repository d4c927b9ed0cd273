//! Per-world serialization of scene generation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use worldforge_domain::WorldId;

/// One async mutex per world id, created on first use.
///
/// Holding the guard across the provider call means concurrent requests for
/// the same world queue up and the later ones find the cached scene.
#[derive(Default)]
pub struct WorldLocks {
    locks: DashMap<WorldId, Arc<Mutex<()>>>,
}

impl WorldLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, world_id: WorldId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard lock is released before awaiting.
        let lock = self.locks.entry(world_id).or_default().clone();
        lock.lock_owned().await
    }
}
