//! Repository port traits for database access.

use async_trait::async_trait;
use worldforge_domain::{Objectives, World, WorldId};

use super::error::RepoError;

// =============================================================================
// World Storage
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorldRepo: Send + Sync {
    async fn get(&self, id: WorldId) -> Result<Option<World>, RepoError>;

    /// All worlds, newest first.
    async fn list_all(&self) -> Result<Vec<World>, RepoError>;

    /// Insert or fully overwrite a world record.
    async fn save(&self, world: &World) -> Result<(), RepoError>;

    /// Persist the world's generated documents and score in one write,
    /// only if the stored record has no generated scene yet.
    ///
    /// Returns `false` when the write lost to an existing scene (or the
    /// world no longer exists); the stored record is left untouched.
    async fn save_scene(&self, world: &World) -> Result<bool, RepoError>;

    /// Drop the generated documents and reset the score to zero, leaving
    /// name and description as stored.
    ///
    /// Returns `false` when the world does not exist.
    async fn clear_scene(&self, id: WorldId) -> Result<bool, RepoError>;

    /// Add `score_change` to the stored score and replace the objectives,
    /// only if the world has a generated scene.
    ///
    /// Returns the new score, or `None` when nothing was updated: the world
    /// is missing, has no scene, or the sum would leave the `i64` range.
    async fn record_progress(
        &self,
        id: WorldId,
        score_change: i64,
        objectives: &Objectives,
    ) -> Result<Option<i64>, RepoError>;
}
