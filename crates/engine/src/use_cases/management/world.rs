//! World CRUD and gameplay progress operations.

use std::sync::Arc;

use worldforge_domain::value_objects::{Description, WorldName};
use worldforge_domain::{Objectives, World, WorldId};

use crate::infrastructure::ports::{ClockPort, WorldRepo};
use crate::use_cases::scene::WorldLocks;

use super::ManagementError;

pub struct WorldCrud {
    world: Arc<dyn WorldRepo>,
    clock: Arc<dyn ClockPort>,
    locks: Arc<WorldLocks>,
}

impl WorldCrud {
    pub fn new(world: Arc<dyn WorldRepo>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            world,
            clock,
            locks: Arc::new(WorldLocks::new()),
        }
    }

    /// Share the per-world gate with scene generation.
    pub fn with_locks(mut self, locks: Arc<WorldLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// All worlds, newest first.
    pub async fn list(&self) -> Result<Vec<World>, ManagementError> {
        Ok(self.world.list_all().await?)
    }

    pub async fn get(&self, world_id: WorldId) -> Result<World, ManagementError> {
        self.world
            .get(world_id)
            .await?
            .ok_or(ManagementError::NotFound)
    }

    pub async fn create(
        &self,
        name: String,
        description: String,
    ) -> Result<World, ManagementError> {
        let name = WorldName::new(name)?;
        let description = Description::new(description)?;

        let world = World::new(name, description, self.clock.now());
        self.world.save(&world).await?;

        tracing::info!(world_id = %world.id(), name = %world.name(), "World created");
        Ok(world)
    }

    /// Apply a gameplay score delta and replace the objective progress.
    ///
    /// Returns the new score.
    pub async fn record_progress(
        &self,
        world_id: WorldId,
        score_change: i64,
        objectives: Objectives,
    ) -> Result<i64, ManagementError> {
        if let Some(score) = self
            .world
            .record_progress(world_id, score_change, &objectives)
            .await?
        {
            tracing::debug!(world_id = %world_id, score_change, score, "Progress recorded");
            return Ok(score);
        }

        // Nothing updated: work out which precondition failed.
        match self.world.get(world_id).await? {
            None => Err(ManagementError::NotFound),
            Some(world) if !world.has_scene() => Err(ManagementError::InvalidInput(
                "Scene has not been generated for this world".to_string(),
            )),
            Some(world) => {
                tracing::warn!(
                    world_id = %world_id,
                    score_change,
                    score = world.score(),
                    "Score change out of range"
                );
                Err(ManagementError::InvalidInput(
                    "Score change is out of range".to_string(),
                ))
            }
        }
    }

    /// Drop the generated documents so the next generation runs again.
    ///
    /// Waits for an in-flight generation of the same world to finish first.
    pub async fn reset_scene(&self, world_id: WorldId) -> Result<(), ManagementError> {
        let _guard = self.locks.acquire(world_id).await;

        if !self.world.clear_scene(world_id).await? {
            return Err(ManagementError::NotFound);
        }

        tracing::info!(world_id = %world_id, "Scene cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use std::time::Duration;

    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::MockWorldRepo;
    use crate::test_fixtures::sample_documents;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn crud(repo: MockWorldRepo) -> WorldCrud {
        WorldCrud::new(Arc::new(repo), Arc::new(FixedClock(fixed_now())))
    }

    fn stored_world() -> World {
        World::new(
            WorldName::new("Emberfall").expect("name"),
            Description::new("A volcanic island of forges").expect("description"),
            fixed_now(),
        )
    }

    #[tokio::test]
    async fn create_trims_and_saves() {
        let mut repo = MockWorldRepo::new();
        repo.expect_save()
            .withf(|world| world.name().as_str() == "Emberfall" && !world.has_scene())
            .times(1)
            .returning(|_| Ok(()));

        let world = crud(repo)
            .create("  Emberfall ".into(), "Lava rivers".into())
            .await
            .expect("create");

        assert_eq!(world.name().as_str(), "Emberfall");
        assert_eq!(world.score(), 0);
        assert_eq!(world.created_at(), fixed_now());
    }

    #[tokio::test]
    async fn create_rejects_blank_name_without_saving() {
        let mut repo = MockWorldRepo::new();
        repo.expect_save().times(0);

        let err = crud(repo)
            .create("   ".into(), "Lava rivers".into())
            .await
            .expect_err("blank name");

        assert_eq!(err.to_string(), "World name is required");
    }

    #[tokio::test]
    async fn create_rejects_blank_description() {
        let mut repo = MockWorldRepo::new();
        repo.expect_save().times(0);

        let err = crud(repo)
            .create("Emberfall".into(), "".into())
            .await
            .expect_err("blank description");

        assert_eq!(err.to_string(), "World description is required");
    }

    #[tokio::test]
    async fn get_unknown_world_is_not_found() {
        let mut repo = MockWorldRepo::new();
        repo.expect_get().returning(|_| Ok(None));

        let err = crud(repo).get(WorldId::new()).await.expect_err("missing");

        assert!(matches!(err, ManagementError::NotFound));
    }

    #[tokio::test]
    async fn record_progress_returns_new_score() {
        let world_id = WorldId::new();
        let mut repo = MockWorldRepo::new();
        repo.expect_record_progress()
            .withf(move |id, change, objectives| {
                *id == world_id && *change == 25 && objectives.len() == 1
            })
            .times(1)
            .returning(|_, _, _| Ok(Some(125)));
        repo.expect_get().times(0);

        let score = crud(repo)
            .record_progress(world_id, 25, Objectives::new(vec![json!({ "id": "obj_1" })]))
            .await
            .expect("progress");

        assert_eq!(score, 125);
    }

    #[tokio::test]
    async fn record_progress_without_scene_is_invalid_input() {
        let world = stored_world();
        let mut repo = MockWorldRepo::new();
        repo.expect_record_progress().returning(|_, _, _| Ok(None));
        repo.expect_get()
            .returning(move |_| Ok(Some(world.clone())));

        let err = crud(repo)
            .record_progress(WorldId::new(), 10, Objectives::empty())
            .await
            .expect_err("no scene");

        assert!(matches!(err, ManagementError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn record_progress_for_unknown_world_is_not_found() {
        let mut repo = MockWorldRepo::new();
        repo.expect_record_progress().returning(|_, _, _| Ok(None));
        repo.expect_get().returning(|_| Ok(None));

        let err = crud(repo)
            .record_progress(WorldId::new(), 10, Objectives::empty())
            .await
            .expect_err("missing");

        assert!(matches!(err, ManagementError::NotFound));
    }

    #[tokio::test]
    async fn record_progress_out_of_range_is_invalid_input() {
        let mut world = stored_world();
        world
            .attach_scene(sample_documents(), fixed_now())
            .expect("attach");
        let world = world.with_score(i64::MAX);

        let mut repo = MockWorldRepo::new();
        repo.expect_record_progress().returning(|_, _, _| Ok(None));
        repo.expect_get()
            .returning(move |_| Ok(Some(world.clone())));

        let err = crud(repo)
            .record_progress(WorldId::new(), 1, Objectives::empty())
            .await
            .expect_err("overflow");

        assert_eq!(err.to_string(), "Score change is out of range");
    }

    #[tokio::test]
    async fn reset_scene_clears_in_one_targeted_write() {
        let world_id = WorldId::new();
        let mut repo = MockWorldRepo::new();
        repo.expect_clear_scene()
            .withf(move |id| *id == world_id)
            .times(1)
            .returning(|_| Ok(true));
        repo.expect_get().times(0);
        repo.expect_save().times(0);

        crud(repo).reset_scene(world_id).await.expect("reset");
    }

    #[tokio::test]
    async fn reset_scene_for_unknown_world_is_not_found() {
        let mut repo = MockWorldRepo::new();
        repo.expect_clear_scene().returning(|_| Ok(false));

        let err = crud(repo)
            .reset_scene(WorldId::new())
            .await
            .expect_err("missing");

        assert!(matches!(err, ManagementError::NotFound));
    }

    #[tokio::test]
    async fn reset_scene_waits_for_in_flight_generation() {
        let world_id = WorldId::new();
        let locks = Arc::new(WorldLocks::new());
        let mut repo = MockWorldRepo::new();
        repo.expect_clear_scene().times(1).returning(|_| Ok(true));
        let crud = Arc::new(crud(repo).with_locks(locks.clone()));

        let generation = locks.acquire(world_id).await;
        let reset = {
            let crud = crud.clone();
            tokio::spawn(async move { crud.reset_scene(world_id).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!reset.is_finished());

        drop(generation);
        tokio::time::timeout(Duration::from_secs(1), reset)
            .await
            .expect("reset proceeds after generation")
            .expect("task")
            .expect("reset");
    }
}
