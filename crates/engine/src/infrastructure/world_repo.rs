//! SQLite-backed world storage.
//!
//! Generated documents live in three nullable TEXT columns holding serialized
//! JSON. A world counts as generated only when both `scene_config` and
//! `character_config` are set.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use worldforge_domain::{
    CharacterConfig, Description, Objectives, SceneConfig, SceneDocuments, World, WorldId,
    WorldName,
};

use crate::infrastructure::ports::{ClockPort, RepoError, WorldRepo};

const SELECT_COLUMNS: &str = "id, name, description, scene_config, character_config, \
                              objectives, score, created_at, updated_at";

/// SQLite implementation of [`WorldRepo`].
pub struct SqliteWorldRepo {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteWorldRepo {
    pub async fn new(db_path: &str, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| RepoError::database("connect", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS worlds (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                scene_config TEXT,
                character_config TEXT,
                objectives TEXT,
                score INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("migrate", e))?;

        Ok(Self { pool, clock })
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepoError::serialization(format!("invalid timestamp '{raw}': {e}")))
}

fn to_json_text<T: serde::Serialize>(value: &T) -> Result<String, RepoError> {
    serde_json::to_string(value).map_err(RepoError::serialization)
}

fn from_json_text<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, RepoError> {
    serde_json::from_str(raw).map_err(RepoError::serialization)
}

fn row_to_world(row: &SqliteRow) -> Result<World, RepoError> {
    let column = |e: sqlx::Error| RepoError::database("decode", e);

    let id: String = row.try_get("id").map_err(column)?;
    let name: String = row.try_get("name").map_err(column)?;
    let description: String = row.try_get("description").map_err(column)?;
    let scene_config: Option<String> = row.try_get("scene_config").map_err(column)?;
    let character_config: Option<String> = row.try_get("character_config").map_err(column)?;
    let objectives: Option<String> = row.try_get("objectives").map_err(column)?;
    let score: i64 = row.try_get("score").map_err(column)?;
    let created_at: String = row.try_get("created_at").map_err(column)?;
    let updated_at: String = row.try_get("updated_at").map_err(column)?;

    let id: WorldId = id
        .parse()
        .map_err(|e| RepoError::serialization(format!("invalid world id '{id}': {e}")))?;
    let name = WorldName::new(name).map_err(RepoError::serialization)?;
    let description = Description::new(description).map_err(RepoError::serialization)?;

    let scene = match (scene_config, character_config) {
        (Some(scene_config), Some(character_config)) => {
            let objectives = match objectives {
                Some(raw) => from_json_text::<Objectives>(&raw)?,
                None => Objectives::empty(),
            };
            Some(SceneDocuments::new(
                from_json_text::<SceneConfig>(&scene_config)?,
                from_json_text::<CharacterConfig>(&character_config)?,
                objectives,
            ))
        }
        _ => None,
    };

    Ok(World::new(name, description, parse_timestamp(&created_at)?)
        .with_id(id)
        .with_scene(scene)
        .with_score(score)
        .with_updated_at(parse_timestamp(&updated_at)?))
}

#[async_trait]
impl WorldRepo for SqliteWorldRepo {
    async fn get(&self, id: WorldId) -> Result<Option<World>, RepoError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM worlds WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("get_world", e))?;

        row.as_ref().map(row_to_world).transpose()
    }

    async fn list_all(&self) -> Result<Vec<World>, RepoError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM worlds ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("list_worlds", e))?;

        rows.iter().map(row_to_world).collect()
    }

    async fn save(&self, world: &World) -> Result<(), RepoError> {
        let (scene_config, character_config, objectives) = match world.scene() {
            Some(scene) => (
                Some(to_json_text(&scene.scene_config)?),
                Some(to_json_text(&scene.character_config)?),
                Some(to_json_text(&scene.objectives)?),
            ),
            None => (None, None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO worlds (
                id, name, description, scene_config, character_config,
                objectives, score, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                scene_config = excluded.scene_config,
                character_config = excluded.character_config,
                objectives = excluded.objectives,
                score = excluded.score,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(world.id().to_string())
        .bind(world.name().as_str())
        .bind(world.description().as_str())
        .bind(scene_config)
        .bind(character_config)
        .bind(objectives)
        .bind(world.score())
        .bind(format_timestamp(world.created_at()))
        .bind(format_timestamp(world.updated_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("save_world", e))?;

        Ok(())
    }

    async fn save_scene(&self, world: &World) -> Result<bool, RepoError> {
        let scene = world
            .scene()
            .ok_or_else(|| RepoError::constraint("world has no scene to persist"))?;

        let result = sqlx::query(
            r#"
            UPDATE worlds SET
                scene_config = ?,
                character_config = ?,
                objectives = ?,
                score = ?,
                updated_at = ?
            WHERE id = ?
              AND NOT (scene_config IS NOT NULL AND character_config IS NOT NULL)
            "#,
        )
        .bind(to_json_text(&scene.scene_config)?)
        .bind(to_json_text(&scene.character_config)?)
        .bind(to_json_text(&scene.objectives)?)
        .bind(world.score())
        .bind(format_timestamp(world.updated_at()))
        .bind(world.id().to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("save_scene", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_scene(&self, id: WorldId) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE worlds SET
                scene_config = NULL,
                character_config = NULL,
                objectives = NULL,
                score = 0,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(format_timestamp(self.clock.now()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("clear_scene", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_progress(
        &self,
        id: WorldId,
        score_change: i64,
        objectives: &Objectives,
    ) -> Result<Option<i64>, RepoError> {
        // SQLite silently widens an overflowing sum to REAL, which the
        // decoder then rejects on every read, so the bound is checked first.
        let row = sqlx::query(
            r#"
            UPDATE worlds SET
                score = score + ?,
                objectives = ?,
                updated_at = ?
            WHERE id = ?
              AND scene_config IS NOT NULL
              AND character_config IS NOT NULL
              AND (? <= 0 OR score <= ? - ?)
              AND (? >= 0 OR score >= ? - ?)
            RETURNING score
            "#,
        )
        .bind(score_change)
        .bind(to_json_text(objectives)?)
        .bind(format_timestamp(self.clock.now()))
        .bind(id.to_string())
        .bind(score_change)
        .bind(i64::MAX)
        .bind(score_change)
        .bind(score_change)
        .bind(i64::MIN)
        .bind(score_change)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("record_progress", e))?;

        row.map(|row| {
            row.try_get::<i64, _>("score")
                .map_err(|e| RepoError::database("record_progress", e))
        })
        .transpose()
    }
}
