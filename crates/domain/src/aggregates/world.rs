//! World aggregate - a player-described game world and its generated scene
//!
//! # Rustic DDD Design
//!
//! - **Private fields**: All fields are encapsulated
//! - **Newtypes**: `WorldName` and `Description` for validated strings
//! - **Valid by construction**: `new()` takes pre-validated types
//! - **Builder pattern**: `with_*` methods for loading from storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;
use crate::value_objects::{
    CharacterConfig, Description, Objectives, SceneConfig, SceneDocuments, WorldName,
};
use worldforge_domain::WorldId;

/// A game world described in natural language.
///
/// # Invariants
///
/// - Scene, character and objectives documents are present together or not
///   at all (held as one `Option<SceneDocuments>`)
/// - `score` is reset to 0 exactly when a new scene is attached
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use worldforge_domain::World;
/// use worldforge_domain::value_objects::{Description, WorldName};
///
/// let name = WorldName::new("Emberfall").unwrap();
/// let description = Description::new("A volcanic island of forges").unwrap();
/// let world = World::new(name, description, Utc::now());
///
/// assert_eq!(world.name().as_str(), "Emberfall");
/// assert!(!world.has_scene());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    // Identity
    id: WorldId,

    // Core attributes (newtypes)
    name: WorldName,
    description: Description,

    // Generated content
    scene: Option<SceneDocuments>,
    score: i64,

    // Timestamps
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl World {
    // =========================================================================
    // Constructor
    // =========================================================================

    /// Create a new world with no generated scene and a score of 0.
    pub fn new(name: WorldName, description: Description, now: DateTime<Utc>) -> Self {
        Self {
            id: WorldId::new(),
            name,
            description,
            scene: None,
            score: 0,
            created_at: now,
            updated_at: now,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> WorldId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &WorldName {
        &self.name
    }

    #[inline]
    pub fn description(&self) -> &Description {
        &self.description
    }

    #[inline]
    pub fn score(&self) -> i64 {
        self.score
    }

    /// The generated documents, if generation has succeeded.
    #[inline]
    pub fn scene(&self) -> Option<&SceneDocuments> {
        self.scene.as_ref()
    }

    #[inline]
    pub fn has_scene(&self) -> bool {
        self.scene.is_some()
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // =========================================================================
    // Builder Methods (used when loading from storage)
    // =========================================================================

    pub fn with_id(mut self, id: WorldId) -> Self {
        self.id = id;
        self
    }

    pub fn with_scene(mut self, scene: Option<SceneDocuments>) -> Self {
        self.scene = scene;
        self
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    // =========================================================================
    // Mutation Methods
    // =========================================================================

    /// Attach freshly generated documents and reset the score.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if a scene is already
    /// attached.
    pub fn attach_scene(
        &mut self,
        scene: SceneDocuments,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.scene.is_some() {
            return Err(DomainError::invalid_state(format!(
                "World {} already has a generated scene",
                self.id
            )));
        }
        self.scene = Some(scene);
        self.score = 0;
        self.updated_at = now;
        Ok(())
    }
}

// ============================================================================
// Serde Implementation
// ============================================================================

/// Wire format shared by the HTTP API and fixtures.
#[derive(Serialize, Deserialize)]
struct WorldWireFormat {
    id: WorldId,
    name: WorldName,
    description: Description,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    scene_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scene_config: Option<SceneConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    character_config: Option<CharacterConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    objectives: Option<Objectives>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Serialize for World {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let scene = self.scene.clone();
        let wire = WorldWireFormat {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            score: self.score,
            scene_generated: scene.is_some(),
            scene_config: scene.as_ref().map(|s| s.scene_config.clone()),
            character_config: scene.as_ref().map(|s| s.character_config.clone()),
            objectives: scene.map(|s| s.objectives),
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for World {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = WorldWireFormat::deserialize(deserializer)?;

        // A half-written scene is treated as no scene at all.
        let scene = match (wire.scene_config, wire.character_config) {
            (Some(scene_config), Some(character_config)) => Some(SceneDocuments::new(
                scene_config,
                character_config,
                wire.objectives.unwrap_or_default(),
            )),
            _ => None,
        };

        Ok(World {
            id: wire.id,
            name: wire.name,
            description: wire.description,
            scene,
            score: wire.score,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::{json, Map, Value};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn create_test_world() -> World {
        let name = WorldName::new("Test World").expect("valid name");
        let description = Description::new("A quiet meadow").expect("valid description");
        World::new(name, description, fixed_now())
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn sample_scene() -> SceneDocuments {
        SceneDocuments::new(
            SceneConfig::from_map(object(json!({
                "terrain": { "shape": "plane", "size": 100, "color": "#6b8e23" },
                "characterSpawn": [0, 2, 5]
            }))),
            CharacterConfig::from_map(object(json!({ "accessories": [] }))),
            Objectives::new(vec![json!({ "id": "obj_1" })]),
        )
    }

    mod constructor {
        use super::*;

        #[test]
        fn new_world_has_no_scene_and_zero_score() {
            let world = create_test_world();
            assert!(!world.has_scene());
            assert_eq!(world.score(), 0);
            assert_eq!(world.created_at(), world.updated_at());
        }
    }

    mod scene_lifecycle {
        use super::*;

        #[test]
        fn attach_scene_resets_score() {
            let mut world = create_test_world().with_score(75);
            let later = fixed_now() + Duration::minutes(5);

            world.attach_scene(sample_scene(), later).expect("attach");

            assert!(world.has_scene());
            assert_eq!(world.score(), 0);
            assert_eq!(world.updated_at(), later);
        }

        #[test]
        fn attach_scene_twice_is_rejected() {
            let mut world = create_test_world();
            world.attach_scene(sample_scene(), fixed_now()).expect("attach");
            let before = world.clone();

            let err = world
                .attach_scene(SceneDocuments::default(), fixed_now())
                .expect_err("second attach");

            assert!(matches!(err, DomainError::InvalidStateTransition(_)));
            assert_eq!(world, before);
        }
    }

    mod serde_format {
        use super::*;

        #[test]
        fn serializes_snake_case_with_generation_flag() {
            let mut world = create_test_world();
            world.attach_scene(sample_scene(), fixed_now()).expect("attach");

            let value = serde_json::to_value(&world).expect("serialize");

            assert_eq!(value["name"], "Test World");
            assert_eq!(value["scene_generated"], true);
            assert_eq!(value["scene_config"]["characterSpawn"], json!([0, 2, 5]));
            assert_eq!(value["objectives"][0]["id"], "obj_1");
            assert!(value.get("created_at").is_some());
        }

        #[test]
        fn omits_documents_before_generation() {
            let value = serde_json::to_value(create_test_world()).expect("serialize");
            assert_eq!(value["scene_generated"], false);
            assert!(value.get("scene_config").is_none());
            assert!(value.get("objectives").is_none());
        }

        #[test]
        fn round_trips_through_wire_format() {
            let mut world = create_test_world();
            world.attach_scene(sample_scene(), fixed_now()).expect("attach");

            let text = serde_json::to_string(&world).expect("serialize");
            let back: World = serde_json::from_str(&text).expect("deserialize");

            assert_eq!(back, world);
        }

        #[test]
        fn half_written_scene_deserializes_as_absent() {
            let mut value = serde_json::to_value(create_test_world()).expect("serialize");
            value["scene_config"] = json!({ "terrain": {} });

            let world: World = serde_json::from_value(value).expect("deserialize");

            assert!(!world.has_scene());
        }
    }
}
