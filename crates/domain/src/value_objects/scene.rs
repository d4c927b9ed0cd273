//! Scene documents produced by generation.
//!
//! The model is asked for a single JSON object; generation splits it into
//! three documents that are persisted together:
//!
//! - [`SceneConfig`] - terrain, static/physics objects, lights, NPCs, spawn
//! - [`CharacterConfig`] - the player avatar's appearance
//! - [`Objectives`] - ordered task descriptors tracked against the score
//!
//! The documents stay free-form JSON. Field values are advisory to the model
//! and are only checked when strict validation is switched on in the engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum decorative (non-colliding) objects kept in a scene.
pub const MAX_STATIC_OBJECTS: usize = 30;
/// Maximum collidable objects kept in a scene.
pub const MAX_PHYSICS_OBJECTS: usize = 15;
/// Maximum NPCs kept in a scene.
pub const MAX_NPCS: usize = 8;
/// Maximum accessories kept on the player avatar.
pub const MAX_ACCESSORIES: usize = 3;

fn array_field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    map.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

// ============================================================================
// SceneConfig
// ============================================================================

/// Structured description of the world's terrain and entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneConfig(Map<String, Value>);

impl SceneConfig {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn terrain(&self) -> Option<&Value> {
        self.0.get("terrain")
    }

    pub fn character_spawn(&self) -> Option<&Value> {
        self.0.get("characterSpawn")
    }

    /// Decorative entities; empty when the key is absent or not an array.
    pub fn static_objects(&self) -> &[Value] {
        array_field(&self.0, "staticObjects")
    }

    pub fn physics_objects(&self) -> &[Value] {
        array_field(&self.0, "physicsObjects")
    }

    pub fn lights(&self) -> &[Value] {
        array_field(&self.0, "lights")
    }

    pub fn npcs(&self) -> &[Value] {
        array_field(&self.0, "npcs")
    }
}

// ============================================================================
// CharacterConfig
// ============================================================================

/// Appearance of the player avatar (body, head, clothing, accessories).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterConfig(Map<String, Value>);

impl CharacterConfig {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn accessories(&self) -> &[Value] {
        array_field(&self.0, "accessories")
    }
}

// ============================================================================
// Objectives
// ============================================================================

/// Ordered objective descriptors. Always stored, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Objectives(Vec<Value>);

impl Objectives {
    pub fn new(items: Vec<Value>) -> Self {
        Self(items)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identifier of each objective that carries a string `id`.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter_map(|objective| objective.get("id").and_then(Value::as_str))
    }
}

// ============================================================================
// SceneDocuments
// ============================================================================

/// The three documents a successful generation persists as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocuments {
    pub scene_config: SceneConfig,
    pub character_config: CharacterConfig,
    pub objectives: Objectives,
}

impl SceneDocuments {
    pub fn new(
        scene_config: SceneConfig,
        character_config: CharacterConfig,
        objectives: Objectives,
    ) -> Self {
        Self {
            scene_config,
            character_config,
            objectives,
        }
    }
}
