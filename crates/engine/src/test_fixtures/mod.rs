//! Shared test helpers: sample scene payloads and a scripted completion provider.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_fixtures::{sample_scene_json, ScriptedLlm};
//!
//! let llm = ScriptedLlm::new(vec![Ok(sample_scene_json("#6b8e23").to_string())]);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::Barrier;
use worldforge_domain::{CharacterConfig, Objectives, SceneConfig, SceneDocuments};

use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest, LlmResponse};

// =============================================================================
// Scene payloads
// =============================================================================

/// A complete model reply object; `terrain_color` tells replies apart.
pub fn sample_scene_json(terrain_color: &str) -> Value {
    json!({
        "terrain": { "shape": "plane", "size": 100, "color": terrain_color },
        "staticObjects": [
            { "type": "cone", "position": [4, 0, -6], "scale": [1, 3, 1], "color": "#3b2f2f", "name": "Basalt Spire" }
        ],
        "physicsObjects": [
            {
                "type": "sphere",
                "position": [2, 0.5, 3],
                "scale": [0.5, 0.5, 0.5],
                "color": "#ff4500",
                "name": "Ember Shard",
                "interactionType": "collect",
                "objectiveId": "obj_1",
                "points": 10,
                "message": "The shard is warm to the touch."
            }
        ],
        "lights": [
            { "type": "ambient", "color": "#ffffff", "intensity": 0.5 },
            { "type": "directional", "color": "#ffd27f", "intensity": 1.0, "position": [10, 10, 5] }
        ],
        "npcs": [
            { "name": "Forge-Warden Brann", "position": [0, 0, -4], "color": "#8b4513", "dialogue": ["The mountain is restless today."] }
        ],
        "objectives": [
            { "id": "obj_1", "type": "collect", "description": "Collect 3 ember shards", "targetCount": 3, "currentCount": 0, "completed": false, "points": 30 },
            { "id": "obj_2", "type": "talk", "description": "Speak with the Forge-Warden", "targetCount": 1, "currentCount": 0, "completed": false, "points": 20 },
            { "id": "obj_3", "type": "reach", "description": "Reach the caldera", "targetCount": 1, "currentCount": 0, "completed": false, "points": 50 }
        ],
        "characterSpawn": [0, 2, 5],
        "characterAppearance": {
            "body": { "height": 1.8, "build": "muscular", "skinTone": "#c68642" },
            "head": { "hairStyle": "braided", "hairColor": "#b22222", "facialHair": "beard" },
            "clothing": {
                "top": { "type": "leather apron", "color": "#5c4033" },
                "bottom": { "type": "trousers", "color": "#2f2f2f" },
                "footwear": { "type": "boots", "color": "#1a1a1a" }
            },
            "accessories": [ { "type": "hammer", "color": "#808080" } ]
        }
    })
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// Small, already-split documents for tests that never reach the normalizer.
pub fn sample_documents() -> SceneDocuments {
    SceneDocuments::new(
        SceneConfig::from_map(object(json!({
            "terrain": { "shape": "plane", "size": 100, "color": "#6b8e23" },
            "characterSpawn": [0, 2, 5]
        }))),
        CharacterConfig::from_map(object(json!({
            "body": { "height": 1.7, "build": "slim", "skinTone": "#f1c27d" },
            "accessories": []
        }))),
        Objectives::new(vec![json!({ "id": "obj_1", "type": "reach", "points": 50 })]),
    )
}

// =============================================================================
// Scripted completion provider
// =============================================================================

/// Hand-written [`LlmPort`] fake that replays scripted replies in order.
///
/// Runs out with `LlmError::InvalidResponse`. Optional delay and barrier let
/// tests line up concurrent calls.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    barrier: Option<Arc<Barrier>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            delay: None,
            barrier: None,
        }
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Wait on `barrier` before answering each call.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmPort for ScriptedLlm {
    async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".into())));

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        reply.map(LlmResponse::text)
    }
}
