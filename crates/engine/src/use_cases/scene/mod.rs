//! Scene generation use cases.
//!
//! The pipeline turns free-form model output into the three stored scene
//! documents:
//!
//! - `prompt` - fixed system instruction plus the per-world user message
//! - `extract` - locates the JSON object inside the completion text
//! - `normalize` - required keys, split into documents, size caps
//! - `generate` - cache check, provider call, conditional persist

mod extract;
mod gate;
mod generate;
mod normalize;
mod prompt;

use std::sync::Arc;

pub use extract::{
    extract_balanced_object, extract_json_list, extract_json_object, ExtractionStrategy,
};
pub use gate::WorldLocks;
pub use generate::{
    GenerateScene, GenerateSceneError, GenerationOutcome, GenerationSettings, GenerationStatus,
};
pub use normalize::{normalize_scene, SceneValidationError};
pub use prompt::{build_scene_prompt, system_prompt, user_prompt};

/// Container for scene use cases.
pub struct SceneUseCases {
    pub generate: Arc<GenerateScene>,
}

impl SceneUseCases {
    pub fn new(generate: Arc<GenerateScene>) -> Self {
        Self { generate }
    }
}
