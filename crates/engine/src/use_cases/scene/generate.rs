//! Scene generation: cache check, one completion call, extract, normalize,
//! conditional persist.

use std::sync::Arc;

use worldforge_domain::{DomainError, SceneDocuments, WorldId};

use crate::infrastructure::ports::{
    ClockPort, FinishReason, LlmError, LlmPort, LlmRequest, RepoError, WorldRepo,
};

use super::extract::ExtractionStrategy;
use super::gate::WorldLocks;
use super::normalize::{normalize_scene, SceneValidationError};
use super::prompt::build_scene_prompt;

/// Knobs for the generation pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Model or Azure deployment; the client default when `None`.
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub extraction: ExtractionStrategy,
    pub strict_validation: bool,
    /// Serialize concurrent generations for the same world.
    pub lock_per_world: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: None,
            extraction: ExtractionStrategy::Balanced,
            strict_validation: false,
            lock_per_world: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    /// This call ran the pipeline and its write persisted.
    Generated,
    /// A stored scene was returned without persisting anything.
    AlreadyGenerated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub status: GenerationStatus,
    pub scene: SceneDocuments,
}

impl GenerationOutcome {
    fn generated(scene: SceneDocuments) -> Self {
        Self {
            status: GenerationStatus::Generated,
            scene,
        }
    }

    fn cached(scene: SceneDocuments) -> Self {
        Self {
            status: GenerationStatus::AlreadyGenerated,
            scene,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateSceneError {
    #[error("World not found")]
    NotFound(WorldId),
    /// Provider text is passed through unchanged.
    #[error("{0}")]
    Provider(String),
    #[error("No JSON found in response")]
    Extraction,
    #[error("Incomplete schema: {0}")]
    Schema(String),
    /// Detail is kept for logs only.
    #[error("Malformed model output")]
    Parse(String),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl From<SceneValidationError> for GenerateSceneError {
    fn from(err: SceneValidationError) -> Self {
        match err {
            SceneValidationError::Parse(detail) => Self::Parse(detail),
            SceneValidationError::MissingField(key) => Self::Schema(format!("missing '{key}'")),
            SceneValidationError::Invalid(detail) => Self::Schema(detail),
        }
    }
}

fn provider_message(err: LlmError) -> String {
    match err {
        LlmError::RequestFailed(message) | LlmError::InvalidResponse(message) => message,
    }
}

/// Generate a world's scene at most once.
pub struct GenerateScene {
    world: Arc<dyn WorldRepo>,
    llm: Arc<dyn LlmPort>,
    clock: Arc<dyn ClockPort>,
    settings: GenerationSettings,
    locks: Arc<WorldLocks>,
}

impl GenerateScene {
    pub fn new(
        world: Arc<dyn WorldRepo>,
        llm: Arc<dyn LlmPort>,
        clock: Arc<dyn ClockPort>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            world,
            llm,
            clock,
            settings,
            locks: Arc::new(WorldLocks::new()),
        }
    }

    /// Share the per-world gate with other writers of the scene columns.
    pub fn with_locks(mut self, locks: Arc<WorldLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Return the stored scene, or generate and persist one.
    ///
    /// Failures leave the stored world untouched.
    pub async fn execute(&self, world_id: WorldId) -> Result<GenerationOutcome, GenerateSceneError> {
        let _guard = if self.settings.lock_per_world {
            Some(self.locks.acquire(world_id).await)
        } else {
            None
        };

        let mut world = self
            .world
            .get(world_id)
            .await?
            .ok_or(GenerateSceneError::NotFound(world_id))?;

        if let Some(scene) = world.scene() {
            tracing::debug!(world_id = %world_id, phase = "checking", "Scene already generated");
            return Ok(GenerationOutcome::cached(scene.clone()));
        }

        tracing::info!(
            world_id = %world_id,
            phase = "generating",
            model = self.settings.model.as_deref().unwrap_or("default"),
            "Requesting scene from completion provider"
        );

        let mut request = LlmRequest::new(build_scene_prompt(world.name(), world.description()))
            .with_max_tokens(self.settings.max_tokens);
        if let Some(model) = &self.settings.model {
            request = request.with_model(model.clone());
        }

        let response = self.llm.generate(request).await.map_err(|e| {
            let message = provider_message(e);
            tracing::warn!(world_id = %world_id, phase = "generating", error = %message, "Completion provider failed");
            GenerateSceneError::Provider(message)
        })?;

        if response.content.trim().is_empty() {
            tracing::warn!(world_id = %world_id, phase = "generating", finish_reason = ?response.finish_reason, "Empty completion");
            return Err(GenerateSceneError::Provider(
                "Empty response from completion provider".to_string(),
            ));
        }
        if response.finish_reason == FinishReason::Length {
            tracing::warn!(world_id = %world_id, phase = "generating", "Completion hit the token limit; output may be truncated");
        }
        if let Some(usage) = response.usage {
            tracing::debug!(
                world_id = %world_id,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }

        let Some(candidate) = self.settings.extraction.extract(&response.content) else {
            tracing::warn!(
                world_id = %world_id,
                phase = "extracting",
                strategy = %self.settings.extraction,
                "No JSON object in completion"
            );
            return Err(GenerateSceneError::Extraction);
        };

        let scene = normalize_scene(candidate, self.settings.strict_validation).map_err(|e| {
            tracing::warn!(world_id = %world_id, phase = "validating", error = %e, "Model output rejected");
            GenerateSceneError::from(e)
        })?;

        world.attach_scene(scene.clone(), self.clock.now())?;

        if self.world.save_scene(&world).await? {
            tracing::info!(
                world_id = %world_id,
                phase = "persisted",
                static_objects = scene.scene_config.static_objects().len(),
                npcs = scene.scene_config.npcs().len(),
                objectives = scene.objectives.len(),
                "Scene generated"
            );
            return Ok(GenerationOutcome::generated(scene));
        }

        // Another request persisted first; its scene wins.
        let winner = self
            .world
            .get(world_id)
            .await?
            .and_then(|stored| stored.scene().cloned())
            .ok_or(GenerateSceneError::NotFound(world_id))?;
        tracing::info!(world_id = %world_id, phase = "persisted", "Lost generation race; returning stored scene");
        Ok(GenerationOutcome::cached(winner))
    }
}
