//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::ports::{ClockPort, LlmPort, WorldRepo};
use crate::use_cases;
use crate::use_cases::management::WorldCrud;
use crate::use_cases::scene::{GenerateScene, GenerationSettings, WorldLocks};

/// Main application state.
///
/// Holds all use cases.
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub management: use_cases::ManagementUseCases,
    pub scene: use_cases::SceneUseCases,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(
        world_repo: Arc<dyn WorldRepo>,
        llm: Arc<dyn LlmPort>,
        clock: Arc<dyn ClockPort>,
        generation: GenerationSettings,
    ) -> Self {
        // Generation and scene resets for one world never interleave.
        let locks = Arc::new(WorldLocks::new());

        let management = use_cases::ManagementUseCases::new(
            WorldCrud::new(world_repo.clone(), clock.clone()).with_locks(locks.clone()),
        );

        let scene = use_cases::SceneUseCases::new(Arc::new(
            GenerateScene::new(world_repo, llm, clock, generation).with_locks(locks),
        ));

        Self {
            use_cases: UseCases { management, scene },
        }
    }
}
