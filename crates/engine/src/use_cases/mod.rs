//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific domain area.

pub mod management;
pub mod scene;

// Re-export main types
pub use management::ManagementUseCases;
pub use scene::SceneUseCases;
