//! Management use cases for CRUD-style operations.
//!
//! These use cases keep HTTP handlers thin while coordinating the world store.

mod world;

pub use world::WorldCrud;

use worldforge_domain::DomainError;

use crate::infrastructure::ports::RepoError;

/// Shared error type for management use cases.
#[derive(Debug, thiserror::Error)]
pub enum ManagementError {
    #[error("World not found")]
    NotFound,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl From<DomainError> for ManagementError {
    fn from(err: DomainError) -> Self {
        Self::InvalidInput(err.message().to_string())
    }
}

/// Container for management use cases.
pub struct ManagementUseCases {
    pub world: WorldCrud,
}

impl ManagementUseCases {
    pub fn new(world: WorldCrud) -> Self {
        Self { world }
    }
}
