//! WorldForge domain layer.
//!
//! Holds the `World` aggregate, the scene documents produced by generation,
//! and the validated value objects they are built from. Nothing in here
//! performs I/O.

extern crate self as worldforge_domain;

pub mod aggregates;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use aggregates::World;
pub use error::DomainError;
pub use ids::WorldId;
pub use value_objects::{
    CharacterConfig, Description, Objectives, SceneConfig, SceneDocuments, WorldName,
    MAX_ACCESSORIES, MAX_NPCS, MAX_PHYSICS_OBJECTS, MAX_STATIC_OBJECTS,
};
