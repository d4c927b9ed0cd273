//! Value objects - Immutable objects defined by their attributes

mod names;
mod scene;

pub use names::{Description, WorldName};
pub use scene::{
    CharacterConfig, Objectives, SceneConfig, SceneDocuments, MAX_ACCESSORIES, MAX_NPCS,
    MAX_PHYSICS_OBJECTS, MAX_STATIC_OBJECTS,
};
