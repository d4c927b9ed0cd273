//! WorldForge Engine library.
//!
//! This crate contains all server-side code for WorldForge: world storage,
//! the scene-generation pipeline and the HTTP API.
//!
//! ## Structure
//!
//! - `use_cases/` - World management and scene generation
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

/// Shared fakes and sample payloads for tests.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
