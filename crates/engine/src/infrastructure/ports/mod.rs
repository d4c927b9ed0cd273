//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - World storage (SQLite today, anything with a conditional update tomorrow)
//! - LLM calls (OpenAI-compatible or Azure OpenAI)
//! - Clock (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::WorldRepo;

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{
    ChatMessage, FinishReason, LlmPort, LlmRequest, LlmResponse, MessageRole, TokenUsage,
};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::MockLlmPort;
#[cfg(test)]
pub use repos::MockWorldRepo;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{LlmError, RepoError};
