//! Testability ports for injecting time.

use chrono::{DateTime, Utc};

// =============================================================================
// Testability Ports
// =============================================================================

pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
