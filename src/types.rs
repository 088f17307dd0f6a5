//! Basic type definitions
//!
//! Provides the `ConnId` newtype: a UUID tag for a TCP connection that has
//! not (or not yet) registered a client name. Registered clients are keyed
//! by name everywhere else.

use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Identifies a socket in logs during the window between accept and
/// successful registration, when no client name exists yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub Uuid);

impl ConnId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
