use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire format revision stamped on every envelope. Peers only exchange
/// events when their revisions match exactly, since a replica can't be
/// kept in step with events it might decode differently.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProtocolVersion(pub u16);

impl ProtocolVersion {
    pub const CURRENT: Self = Self(1);

    #[must_use]
    pub const fn current() -> Self {
        Self::CURRENT
    }

    #[must_use]
    pub fn is_compatible_with(self, other: Self) -> bool {
        self == other
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
