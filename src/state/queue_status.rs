/// Queue status definitions for tracking probe progress
///
/// Every candidate address lives in the task queue in exactly one of these states.
use serde::Serialize;
use std::fmt;

/// Represents the current state of a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Address has been seeded but not yet claimed
    Pending,

    /// Address has been claimed by a batch and is being probed
    InProgress,

    /// Probe answered and the result was stored
    Completed,

    /// Probe got no answer, or storing the result failed
    Failed,
}

impl QueueStatus {
    /// Returns true if no further processing is expected
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible queue statuses
    pub fn all() -> [Self; 4] {
        [Self::Pending, Self::InProgress, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
