use serde::Serialize;
use std::fmt;

/// Lifecycle state of the crawl orchestrator
///
/// `Stopped` is both the initial state and the terminal state of a run.
/// Transitions are driven by the operator through start, pause, resume and stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    Stopped,
    Running,
    Paused,
}

impl CrawlStatus {
    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// | From | Allowed targets |
    /// |------|-----------------|
    /// | Stopped | Running |
    /// | Running | Paused, Stopped |
    /// | Paused | Running, Stopped |
    pub fn can_transition_to(&self, next: CrawlStatus) -> bool {
        matches!(
            (self, next),
            (Self::Stopped, Self::Running)
                | (Self::Running, Self::Paused)
                | (Self::Running, Self::Stopped)
                | (Self::Paused, Self::Running)
                | (Self::Paused, Self::Stopped)
        )
    }

    /// True while a run is underway, paused or not
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "stopped" => Some(Self::Stopped),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }
}

impl Default for CrawlStatus {
    fn default() -> Self {
        Self::Stopped
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
