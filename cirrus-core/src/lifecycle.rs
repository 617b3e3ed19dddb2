//! Lifecycle - Where a remote resource is in its create/active/delete lifecycle

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the remote service
///
/// Services add new states over time, so values this enum does not know are
/// kept verbatim in `Unknown` rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LifecycleState {
    Creating,
    Updating,
    Active,
    Inactive,
    Deleting,
    Deleted,
    Failed,
    NeedsAttention,
    InProgress,
    Cancelling,
    Canceled,
    Succeeded,
    Waiting,
    Unknown(String),
}

impl LifecycleState {
    /// All known states, in wire order
    pub fn known() -> [LifecycleState; 13] {
        [
            LifecycleState::Creating,
            LifecycleState::Updating,
            LifecycleState::Active,
            LifecycleState::Inactive,
            LifecycleState::Deleting,
            LifecycleState::Deleted,
            LifecycleState::Failed,
            LifecycleState::NeedsAttention,
            LifecycleState::InProgress,
            LifecycleState::Cancelling,
            LifecycleState::Canceled,
            LifecycleState::Succeeded,
            LifecycleState::Waiting,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            LifecycleState::Creating => "CREATING",
            LifecycleState::Updating => "UPDATING",
            LifecycleState::Active => "ACTIVE",
            LifecycleState::Inactive => "INACTIVE",
            LifecycleState::Deleting => "DELETING",
            LifecycleState::Deleted => "DELETED",
            LifecycleState::Failed => "FAILED",
            LifecycleState::NeedsAttention => "NEEDS_ATTENTION",
            LifecycleState::InProgress => "IN_PROGRESS",
            LifecycleState::Cancelling => "CANCELLING",
            LifecycleState::Canceled => "CANCELED",
            LifecycleState::Succeeded => "SUCCEEDED",
            LifecycleState::Waiting => "WAITING",
            LifecycleState::Unknown(s) => s,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for LifecycleState {
    fn from(s: &str) -> Self {
        Self::known()
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .unwrap_or_else(|| LifecycleState::Unknown(s.to_string()))
    }
}

impl From<String> for LifecycleState {
    fn from(s: String) -> Self {
        LifecycleState::from(s.as_str())
    }
}

impl From<LifecycleState> for String {
    fn from(state: LifecycleState) -> Self {
        state.as_str().to_string()
    }
}

impl FromStr for LifecycleState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LifecycleState::from(s))
    }
}

/// A fetched view of a remote resource at one point in time
pub trait Snapshot {
    /// Lifecycle state carried by this snapshot, if the service reported one
    fn lifecycle_state(&self) -> Option<&LifecycleState>;
}

impl Snapshot for LifecycleState {
    fn lifecycle_state(&self) -> Option<&LifecycleState> {
        Some(self)
    }
}
