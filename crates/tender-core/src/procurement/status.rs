use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status shared by tenders and bids.
///
/// The numeric ids are stable and match the `status` reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Created,
    Published,
    Closed,
    Canceled,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Created,
        Status::Published,
        Status::Closed,
        Status::Canceled,
    ];

    pub fn id(self) -> i32 {
        match self {
            Status::Created => 1,
            Status::Published => 2,
            Status::Closed => 3,
            Status::Canceled => 4,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.id() == id)
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Created => "CREATED",
            Status::Published => "PUBLISHED",
            Status::Closed => "CLOSED",
            Status::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Closed | Status::Canceled)
    }

    /// Resolve the status reached by `transition`, rejecting moves the lifecycle
    /// does not allow: CREATED → PUBLISHED → {CLOSED, CANCELED}.
    pub fn apply(self, transition: Transition) -> Result<Status, TransitionError> {
        match (self, transition) {
            (Status::Created, Transition::Publish) => Ok(Status::Published),
            (Status::Published, Transition::Close) => Ok(Status::Closed),
            (Status::Published, Transition::Cancel) => Ok(Status::Canceled),
            (from, transition) => Err(TransitionError { from, transition }),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named status-only operations. None of them creates a new version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Publish,
    Close,
    Cancel,
}

impl Transition {
    pub fn label(self) -> &'static str {
        match self {
            Transition::Publish => "publish",
            Transition::Close => "close",
            Transition::Cancel => "cancel",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Transition {
    type Err = UnknownTransition;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "publish" => Ok(Transition::Publish),
            "close" => Ok(Transition::Close),
            "cancel" => Ok(Transition::Cancel),
            _ => Err(UnknownTransition(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {transition} from {from}")]
pub struct TransitionError {
    pub from: Status,
    pub transition: Transition,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status transition '{0}'")]
pub struct UnknownTransition(pub String);
