//! Review status and the admin moderation state machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::DomainError;

/// Moderation status controlling review visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }

    /// Status assigned to a newly submitted review.
    pub fn for_submission(average: f64, auto_approve_threshold: f64) -> Self {
        if average >= auto_approve_threshold {
            ReviewStatus::Approved
        } else {
            ReviewStatus::Pending
        }
    }

    /// Status of an existing review after its author resubmits it.
    ///
    /// A review an admin rejected or hid stays rejected; only the unhide
    /// action can bring it back. Otherwise the threshold check runs again.
    pub fn for_resubmission(
        self,
        moderated: bool,
        average: f64,
        auto_approve_threshold: f64,
    ) -> Self {
        match self {
            ReviewStatus::Rejected if moderated => ReviewStatus::Rejected,
            _ => Self::for_submission(average, auto_approve_threshold),
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Admin-triggered status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    /// pending → approved
    Approve,
    /// pending → rejected
    Reject,
    /// approved → rejected
    Hide,
    /// rejected → approved
    Unhide,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::Hide => "hide",
            ModerationAction::Unhide => "unhide",
        }
    }

    /// Target status when applied to a review currently in `from`.
    pub fn apply(self, from: ReviewStatus) -> Result<ReviewStatus, DomainError> {
        use ModerationAction::*;
        use ReviewStatus::*;

        match (self, from) {
            (Approve, Pending) => Ok(Approved),
            (Reject, Pending) => Ok(Rejected),
            (Hide, Approved) => Ok(Rejected),
            (Unhide, Rejected) => Ok(Approved),
            (action, from) => Err(DomainError::InvalidTransition { action, from }),
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationAction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "approve" => Ok(ModerationAction::Approve),
            "reject" => Ok(ModerationAction::Reject),
            "hide" => Ok(ModerationAction::Hide),
            "unhide" => Ok(ModerationAction::Unhide),
            other => Err(DomainError::UnknownAction(other.to_string())),
        }
    }
}
