//! # Review Domain Rules
//!
//! Pure rules shared by every entity kind: category sets, rating means and
//! aggregates, the submission threshold, the moderation state machine, slug
//! derivation, route key resolution and display ordering.

use std::collections::BTreeMap;

use thiserror::Error;

pub mod kind;
pub mod moderation;
pub mod ranking;
pub mod rating;
pub mod resolver;
pub mod slug;
pub mod submission;

pub use kind::EntityKind;
pub use moderation::{ModerationAction, ReviewStatus};
pub use rating::RatingSet;
pub use resolver::EntityKey;
pub use submission::{EntityIdentity, ReviewDraft, SubmissionLimits, ValidatedReview};

/// Errors raised by domain rules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("validation failed")]
    Validation(BTreeMap<String, String>),
    #[error("unknown entity kind '{0}'")]
    UnknownKind(String),
    #[error("unknown review status '{0}'")]
    UnknownStatus(String),
    #[error("unknown moderation action '{0}'")]
    UnknownAction(String),
    #[error("cannot {action} a review that is {from}")]
    InvalidTransition {
        action: ModerationAction,
        from: ReviewStatus,
    },
    #[error("stored ratings are invalid: {0}")]
    CorruptRatings(String),
}
