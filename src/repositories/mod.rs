//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations. Multi-row
//! mutations open their own transaction; shared recomputation helpers take
//! any connection so they can run inside it.

pub mod entity;
pub mod review;
pub mod user_profile;
pub mod vote;

pub use entity::{EntityFilter, EntityPage, EntityRepository};
pub use review::{ReviewRepository, ReviewWithEntity, SubmissionOutcome};
pub use user_profile::{DeletionSummary, UserProfileRepository};
pub use vote::VoteRepository;
