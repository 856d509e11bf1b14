//! The moderation workflow: non-admin mutations to core entities are
//! captured as pending requests, previewed by overlaying their payload on
//! the live entity, and committed to the entity tables only on admin
//! approval, as one atomic statement batch.

pub mod approval;
pub mod cleanup;
pub mod merge;
pub mod payload;
pub mod plan;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    /// The request's stored payload does not decode for its type. The merge
    /// engine recovers from this by skipping the overlay; the approval
    /// engine surfaces it.
    #[error("malformed request payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// The request type requires a target entity but `target_id` is null.
    #[error("request has no target entity")]
    MissingTarget,
}
