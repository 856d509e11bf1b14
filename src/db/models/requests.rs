// src/db/models/requests.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "request_type", rename_all = "snake_case")]
pub enum RequestType {
    RoleChange,
    UserEdit,
    ArtistEdit,
    ArtistAdd,
    BookingInquiry,
    BookingEdit,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Moderation status for artist and booking rows. Unlike requests there is
/// no rejected state: a rejected submission is deleted, not retained.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "entity_status", rename_all = "snake_case")]
pub enum EntityStatus {
    Pending,
    Approved,
}

/// A persisted change-proposal, reviewed by an admin before any entity
/// table is touched. `data` holds the type-specific payload (see
/// `workflow::payload`); `target_id` is a weak reference, and the target
/// may be deleted out from under a pending request.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow, ToSchema)]
pub struct ModerationRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub request_type: RequestType,
    pub target_id: Option<Uuid>,
    pub data: serde_json::Value,
    pub status: RequestStatus,
    pub created_at: Option<NaiveDateTime>,
}

/// Admin-queue row: a request joined with its submitter's display fields.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ModerationRequestRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub request_type: RequestType,
    pub target_id: Option<Uuid>,
    pub data: serde_json::Value,
    pub status: RequestStatus,
    pub created_at: Option<NaiveDateTime>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}
