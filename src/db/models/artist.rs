use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::requests::EntityStatus;

/// Where an artist's display image comes from: a custom upload, or the
/// owner's identity-provider photo.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "image_preference", rename_all = "snake_case")]
pub enum ImagePreference {
    Custom,
    Provider,
}

#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
pub struct Artist {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub image_preference: ImagePreference,
    pub owner_id: Uuid,
    /// User ids of the act's members. Denormalized; kept consistent only by
    /// the cleanup engine.
    #[schema(value_type = Vec<Uuid>)]
    pub members: Json<Vec<Uuid>>,
    pub status: EntityStatus,
    #[schema(value_type = Vec<Uuid>)]
    pub chapters: Json<Vec<Uuid>>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewArtist {
    pub name: String,
    pub location: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Uuid>,
    #[serde(default)]
    pub members: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateArtist {
    pub name: String,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Uuid>,
    #[serde(default)]
    pub members: Vec<Uuid>,
    /// When true and the caller is an admin, the edit applies directly and
    /// the artist is marked approved in the same batch.
    #[serde(default)]
    pub admin_action: bool,
    /// Pending request settled by this admin edit, if any.
    pub review_request_id: Option<Uuid>,
}
