use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A regional chapter. Not subject to the moderation workflow; chapters
/// are admin-managed directly.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
pub struct Chapter {
    pub id: Uuid,
    pub location: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewChapter {
    pub location: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateChapter {
    pub location: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}
