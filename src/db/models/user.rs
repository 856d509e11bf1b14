use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum Role {
    Admin,
    Musician,
    Audience,
    ChapterDirector,
}

impl Role {
    /// Roles that appear in the artist directory and may own artist records.
    pub fn is_performing(&self) -> bool {
        matches!(self, Role::Musician | Role::ChapterDirector)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub image: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    /// Chapter ids the user follows. Denormalized; not enforced by the store.
    #[schema(value_type = Vec<Uuid>)]
    pub chapters: Json<Vec<Uuid>>,
    /// Chapter ids the user directs. Only meaningful for chapter directors.
    #[schema(value_type = Option<Vec<Uuid>>)]
    pub director_chapters: Option<Json<Vec<Uuid>>>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Self-service profile edit. Routed through the moderation workflow.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub chapters: Option<Vec<Uuid>>,
    pub role: Option<Role>,
    pub director_chapters: Option<Vec<Uuid>>,
}

/// First-login setup: basics apply directly, a performing role becomes
/// a role-change request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UserSetup {
    pub location: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Uuid>,
    pub role: Option<Role>,
    #[serde(default)]
    pub director_chapters: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleChangeBody {
    pub role: Role,
    #[serde(default)]
    pub director_chapters: Vec<Uuid>,
    pub location: Option<String>,
    pub bio: Option<String>,
}

/// Admin-side direct user update. Bypasses the request workflow and may
/// settle a pending request in the same batch.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminUpdateUser {
    pub name: Option<String>,
    pub role: Role,
    pub location: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Uuid>,
    #[serde(default)]
    pub director_chapters: Vec<Uuid>,
    pub review_request_id: Option<Uuid>,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
}
