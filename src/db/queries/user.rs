use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use sqlx::types::Json as SqlJson;
use sqlx::PgPool;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::db::models::requests::{ModerationRequest, RequestStatus, RequestType};
use crate::db::models::user::{
    AdminUpdateUser, Role, RoleChangeBody, UpdateProfile, User, UserSetup,
};
use crate::db::queries::requests::{create_request, find_pending_for_user};
use crate::middleware::auth::{Actor, ActorCache, AdminPolicy};
use crate::utils::api_response::ApiResponse;
use crate::workflow::approval::{
    artists_with_member, pending_artist_proposals, synthesize_solo_artist, SoloArtistSeed,
};
use crate::workflow::cleanup::{
    membership_removal_plan, stale_request_rejections, user_deletion_plan,
};
use crate::workflow::merge::{resolve_user_view, Viewer};
use crate::workflow::payload::{RoleChangePayload, UserEditPayload};
use crate::workflow::plan::{execute_batch, Statement};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, image, location, bio, chapters, director_chapters, \
     created_at, updated_at";

/// A user row resolved for a viewer: the pending proposal (if any) overlaid
/// per the display policy.
pub async fn fetch_user_view(
    pool: &PgPool,
    user_id: Uuid,
    viewer: &Viewer,
) -> Result<Option<User>, sqlx::Error> {
    let Some(user) =
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(pool)
            .await?
    else {
        return Ok(None);
    };

    let pending = find_pending_for_user(pool, user_id).await?;
    Ok(Some(resolve_user_view(&user, pending.as_ref(), viewer)))
}

fn payload_value<T: serde::Serialize>(payload: &T) -> Result<serde_json::Value, ApiResponse<()>> {
    serde_json::to_value(payload).map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode request payload",
            Some(serde_json::json!({ "error": e.to_string() })),
        )
    })
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "List all users", body = [User]),
        (status = 500, description = "Failed to retrieve users")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn get_all_users(
    State(pool): State<PgPool>,
) -> Result<ApiResponse<Vec<User>>, ApiResponse<()>> {
    let users =
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY name"))
            .fetch_all(&pool)
            .await
            .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve users", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Users retrieved successfully",
        users,
    ))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User resolved for the viewer", body = User),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn get_user(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<User>, ApiResponse<()>> {
    let viewer = actor.viewer(&policy);
    let user = fetch_user_view(&pool, id, &viewer)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve user", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("User not found"))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "User retrieved successfully",
        user,
    ))
}

#[utoipa::path(
    put,
    path = "/users/me/profile",
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated directly (admin)"),
        (status = 201, description = "Profile edit submitted for review", body = ModerationRequest),
        (status = 409, description = "A matching request is already pending")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn update_profile(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Extension(actor_cache): Extension<ActorCache>,
    Json(body): Json<UpdateProfile>,
) -> Result<ApiResponse<Option<ModerationRequest>>, ApiResponse<()>> {
    // Admins edit themselves directly; everyone else queues for review.
    if policy.is_admin(&actor.email) {
        let current = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(actor.id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve user", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("User not found"))?;

        execute_batch(
            &pool,
            vec![Statement::UpdateUserProfile {
                user_id: actor.id,
                name: body.name.or(current.name),
                location: body.location.or(current.location),
                bio: body.bio.or(current.bio),
                chapters: body.chapters.unwrap_or(current.chapters.0),
                role: body.role.unwrap_or(current.role),
                director_chapters: body
                    .director_chapters
                    .or(current.director_chapters.map(|d| d.0)),
            }],
        )
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to update profile", e))?;

        actor_cache.invalidate(&actor.id);
        return Ok(ApiResponse::success(StatusCode::OK, "Profile updated", None));
    }

    let payload = UserEditPayload {
        name: body.name,
        location: body.location,
        bio: body.bio,
        chapters: body.chapters,
        role: body.role,
        director_chapters: body.director_chapters,
    };

    let request = create_request(
        &pool,
        actor.id,
        RequestType::UserEdit,
        Some(actor.id),
        payload_value(&payload)?,
    )
    .await?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Profile edit submitted for review",
        Some(request),
    ))
}

#[utoipa::path(
    post,
    path = "/users/me/role",
    request_body = RoleChangeBody,
    responses(
        (status = 201, description = "Role change submitted for review", body = ModerationRequest),
        (status = 409, description = "A matching request is already pending")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn submit_role_change(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<RoleChangeBody>,
) -> Result<ApiResponse<ModerationRequest>, ApiResponse<()>> {
    // There is no privileged direct path for self role changes; even admins
    // go through the queue.
    let payload = RoleChangePayload {
        role: body.role,
        location: body.location,
        bio: body.bio,
        chapters: None,
        director_chapters: if body.director_chapters.is_empty() {
            None
        } else {
            Some(body.director_chapters)
        },
    };

    let request = create_request(
        &pool,
        actor.id,
        RequestType::RoleChange,
        Some(actor.id),
        payload_value(&payload)?,
    )
    .await?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Role change submitted for review",
        request,
    ))
}

#[utoipa::path(
    post,
    path = "/users/me/setup",
    request_body = UserSetup,
    responses(
        (status = 200, description = "Setup applied; role request queued when a performing role was chosen"),
        (status = 409, description = "A matching role request is already pending")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn user_setup(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<UserSetup>,
) -> Result<ApiResponse<Option<ModerationRequest>>, ApiResponse<()>> {
    // Basics apply directly; a performing role still needs approval.
    execute_batch(
        &pool,
        vec![Statement::UpdateUserBasics {
            user_id: actor.id,
            location: body.location.clone(),
            bio: body.bio.clone(),
            chapters: body.chapters.clone(),
        }],
    )
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to apply setup", e))?;

    let request = match body.role {
        Some(role) if role != Role::Audience => {
            let payload = RoleChangePayload {
                role,
                location: body.location,
                bio: body.bio,
                chapters: Some(body.chapters),
                director_chapters: if body.director_chapters.is_empty() {
                    None
                } else {
                    Some(body.director_chapters)
                },
            };
            Some(
                create_request(
                    &pool,
                    actor.id,
                    RequestType::RoleChange,
                    Some(actor.id),
                    payload_value(&payload)?,
                )
                .await?,
            )
        }
        _ => None,
    };

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Setup applied",
        request,
    ))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = AdminUpdateUser,
    responses(
        (status = 200, description = "User updated directly"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn admin_update_user(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Extension(actor_cache): Extension<ActorCache>,
    Path(id): Path<Uuid>,
    Json(body): Json<AdminUpdateUser>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    if !policy.is_admin(&actor.email) {
        return Err(ApiResponse::<()>::forbidden(
            "Administrator privileges required",
        ));
    }

    let image = sqlx::query_scalar::<_, Option<String>>("SELECT image FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve user", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("User not found"))?;

    let mut statements = vec![Statement::UpdateUserProfile {
        user_id: id,
        name: body.name.clone(),
        location: body.location.clone(),
        bio: body.bio.clone(),
        chapters: body.chapters.clone(),
        role: body.role,
        director_chapters: if body.director_chapters.is_empty() {
            None
        } else {
            Some(body.director_chapters.clone())
        },
    }];

    // A direct admin edit can settle the request it was reviewing.
    if let Some(review_request_id) = body.review_request_id {
        statements.push(Statement::SetRequestStatus {
            request_id: review_request_id,
            status: RequestStatus::Approved,
        });
    }

    if body.role.is_performing() {
        let owned_artist_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM artists WHERE owner_id = $1)",
        )
        .bind(id)
        .fetch_one(&pool)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to check owned artists", e))?;

        if !owned_artist_exists {
            let seed = SoloArtistSeed {
                name: body.name.clone(),
                image,
                chapters: SqlJson(body.chapters.clone()),
            };
            statements.push(synthesize_solo_artist(
                id,
                body.name,
                body.location,
                body.bio,
                &seed,
            ));
        }
    } else if body.role == Role::Audience {
        let member_artists = artists_with_member(&pool, id)
            .await
            .map_err(|e| ApiResponse::<()>::db_error("Failed to scan memberships", e))?;
        let pending = pending_artist_proposals(&pool)
            .await
            .map_err(|e| ApiResponse::<()>::db_error("Failed to scan pending requests", e))?;

        statements.extend(membership_removal_plan(id, &member_artists));
        statements.extend(stale_request_rejections(id, &pending));
    }

    execute_batch(&pool, statements)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to update user", e))?;

    // The cached actor may still carry the old role; drop it so the next
    // request re-reads the row.
    actor_cache.invalidate(&id);

    info!(user_id = %id, "user updated by admin");
    Ok(ApiResponse::success(StatusCode::OK, "User updated", ()))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User and dependent rows deleted"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Extension(actor_cache): Extension<ActorCache>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    if !policy.is_admin(&actor.email) {
        return Err(ApiResponse::<()>::forbidden(
            "Administrator privileges required",
        ));
    }

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(&pool)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to check user", e))?;
    if !exists {
        return Err(ApiResponse::<()>::not_found("User not found"));
    }

    // The cascade needs every artist row to split owned acts from mere
    // memberships, plus the pending proposals that may reference the user.
    let all_artists = sqlx::query_as::<_, crate::db::models::artist::Artist>(
        "SELECT id, name, location, bio, image, image_preference, owner_id, members, status, \
         chapters, created_at FROM artists",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to scan artists", e))?;

    let pending = pending_artist_proposals(&pool)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to scan pending requests", e))?;

    let plan = user_deletion_plan(id, &all_artists, &pending);
    execute_batch(&pool, plan)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to delete user", e))?;

    // A cached actor would keep the deleted user's token working.
    actor_cache.invalidate(&id);

    info!(user_id = %id, "user deleted");
    Ok(ApiResponse::success(StatusCode::OK, "User deleted", ()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        get_all_users,
        get_user,
        update_profile,
        submit_role_change,
        user_setup,
        admin_update_user,
        delete_user
    ),
    components(schemas(User, UpdateProfile, RoleChangeBody, UserSetup, AdminUpdateUser, Role)),
    tags(
        (name = "Users", description = "Membership profiles and the self-service edit entry points")
    )
)]
pub struct UserDoc;
