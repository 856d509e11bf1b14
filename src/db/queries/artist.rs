use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::db::models::artist::{Artist, ImagePreference, NewArtist, UpdateArtist};
use crate::db::models::requests::{EntityStatus, RequestStatus, RequestType};
use crate::db::queries::requests::{create_request, find_pending_for_artist};
use crate::middleware::auth::{Actor, AdminPolicy};
use crate::utils::api_response::ApiResponse;
use crate::workflow::cleanup::membership_removal_plan;
use crate::workflow::merge::resolve_artist_view;
use crate::workflow::payload::{ArtistAddPayload, ArtistEditPayload};
use crate::workflow::plan::{execute_batch, ArtistSeed, Statement};

const ARTIST_COLUMNS: &str =
    "id, name, location, bio, image, image_preference, owner_id, members, status, chapters, \
     created_at";

async fn fetch_artist(pool: &PgPool, artist_id: Uuid) -> Result<Option<Artist>, sqlx::Error> {
    sqlx::query_as::<_, Artist>(&format!("SELECT {ARTIST_COLUMNS} FROM artists WHERE id = $1"))
        .bind(artist_id)
        .fetch_optional(pool)
        .await
}

/// Edits are restricted to current members; admins may edit any act.
fn may_edit_artist(artist: &Artist, actor_id: Uuid, is_admin: bool) -> bool {
    is_admin || artist.members.0.contains(&actor_id)
}

/// Build the pending seed and the matching review payload for a new act.
/// The submitter is always a member, and the act starts out with the
/// submitter's profile image.
fn artist_submission(
    actor_id: Uuid,
    image: Option<String>,
    body: &NewArtist,
) -> (ArtistSeed, ArtistAddPayload) {
    let mut members = body.members.clone();
    if !members.contains(&actor_id) {
        members.push(actor_id);
    }

    let payload = ArtistAddPayload {
        name: body.name.clone(),
        location: body.location.clone(),
        bio: body.bio.clone(),
        chapters: Some(body.chapters.clone()),
        members: Some(members.clone()),
    };
    let seed = ArtistSeed {
        id: Uuid::new_v4(),
        name: body.name.clone(),
        location: body.location.clone(),
        bio: body.bio.clone(),
        image,
        owner_id: actor_id,
        status: EntityStatus::Pending,
        members,
        chapters: body.chapters.clone(),
    };
    (seed, payload)
}

#[utoipa::path(
    get,
    path = "/artists",
    responses(
        (status = 200, description = "Approved artist roster", body = [Artist]),
        (status = 500, description = "Failed to retrieve artists")
    ),
    tag = "Artists"
)]
pub async fn get_public_artists(
    State(pool): State<PgPool>,
) -> Result<ApiResponse<Vec<Artist>>, ApiResponse<()>> {
    // The public roster never shows pending acts or pending edits.
    let artists = sqlx::query_as::<_, Artist>(&format!(
        "SELECT {ARTIST_COLUMNS} FROM artists WHERE status = 'approved' ORDER BY name"
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve artists", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Artists retrieved successfully",
        artists,
    ))
}

#[utoipa::path(
    get,
    path = "/artists/{id}",
    params(
        ("id" = Uuid, Path, description = "Artist ID")
    ),
    responses(
        (status = 200, description = "Artist resolved for the viewer", body = Artist),
        (status = 404, description = "Artist not found")
    ),
    tag = "Artists",
    security(("bearerAuth" = []))
)]
pub async fn get_artist(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Artist>, ApiResponse<()>> {
    let artist = fetch_artist(&pool, id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve artist", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("Artist not found"))?;

    let pending = find_pending_for_artist(&pool, id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve pending edits", e))?;

    let viewer = actor.viewer(&policy);
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Artist retrieved successfully",
        resolve_artist_view(&artist, pending.as_ref(), &viewer),
    ))
}

#[utoipa::path(
    post,
    path = "/artists",
    request_body = NewArtist,
    responses(
        (status = 201, description = "Artist submitted for review", body = Artist),
        (status = 403, description = "A performing role is required")
    ),
    tag = "Artists",
    security(("bearerAuth" = []))
)]
pub async fn create_artist(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Json(body): Json<NewArtist>,
) -> Result<ApiResponse<Artist>, ApiResponse<()>> {
    if !actor.role.is_performing() && !policy.is_admin(&actor.email) {
        return Err(ApiResponse::<()>::forbidden(
            "A performing role is required to create an artist",
        ));
    }

    let image = sqlx::query_scalar::<_, Option<String>>("SELECT image FROM users WHERE id = $1")
        .bind(actor.id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve user", e))?
        .flatten();

    let (seed, payload) = artist_submission(actor.id, image, &body);
    let artist_id = seed.id;
    let data = serde_json::to_value(&payload).map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode request payload",
            Some(serde_json::json!({ "error": e.to_string() })),
        )
    })?;

    // The pending row and its review request land in one transaction so a
    // half-created act can never appear in the queue.
    execute_batch(
        &pool,
        vec![
            Statement::InsertArtist(seed),
            Statement::InsertRequest {
                request_id: Uuid::new_v4(),
                user_id: actor.id,
                request_type: RequestType::ArtistAdd,
                target_id: Some(artist_id),
                data,
            },
        ],
    )
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to create artist", e))?;

    let artist = fetch_artist(&pool, artist_id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve artist", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("Artist not found"))?;

    info!(artist_id = %artist_id, owner = %actor.id, "artist submitted for review");
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Artist submitted for review",
        artist,
    ))
}

#[utoipa::path(
    put,
    path = "/artists/{id}",
    params(
        ("id" = Uuid, Path, description = "Artist ID")
    ),
    request_body = UpdateArtist,
    responses(
        (status = 200, description = "Edit applied directly (admin)"),
        (status = 201, description = "Edit submitted for review"),
        (status = 403, description = "Only a member or an admin may edit"),
        (status = 404, description = "Artist not found"),
        (status = 409, description = "A matching edit is already pending")
    ),
    tag = "Artists",
    security(("bearerAuth" = []))
)]
pub async fn update_artist(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateArtist>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let artist = fetch_artist(&pool, id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve artist", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("Artist not found"))?;

    let is_admin = policy.is_admin(&actor.email);
    if !may_edit_artist(&artist, actor.id, is_admin) {
        return Err(ApiResponse::<()>::forbidden(
            "Only a member or an admin may edit an artist",
        ));
    }

    if body.admin_action && is_admin {
        let mut statements = vec![Statement::UpdateArtist {
            artist_id: id,
            name: body.name,
            location: body.location,
            bio: body.bio,
            image: body.image,
            chapters: body.chapters,
            members: body.members,
            status: EntityStatus::Approved,
        }];
        if let Some(review_request_id) = body.review_request_id {
            statements.push(Statement::SetRequestStatus {
                request_id: review_request_id,
                status: RequestStatus::Approved,
            });
        }

        execute_batch(&pool, statements)
            .await
            .map_err(|e| ApiResponse::<()>::db_error("Failed to update artist", e))?;

        info!(artist_id = %id, "artist updated by admin");
        return Ok(ApiResponse::success(StatusCode::OK, "Artist updated", ()));
    }

    let payload = ArtistEditPayload {
        name: body.name,
        location: body.location,
        bio: body.bio,
        image: body.image,
        chapters: Some(body.chapters),
        members: Some(body.members),
    };
    let data = serde_json::to_value(&payload).map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode request payload",
            Some(serde_json::json!({ "error": e.to_string() })),
        )
    })?;

    create_request(&pool, actor.id, RequestType::ArtistEdit, Some(id), data).await?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Artist edit submitted for review",
        (),
    ))
}

#[utoipa::path(
    delete,
    path = "/artists/{id}",
    params(
        ("id" = Uuid, Path, description = "Artist ID")
    ),
    responses(
        (status = 200, description = "Artist and its requests deleted"),
        (status = 403, description = "Only the owner or an admin may delete"),
        (status = 404, description = "Artist not found")
    ),
    tag = "Artists",
    security(("bearerAuth" = []))
)]
pub async fn delete_artist(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let artist = fetch_artist(&pool, id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve artist", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("Artist not found"))?;

    if artist.owner_id != actor.id && !policy.is_admin(&actor.email) {
        return Err(ApiResponse::<()>::forbidden(
            "Only the owner or an admin may delete an artist",
        ));
    }

    // Requests targeting the artist go with it; orphaned review items would
    // otherwise fail on approval.
    execute_batch(
        &pool,
        vec![
            Statement::DeleteArtist { artist_id: id },
            Statement::DeleteRequestsTargeting { target_id: id },
        ],
    )
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to delete artist", e))?;

    info!(artist_id = %id, "artist deleted");
    Ok(ApiResponse::success(StatusCode::OK, "Artist deleted", ()))
}

#[utoipa::path(
    post,
    path = "/artists/{id}/leave",
    params(
        ("id" = Uuid, Path, description = "Artist ID")
    ),
    responses(
        (status = 200, description = "Left the artist; the act is deleted when no members remain"),
        (status = 404, description = "Artist not found, or the caller is not a member")
    ),
    tag = "Artists",
    security(("bearerAuth" = []))
)]
pub async fn leave_artist(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let artist = fetch_artist(&pool, id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve artist", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("Artist not found"))?;

    if !artist.members.0.contains(&actor.id) {
        return Err(ApiResponse::<()>::not_found(
            "You are not a member of this artist",
        ));
    }

    let plan = membership_removal_plan(actor.id, std::slice::from_ref(&artist));
    execute_batch(&pool, plan)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to leave artist", e))?;

    info!(artist_id = %id, user_id = %actor.id, "member left artist");
    Ok(ApiResponse::success(StatusCode::OK, "Left artist", ()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        get_public_artists,
        get_artist,
        create_artist,
        update_artist,
        delete_artist,
        leave_artist
    ),
    components(schemas(Artist, NewArtist, UpdateArtist, ImagePreference)),
    tags(
        (name = "Artists", description = "Artist roster, submissions, and membership")
    )
)]
pub struct ArtistDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json as SqlJson;

    fn test_artist(members: Vec<Uuid>) -> Artist {
        Artist {
            id: Uuid::new_v4(),
            name: "The Regulars".into(),
            location: None,
            bio: None,
            image: None,
            image_preference: ImagePreference::Provider,
            owner_id: members.first().copied().unwrap_or_else(Uuid::new_v4),
            members: SqlJson(members),
            status: EntityStatus::Approved,
            chapters: SqlJson(vec![]),
            created_at: None,
        }
    }

    #[test]
    fn members_may_edit_their_act() {
        let member = Uuid::new_v4();
        let artist = test_artist(vec![member]);
        assert!(may_edit_artist(&artist, member, false));
    }

    #[test]
    fn non_members_may_not_edit_without_admin() {
        let artist = test_artist(vec![Uuid::new_v4()]);
        let outsider = Uuid::new_v4();
        assert!(!may_edit_artist(&artist, outsider, false));
        assert!(may_edit_artist(&artist, outsider, true));
    }

    #[test]
    fn submitter_is_always_a_member() {
        let actor = Uuid::new_v4();
        let other = Uuid::new_v4();
        let body = NewArtist {
            name: "Duo".into(),
            location: None,
            bio: None,
            chapters: vec![],
            members: vec![other],
        };

        let (seed, payload) = artist_submission(actor, None, &body);
        assert_eq!(seed.members, vec![other, actor]);
        assert_eq!(payload.members, Some(vec![other, actor]));
        assert_eq!(seed.owner_id, actor);
    }

    #[test]
    fn submission_seed_carries_creator_image() {
        let actor = Uuid::new_v4();
        let body = NewArtist {
            name: "Solo".into(),
            location: None,
            bio: None,
            chapters: vec![],
            members: vec![actor],
        };

        let (seed, _) = artist_submission(actor, Some("/media/me.jpg".into()), &body);
        assert_eq!(seed.image.as_deref(), Some("/media/me.jpg"));
        assert_eq!(seed.status, EntityStatus::Pending);
    }
}
