use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
};
use serde_json::json;
use sqlx::PgPool;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::db::models::requests::{
    ModerationRequest, ModerationRequestRow, RequestStatus, RequestType,
};
use crate::middleware::auth::{Actor, ActorCache, AdminPolicy};
use crate::utils::api_response::ApiResponse;
use crate::workflow::approval::{ApprovalEngine, ApprovalError};
use crate::workflow::PlanError;

const REQUEST_COLUMNS: &str = "id, user_id, request_type, target_id, data, status, created_at";

/// Insert a new PENDING request on behalf of `submitter`. Submission never
/// touches entity tables. Returns 409 when an identical-shaped request is
/// already pending, so racing proposals on one target cannot pile up.
pub async fn create_request(
    pool: &PgPool,
    submitter: Uuid,
    request_type: RequestType,
    target_id: Option<Uuid>,
    data: serde_json::Value,
) -> Result<ModerationRequest, ApiResponse<()>> {
    let duplicate_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM requests \
         WHERE request_type = $1 AND user_id = $2 AND target_id IS NOT DISTINCT FROM $3 \
         AND status = 'pending')",
    )
    .bind(request_type)
    .bind(submitter)
    .bind(target_id)
    .fetch_one(pool)
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to check for duplicate request", e))?;

    if duplicate_exists {
        return Err(ApiResponse::<()>::conflict(
            "A matching request is already pending",
        ));
    }

    sqlx::query_as::<_, ModerationRequest>(&format!(
        "INSERT INTO requests (id, user_id, request_type, target_id, data, status) \
         VALUES ($1, $2, $3, $4, $5, 'pending') RETURNING {REQUEST_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(submitter)
    .bind(request_type)
    .bind(target_id)
    .bind(data)
    .fetch_one(pool)
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to insert request", e))
}

/// The single latest pending proposal relevant to a user profile: an edit
/// targeting them, or a role change they submitted.
pub async fn find_pending_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<ModerationRequest>, sqlx::Error> {
    sqlx::query_as::<_, ModerationRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM requests WHERE status = 'pending' \
         AND ((request_type = 'user_edit' AND target_id = $1) \
           OR (request_type = 'role_change' AND user_id = $1)) \
         ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_pending_for_artist(
    pool: &PgPool,
    artist_id: Uuid,
) -> Result<Option<ModerationRequest>, sqlx::Error> {
    sqlx::query_as::<_, ModerationRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM requests WHERE status = 'pending' \
         AND request_type IN ('artist_edit', 'artist_add') AND target_id = $1 \
         ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(artist_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_pending_for_booking(
    pool: &PgPool,
    booking_id: Uuid,
) -> Result<Option<ModerationRequest>, sqlx::Error> {
    sqlx::query_as::<_, ModerationRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM requests WHERE status = 'pending' \
         AND request_type IN ('booking_edit', 'booking_inquiry') AND target_id = $1 \
         ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(booking_id)
    .fetch_optional(pool)
    .await
}

fn approval_error_response(e: ApprovalError) -> ApiResponse<()> {
    match e {
        ApprovalError::Forbidden => {
            ApiResponse::<()>::forbidden("Administrator privileges required")
        }
        ApprovalError::NotFound => {
            ApiResponse::<()>::not_found("Request or target entity not found")
        }
        ApprovalError::AlreadyModerated(status) => {
            ApiResponse::<()>::conflict(format!("Request is already {status:?}"))
        }
        ApprovalError::Plan(PlanError::MalformedPayload(e)) => ApiResponse::<()>::error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Request payload is malformed",
            Some(json!({ "error": e.to_string() })),
        ),
        ApprovalError::Plan(PlanError::MissingTarget) => ApiResponse::<()>::error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Request has no target entity",
            None,
        ),
        ApprovalError::Db(e) => ApiResponse::<()>::db_error("Failed to apply request", e),
    }
}

#[utoipa::path(
    get,
    path = "/requests",
    responses(
        (status = 200, description = "Pending requests (admins: all, newest first; others: own submissions)", body = Vec<ModerationRequestRow>),
        (status = 500, description = "Failed to retrieve requests")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn get_requests(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
) -> Result<ApiResponse<Vec<ModerationRequestRow>>, ApiResponse<()>> {
    let requests = if policy.is_admin(&actor.email) {
        sqlx::query_as::<_, ModerationRequestRow>(
            "SELECT r.id, r.user_id, r.request_type, r.target_id, r.data, r.status, r.created_at, \
                    u.name AS user_name, u.email AS user_email \
             FROM requests r LEFT JOIN users u ON u.id = r.user_id \
             WHERE r.status = 'pending' ORDER BY r.created_at DESC",
        )
        .fetch_all(&pool)
        .await
    } else {
        sqlx::query_as::<_, ModerationRequestRow>(
            "SELECT r.id, r.user_id, r.request_type, r.target_id, r.data, r.status, r.created_at, \
                    u.name AS user_name, u.email AS user_email \
             FROM requests r LEFT JOIN users u ON u.id = r.user_id \
             WHERE r.user_id = $1 ORDER BY r.created_at DESC",
        )
        .bind(actor.id)
        .fetch_all(&pool)
        .await
    }
    .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve requests", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Requests retrieved",
        requests,
    ))
}

#[utoipa::path(
    get,
    path = "/requests/{request_id}",
    params(
        ("request_id" = Uuid, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request retrieved", body = ModerationRequest),
        (status = 403, description = "Not the submitter and not an admin"),
        (status = 404, description = "Request not found")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn get_request_by_id(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Path(request_id): Path<Uuid>,
) -> Result<ApiResponse<ModerationRequest>, ApiResponse<()>> {
    let request = sqlx::query_as::<_, ModerationRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM requests WHERE id = $1"
    ))
    .bind(request_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve request", e))?
    .ok_or_else(|| ApiResponse::<()>::not_found("Request not found"))?;

    if !policy.is_admin(&actor.email) && request.user_id != actor.id {
        return Err(ApiResponse::<()>::forbidden(
            "You may only view your own requests",
        ));
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Request retrieved",
        request,
    ))
}

#[utoipa::path(
    post,
    path = "/requests/{request_id}/approve",
    params(
        ("request_id" = Uuid, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request approved and applied", body = ModerationRequest),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Request or target entity not found"),
        (status = 409, description = "Request is no longer pending"),
        (status = 422, description = "Request payload is malformed")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn approve_request(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Extension(actor_cache): Extension<ActorCache>,
    Path(request_id): Path<Uuid>,
) -> Result<ApiResponse<ModerationRequest>, ApiResponse<()>> {
    let engine = ApprovalEngine::new(pool, policy);
    let request = engine
        .approve(&actor, request_id)
        .await
        .map_err(approval_error_response)?;

    // An approved role change or profile edit rewrites the user's row; a
    // cached actor must not keep serving the old role for the TTL window.
    actor_cache.invalidate(&request.target_id.unwrap_or(request.user_id));

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Request approved",
        ModerationRequest {
            status: RequestStatus::Approved,
            ..request
        },
    ))
}

#[utoipa::path(
    post,
    path = "/requests/{request_id}/reject",
    params(
        ("request_id" = Uuid, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request rejected; no entity rows changed", body = ModerationRequest),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is no longer pending")
    ),
    tag = "Requests",
    security(("bearerAuth" = []))
)]
pub async fn reject_request(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Path(request_id): Path<Uuid>,
) -> Result<ApiResponse<ModerationRequest>, ApiResponse<()>> {
    let engine = ApprovalEngine::new(pool, policy);
    let request = engine
        .reject(&actor, request_id)
        .await
        .map_err(approval_error_response)?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Request rejected",
        ModerationRequest {
            status: RequestStatus::Rejected,
            ..request
        },
    ))
}

#[derive(OpenApi)]
#[openapi(
    paths(get_requests, get_request_by_id, approve_request, reject_request),
    components(schemas(ModerationRequest, ModerationRequestRow, RequestStatus, RequestType)),
    tags(
        (name = "Requests", description = "The moderation queue: pending change-proposals and their approval state machine")
    )
)]
pub struct RequestDoc;
