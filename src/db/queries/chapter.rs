use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::db::models::chapter::{Chapter, NewChapter, UpdateChapter};
use crate::middleware::auth::{Actor, AdminPolicy};
use crate::utils::api_response::ApiResponse;

#[utoipa::path(
    get,
    path = "/chapters",
    responses(
        (status = 200, description = "List all chapters", body = [Chapter]),
        (status = 500, description = "Failed to retrieve chapters")
    ),
    tag = "Chapters"
)]
pub async fn get_chapters(
    State(pool): State<PgPool>,
) -> Result<ApiResponse<Vec<Chapter>>, ApiResponse<()>> {
    let chapters = sqlx::query_as::<_, Chapter>(
        "SELECT id, location, bio, image, created_at FROM chapters ORDER BY location",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve chapters", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Chapters retrieved successfully",
        chapters,
    ))
}

#[utoipa::path(
    get,
    path = "/chapters/{id}",
    params(
        ("id" = Uuid, Path, description = "Chapter ID")
    ),
    responses(
        (status = 200, description = "Chapter details", body = Chapter),
        (status = 404, description = "Chapter not found")
    ),
    tag = "Chapters"
)]
pub async fn get_chapter(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<Chapter>, ApiResponse<()>> {
    let chapter = sqlx::query_as::<_, Chapter>(
        "SELECT id, location, bio, image, created_at FROM chapters WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve chapter", e))?
    .ok_or_else(|| ApiResponse::<()>::not_found("Chapter not found"))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Chapter retrieved successfully",
        chapter,
    ))
}

#[utoipa::path(
    post,
    path = "/chapters",
    request_body = NewChapter,
    responses(
        (status = 201, description = "Chapter created", body = Chapter),
        (status = 403, description = "Administrator privileges required")
    ),
    tag = "Chapters",
    security(("bearerAuth" = []))
)]
pub async fn create_chapter(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Json(body): Json<NewChapter>,
) -> Result<ApiResponse<Chapter>, ApiResponse<()>> {
    if !policy.is_admin(&actor.email) {
        return Err(ApiResponse::<()>::forbidden(
            "Administrator privileges required",
        ));
    }

    let chapter = sqlx::query_as::<_, Chapter>(
        "INSERT INTO chapters (location, bio, image) VALUES ($1, $2, $3) \
         RETURNING id, location, bio, image, created_at",
    )
    .bind(body.location)
    .bind(body.bio)
    .bind(body.image)
    .fetch_one(&pool)
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to create chapter", e))?;

    info!(chapter_id = %chapter.id, "chapter created");
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Chapter created",
        chapter,
    ))
}

#[utoipa::path(
    put,
    path = "/chapters/{id}",
    params(
        ("id" = Uuid, Path, description = "Chapter ID")
    ),
    request_body = UpdateChapter,
    responses(
        (status = 200, description = "Chapter updated", body = Chapter),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Chapter not found")
    ),
    tag = "Chapters",
    security(("bearerAuth" = []))
)]
pub async fn update_chapter(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateChapter>,
) -> Result<ApiResponse<Chapter>, ApiResponse<()>> {
    if !policy.is_admin(&actor.email) {
        return Err(ApiResponse::<()>::forbidden(
            "Administrator privileges required",
        ));
    }

    let chapter = sqlx::query_as::<_, Chapter>(
        "UPDATE chapters SET location = $1, bio = $2, image = $3 WHERE id = $4 \
         RETURNING id, location, bio, image, created_at",
    )
    .bind(body.location)
    .bind(body.bio)
    .bind(body.image)
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to update chapter", e))?
    .ok_or_else(|| ApiResponse::<()>::not_found("Chapter not found"))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Chapter updated",
        chapter,
    ))
}

#[utoipa::path(
    delete,
    path = "/chapters/{id}",
    params(
        ("id" = Uuid, Path, description = "Chapter ID")
    ),
    responses(
        (status = 200, description = "Chapter deleted"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Chapter not found")
    ),
    tag = "Chapters",
    security(("bearerAuth" = []))
)]
pub async fn delete_chapter(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    if !policy.is_admin(&actor.email) {
        return Err(ApiResponse::<()>::forbidden(
            "Administrator privileges required",
        ));
    }

    let result = sqlx::query("DELETE FROM chapters WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to delete chapter", e))?;

    if result.rows_affected() == 0 {
        return Err(ApiResponse::<()>::not_found("Chapter not found"));
    }

    info!(chapter_id = %id, "chapter deleted");
    Ok(ApiResponse::success(StatusCode::OK, "Chapter deleted", ()))
}

#[derive(OpenApi)]
#[openapi(
    paths(get_chapters, get_chapter, create_chapter, update_chapter, delete_chapter),
    components(schemas(Chapter, NewChapter, UpdateChapter)),
    tags(
        (name = "Chapters", description = "Regional chapters, managed directly by admins")
    )
)]
pub struct ChapterDoc;
