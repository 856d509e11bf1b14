use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::db::models::booking::{
    Booking, BookingDate, BookingDateInput, NewBooking, PublicEvent, UpdateBooking,
};
use crate::db::models::requests::{EntityStatus, RequestStatus, RequestType};
use crate::db::queries::requests::{create_request, find_pending_for_booking};
use crate::middleware::auth::{Actor, AdminPolicy};
use crate::utils::api_response::ApiResponse;
use crate::workflow::merge::resolve_booking_view;
use crate::workflow::payload::{BookingEditPayload, BookingInquiryPayload};
use crate::workflow::plan::{execute_batch, BookingSeed, Statement};

const BOOKING_COLUMNS: &str =
    "id, name, email, phone, questions, image, image_preference, created_by, status, created_at";

const DATE_COLUMNS: &str =
    "id, booking_id, date, time, duration, event_type, location, description, budget, is_public";

/// A booking plus its child event dates, the shape both detail views use.
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingDetail {
    pub booking: Booking,
    pub dates: Vec<BookingDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetDateVisibility {
    pub is_public: bool,
}

async fn fetch_booking(pool: &PgPool, booking_id: Uuid) -> Result<Option<Booking>, sqlx::Error> {
    sqlx::query_as::<_, Booking>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
    ))
    .bind(booking_id)
    .fetch_optional(pool)
    .await
}

async fn fetch_dates(pool: &PgPool, booking_id: Uuid) -> Result<Vec<BookingDate>, sqlx::Error> {
    sqlx::query_as::<_, BookingDate>(&format!(
        "SELECT {DATE_COLUMNS} FROM booking_dates WHERE booking_id = $1 ORDER BY date, time"
    ))
    .bind(booking_id)
    .fetch_all(pool)
    .await
}

#[utoipa::path(
    get,
    path = "/bookings",
    responses(
        (status = 200, description = "Bookings visible to the caller", body = [Booking]),
        (status = 500, description = "Failed to retrieve bookings")
    ),
    tag = "Bookings",
    security(("bearerAuth" = []))
)]
pub async fn get_bookings(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
) -> Result<ApiResponse<Vec<Booking>>, ApiResponse<()>> {
    // Admins see the whole inbox; everyone else only their own inquiries.
    let bookings = if policy.is_admin(&actor.email) {
        sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC"
        ))
        .fetch_all(&pool)
        .await
    } else {
        sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE created_by = $1 ORDER BY created_at DESC"
        ))
        .bind(actor.id)
        .fetch_all(&pool)
        .await
    }
    .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve bookings", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Bookings retrieved successfully",
        bookings,
    ))
}

#[utoipa::path(
    get,
    path = "/bookings/{id}",
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking resolved for the viewer", body = BookingDetail),
        (status = 403, description = "Not the creator or an admin"),
        (status = 404, description = "Booking not found")
    ),
    tag = "Bookings",
    security(("bearerAuth" = []))
)]
pub async fn get_booking(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<BookingDetail>, ApiResponse<()>> {
    let booking = fetch_booking(&pool, id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve booking", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("Booking not found"))?;

    if booking.created_by != actor.id && !policy.is_admin(&actor.email) {
        return Err(ApiResponse::<()>::forbidden(
            "Only the creator or an admin may view this booking",
        ));
    }

    let pending = find_pending_for_booking(&pool, id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve pending edits", e))?;
    let dates = fetch_dates(&pool, id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve booking dates", e))?;

    let viewer = actor.viewer(&policy);
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Booking retrieved successfully",
        BookingDetail {
            booking: resolve_booking_view(&booking, pending.as_ref(), &viewer),
            dates,
        },
    ))
}

#[utoipa::path(
    post,
    path = "/bookings",
    request_body = NewBooking,
    responses(
        (status = 201, description = "Booking inquiry submitted for review", body = BookingDetail),
        (status = 500, description = "Failed to create booking")
    ),
    tag = "Bookings",
    security(("bearerAuth" = []))
)]
pub async fn create_booking(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<NewBooking>,
) -> Result<ApiResponse<BookingDetail>, ApiResponse<()>> {
    let booking_id = Uuid::new_v4();
    let payload = BookingInquiryPayload {
        name: body.name.clone(),
        email: body.email.clone(),
        phone: body.phone.clone(),
    };
    let data = serde_json::to_value(&payload).map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode request payload",
            Some(serde_json::json!({ "error": e.to_string() })),
        )
    })?;

    let mut statements = vec![Statement::InsertBooking(BookingSeed {
        id: booking_id,
        name: body.name,
        email: body.email,
        phone: body.phone,
        questions: body.questions,
        created_by: actor.id,
        status: EntityStatus::Pending,
    })];
    statements.extend(body.dates.into_iter().map(|date| {
        Statement::InsertBookingDate {
            booking_id,
            date,
        }
    }));
    statements.push(Statement::InsertRequest {
        request_id: Uuid::new_v4(),
        user_id: actor.id,
        request_type: RequestType::BookingInquiry,
        target_id: Some(booking_id),
        data,
    });

    execute_batch(&pool, statements)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to create booking", e))?;

    let booking = fetch_booking(&pool, booking_id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve booking", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("Booking not found"))?;
    let dates = fetch_dates(&pool, booking_id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve booking dates", e))?;

    info!(booking_id = %booking_id, created_by = %actor.id, "booking inquiry submitted");
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Booking inquiry submitted for review",
        BookingDetail { booking, dates },
    ))
}

#[utoipa::path(
    put,
    path = "/bookings/{id}",
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    request_body = UpdateBooking,
    responses(
        (status = 200, description = "Edit applied directly (admin)"),
        (status = 201, description = "Edit submitted for review"),
        (status = 403, description = "Not the creator or an admin"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "A matching edit is already pending")
    ),
    tag = "Bookings",
    security(("bearerAuth" = []))
)]
pub async fn update_booking(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBooking>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let booking = fetch_booking(&pool, id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve booking", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("Booking not found"))?;

    if booking.created_by != actor.id && !policy.is_admin(&actor.email) {
        return Err(ApiResponse::<()>::forbidden(
            "Only the creator or an admin may edit this booking",
        ));
    }

    if body.admin_action && policy.is_admin(&actor.email) {
        let mut statements = vec![
            Statement::UpdateBookingContact {
                booking_id: id,
                name: body.name,
                email: body.email,
                phone: body.phone,
                questions: body.questions,
                status: EntityStatus::Approved,
            },
            Statement::DeleteBookingDates { booking_id: id },
        ];
        statements.extend(
            body.dates
                .into_iter()
                .map(|date| Statement::InsertBookingDate {
                    booking_id: id,
                    date,
                }),
        );
        if let Some(review_request_id) = body.review_request_id {
            statements.push(Statement::SetRequestStatus {
                request_id: review_request_id,
                status: RequestStatus::Approved,
            });
        }

        execute_batch(&pool, statements)
            .await
            .map_err(|e| ApiResponse::<()>::db_error("Failed to update booking", e))?;

        info!(booking_id = %id, "booking updated by admin");
        return Ok(ApiResponse::success(StatusCode::OK, "Booking updated", ()));
    }

    let payload = BookingEditPayload {
        name: body.name,
        email: body.email,
        phone: body.phone,
        questions: body.questions,
        dates: body.dates,
    };
    let data = serde_json::to_value(&payload).map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode request payload",
            Some(serde_json::json!({ "error": e.to_string() })),
        )
    })?;

    create_request(&pool, actor.id, RequestType::BookingEdit, Some(id), data).await?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Booking edit submitted for review",
        (),
    ))
}

#[utoipa::path(
    delete,
    path = "/bookings/{id}",
    params(
        ("id" = Uuid, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking, its dates, and its requests deleted"),
        (status = 403, description = "Not the creator or an admin"),
        (status = 404, description = "Booking not found")
    ),
    tag = "Bookings",
    security(("bearerAuth" = []))
)]
pub async fn delete_booking(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let booking = fetch_booking(&pool, id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve booking", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("Booking not found"))?;

    if booking.created_by != actor.id && !policy.is_admin(&actor.email) {
        return Err(ApiResponse::<()>::forbidden(
            "Only the creator or an admin may delete this booking",
        ));
    }

    execute_batch(
        &pool,
        vec![
            Statement::DeleteBookingDates { booking_id: id },
            Statement::DeleteRequestsTargeting { target_id: id },
            Statement::DeleteBooking { booking_id: id },
        ],
    )
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to delete booking", e))?;

    info!(booking_id = %id, "booking deleted");
    Ok(ApiResponse::success(StatusCode::OK, "Booking deleted", ()))
}

#[utoipa::path(
    patch,
    path = "/bookings/dates/{id}/visibility",
    params(
        ("id" = Uuid, Path, description = "Booking date ID")
    ),
    request_body = SetDateVisibility,
    responses(
        (status = 200, description = "Visibility updated"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Booking date not found")
    ),
    tag = "Bookings",
    security(("bearerAuth" = []))
)]
pub async fn set_date_visibility(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetDateVisibility>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    if !policy.is_admin(&actor.email) {
        return Err(ApiResponse::<()>::forbidden(
            "Administrator privileges required",
        ));
    }

    let result = sqlx::query("UPDATE booking_dates SET is_public = $1 WHERE id = $2")
        .bind(body.is_public)
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to update visibility", e))?;

    if result.rows_affected() == 0 {
        return Err(ApiResponse::<()>::not_found("Booking date not found"));
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Visibility updated",
        (),
    ))
}

#[utoipa::path(
    get,
    path = "/events",
    responses(
        (status = 200, description = "Upcoming public events", body = [PublicEvent]),
        (status = 500, description = "Failed to retrieve events")
    ),
    tag = "Bookings"
)]
pub async fn get_public_events(
    State(pool): State<PgPool>,
) -> Result<ApiResponse<Vec<PublicEvent>>, ApiResponse<()>> {
    // Only dates an admin published, and only for approved bookings.
    let events = sqlx::query_as::<_, PublicEvent>(
        "SELECT d.id, d.booking_id, d.date, d.time, d.event_type, d.location, d.description, \
         b.name AS booking_name \
         FROM booking_dates d \
         JOIN bookings b ON b.id = d.booking_id \
         WHERE d.is_public = TRUE AND b.status = 'approved' AND d.date >= CURRENT_DATE \
         ORDER BY d.date, d.time",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to retrieve events", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Events retrieved successfully",
        events,
    ))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        get_bookings,
        get_booking,
        create_booking,
        update_booking,
        delete_booking,
        set_date_visibility,
        get_public_events
    ),
    components(schemas(
        Booking,
        BookingDate,
        BookingDateInput,
        NewBooking,
        UpdateBooking,
        BookingDetail,
        SetDateVisibility,
        PublicEvent
    )),
    tags(
        (name = "Bookings", description = "Booking inquiries, event dates, and the public events feed")
    )
)]
pub struct BookingDoc;
