use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

use crate::db::queries::requests::*;

pub fn request_routes() -> Router<PgPool> {
    Router::new()
        .route("/requests", get(get_requests))
        .route("/requests/{id}", get(get_request_by_id))
        .route("/requests/{id}/approve", post(approve_request))
        .route("/requests/{id}/reject", post(reject_request))
}
