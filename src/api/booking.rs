use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;

use crate::db::queries::booking::*;

/// The events feed is the only booking surface visible without a session.
pub fn public_booking_routes() -> Router<PgPool> {
    Router::new().route("/events", get(get_public_events))
}

pub fn booking_routes() -> Router<PgPool> {
    Router::new()
        .route("/bookings", get(get_bookings))
        .route("/bookings", post(create_booking))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}", put(update_booking))
        .route("/bookings/{id}", delete(delete_booking))
        .route("/bookings/dates/{id}/visibility", patch(set_date_visibility))
}
