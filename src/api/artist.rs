use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;

use crate::db::queries::artist::*;

/// Routes that render without a session: the approved roster only.
pub fn public_artist_routes() -> Router<PgPool> {
    Router::new().route("/artists", get(get_public_artists))
}

pub fn artist_routes() -> Router<PgPool> {
    Router::new()
        .route("/artists", post(create_artist))
        .route("/artists/{id}", get(get_artist))
        .route("/artists/{id}", put(update_artist))
        .route("/artists/{id}", delete(delete_artist))
        .route("/artists/{id}/leave", post(leave_artist))
}
