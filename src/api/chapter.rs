use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;

use crate::db::queries::chapter::*;

pub fn public_chapter_routes() -> Router<PgPool> {
    Router::new()
        .route("/chapters", get(get_chapters))
        .route("/chapters/{id}", get(get_chapter))
}

pub fn chapter_routes() -> Router<PgPool> {
    Router::new()
        .route("/chapters", post(create_chapter))
        .route("/chapters/{id}", put(update_chapter))
        .route("/chapters/{id}", delete(delete_chapter))
}
