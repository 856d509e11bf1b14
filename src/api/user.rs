use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;

use crate::db::queries::user::*;

pub fn user_routes() -> Router<PgPool> {
    Router::new()
        .route("/users", get(get_all_users))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}", put(admin_update_user))
        .route("/users/{id}", delete(delete_user))
        .route("/users/me/profile", put(update_profile))
        .route("/users/me/role", post(submit_role_change))
        .route("/users/me/setup", post(user_setup))
}
