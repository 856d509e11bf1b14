use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Extension, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::api::auth::Claims;
use crate::config::Config;
use crate::db::models::user::Role;
use crate::utils::api_response::ApiResponse;
use crate::workflow::merge::Viewer;

/// ✅ Authenticated-actor cache using `moka` (TTL = 10 minutes)
pub type ActorCache = Arc<Cache<Uuid, Actor>>;

pub fn create_actor_cache() -> ActorCache {
    Arc::new(
        Cache::builder()
            .time_to_live(Duration::from_secs(600))
            .build(),
    )
}

/// The identity every private handler works with: the user row behind the
/// token's subject, not just the token claims.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

impl Actor {
    pub fn viewer(&self, policy: &AdminPolicy) -> Viewer {
        Viewer {
            user_id: Some(self.id),
            is_admin: policy.is_admin(&self.email),
        }
    }
}

/// The administrator capability: a fixed email allow-list, injected where
/// authorization decisions are made instead of consulted as global state.
#[derive(Debug, Clone)]
pub struct AdminPolicy {
    admins: Arc<Vec<String>>,
}

impl AdminPolicy {
    pub fn new(emails: Vec<String>) -> Self {
        Self {
            admins: Arc::new(emails.into_iter().map(|e| e.to_lowercase()).collect()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.admin_emails.clone())
    }

    pub fn is_admin(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.admins.iter().any(|admin| *admin == email)
    }
}

/// ✅ **JWT Middleware** (Handles Token Authentication)
pub async fn jwt_middleware(mut req: Request<Body>, next: Next) -> Result<Response, Response> {
    // Step 1: Extract Authorization header
    let auth_header = req.headers().get("Authorization").ok_or_else(|| {
        tracing::warn!("Missing Authorization header");
        ApiResponse::<()>::unauthorized("Missing Authorization header").into_response()
    })?;

    // Step 2: Convert header to string
    let token_str = auth_header.to_str().map_err(|_| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid Authorization header format",
            None,
        )
        .into_response()
    })?;

    // Step 3: Strip "Bearer " prefix
    let token = token_str.strip_prefix("Bearer ").ok_or_else(|| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid token format (missing 'Bearer ' prefix)",
            None,
        )
        .into_response()
    })?;

    // Step 4: Decode the JWT token
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(Config::get().jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::warn!("JWT decoding failed: {:?}", e);
        ApiResponse::<()>::unauthorized("Invalid token").into_response()
    })?;

    // Step 5: Insert claims into request extensions and proceed
    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// Resolve the token's subject to its user row (cached) and attach it as
/// an [`Actor`] extension.
pub async fn actor_middleware(
    State(db_pool): State<PgPool>,
    Extension(actor_cache): Extension<ActorCache>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let claims = req.extensions().get::<Claims>().cloned().ok_or_else(|| {
        error!("Missing JWT claims in request");
        ApiResponse::<()>::unauthorized("Missing JWT claims in request").into_response()
    })?;

    let user_id: Uuid = claims.sub.parse().map_err(|_| {
        ApiResponse::<()>::unauthorized("Invalid user ID format in JWT claims").into_response()
    })?;

    // ✅ Check cache first before querying DB
    if let Some(actor) = actor_cache.get(&user_id) {
        req.extensions_mut().insert(actor);
        return Ok(next.run(req).await);
    }

    let actor =
        sqlx::query_as::<_, Actor>("SELECT id, email, name, role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&db_pool)
            .await
            .map_err(|e| {
                error!("Failed to load actor: {:?}", e);
                ApiResponse::<()>::db_error("Failed to load user", e).into_response()
            })?
            .ok_or_else(|| {
                ApiResponse::<()>::unauthorized("Token subject no longer exists").into_response()
            })?;

    actor_cache.insert(user_id, actor.clone());
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_policy_matches_case_insensitively() {
        let policy = AdminPolicy::new(vec!["Director@Example.org".into()]);
        assert!(policy.is_admin("director@example.org"));
        assert!(policy.is_admin("DIRECTOR@EXAMPLE.ORG"));
        assert!(!policy.is_admin("someone@example.org"));
    }

    #[test]
    fn empty_allow_list_grants_nobody() {
        let policy = AdminPolicy::new(vec![]);
        assert!(!policy.is_admin("anyone@example.org"));
    }

    #[test]
    fn invalidated_actor_is_evicted_before_ttl() {
        let cache = create_actor_cache();
        let id = Uuid::new_v4();
        cache.insert(
            id,
            Actor {
                id,
                email: "performer@example.org".into(),
                name: None,
                role: Role::Audience,
            },
        );
        assert!(cache.get(&id).is_some());

        // Role changes invalidate the entry so the next request re-reads
        // the user row instead of waiting out the TTL.
        cache.invalidate(&id);
        assert!(cache.get(&id).is_none());
    }
}
