use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::Modify;

use crate::config::Config;
use crate::db::models::user::{Role, User, UserInfo};
use crate::db::queries::user::fetch_user_view;
use crate::middleware::auth::{Actor, AdminPolicy};
use crate::utils::api_response::ApiResponse;

/// Registers the `bearerAuth` scheme every private path references.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or(Components::default());
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        openapi.components = Some(components);
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Claims {
    /// Subject - User ID as String
    pub sub: String,
    /// Email of the authenticated user.
    pub email: String,
    /// The role assigned to the user at login time.
    pub role: Role,
    /// Expiration timestamp (UNIX TIME)
    pub exp: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    /// The caller's profile with their own pending proposal overlaid.
    pub user: User,
    pub is_admin: bool,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserInfo),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Failed to create account")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse<UserInfo>, ApiResponse<()>> {
    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to hash password",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    let email = payload.email.trim().to_lowercase();
    let user_id = Uuid::new_v4();

    let inserted = sqlx::query_as::<_, UserInfoRow>(
        "INSERT INTO users (id, name, email, password_hash, role, chapters) \
         VALUES ($1, $2, $3, $4, 'audience', '[]'::jsonb) \
         ON CONFLICT (email) DO NOTHING \
         RETURNING id, name, email, role",
    )
    .bind(user_id)
    .bind(&payload.name)
    .bind(&email)
    .bind(&password_hash)
    .fetch_optional(&pool)
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Failed to create account", e))?;

    let Some(row) = inserted else {
        return Err(ApiResponse::<()>::conflict("Email already registered"));
    };

    info!(user_id = %row.id, "account registered");
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Account created",
        UserInfo {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
        },
    ))
}

#[derive(sqlx::FromRow)]
struct UserInfoRow {
    id: Uuid,
    name: Option<String>,
    email: String,
    role: Role,
}

#[derive(sqlx::FromRow)]
struct LoginRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: Role,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(pool): State<PgPool>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiResponse<()>> {
    let email = payload.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, LoginRow>(
        "SELECT id, email, password_hash, role FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| ApiResponse::<()>::db_error("Login failed", e))?;

    let Some(user) = user else {
        warn!(%email, "login attempt for unknown email");
        return Err(ApiResponse::<()>::unauthorized("Invalid email or password"));
    };

    let valid = verify(&payload.password, &user.password_hash).unwrap_or(false);
    if !valid {
        warn!(%email, "invalid password attempt");
        return Err(ApiResponse::<()>::unauthorized("Invalid email or password"));
    }

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email,
        role: user.role,
        exp: (Utc::now() + Duration::hours(24)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(Config::get().jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Token generation failed",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    info!(user_id = %user.id, "login successful");
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Login successful",
        LoginResponse {
            token,
            role: user.role,
        },
    ))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current account with own pending proposal overlaid", body = MeResponse),
        (status = 404, description = "Account no longer exists")
    ),
    tag = "Auth",
    security(("bearerAuth" = []))
)]
pub async fn me(
    State(pool): State<PgPool>,
    Extension(actor): Extension<Actor>,
    Extension(policy): Extension<AdminPolicy>,
) -> Result<ApiResponse<MeResponse>, ApiResponse<()>> {
    let viewer = actor.viewer(&policy);
    let user = fetch_user_view(&pool, actor.id, &viewer)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to load account", e))?
        .ok_or_else(|| ApiResponse::<()>::not_found("Account no longer exists"))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Current account",
        MeResponse {
            user,
            is_admin: viewer.is_admin,
        },
    ))
}

pub fn auth_routes() -> Router<PgPool> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn secure_auth_routes() -> Router<PgPool> {
    Router::new().route("/auth/me", get(me))
}

#[derive(OpenApi)]
#[openapi(
    paths(register, login, me),
    components(schemas(RegisterRequest, LoginRequest, LoginResponse, MeResponse, Claims)),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and current-account endpoints")
    )
)]
pub struct AuthDoc;
