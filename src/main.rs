use axum::middleware::{from_fn, from_fn_with_state};
use axum::{Extension, Router};
use dotenvy::dotenv;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::signal;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod config;
mod db;
mod middleware;
mod utils;
mod workflow;

use crate::api::auth::AuthDoc;
use crate::api::media::MediaDoc;
use crate::config::Config;
use crate::db::queries::artist::ArtistDoc;
use crate::db::queries::booking::BookingDoc;
use crate::db::queries::chapter::ChapterDoc;
use crate::db::queries::requests::RequestDoc;
use crate::db::queries::user::UserDoc;
use crate::middleware::auth::{actor_middleware, create_actor_cache, jwt_middleware, AdminPolicy};

#[tokio::main]
async fn main() {
    dotenv().ok();
    Config::init();

    std::fs::create_dir_all("logs").expect("Failed to create logs directory");
    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    let pool = db::pool::get_db_pool().await;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    let actor_cache = create_actor_cache();
    let admin_policy = AdminPolicy::from_config(&Config::get());

    let merged_doc = AuthDoc::openapi()
        .merge_from(UserDoc::openapi())
        .merge_from(ArtistDoc::openapi())
        .merge_from(BookingDoc::openapi())
        .merge_from(ChapterDoc::openapi())
        .merge_from(RequestDoc::openapi())
        .merge_from(MediaDoc::openapi());

    let public_routes = Router::new()
        .merge(api::auth::auth_routes())
        .merge(api::artist::public_artist_routes())
        .merge(api::booking::public_booking_routes())
        .merge(api::chapter::public_chapter_routes())
        .merge(api::media::public_media_routes());

    let private_routes = Router::new()
        .merge(api::auth::secure_auth_routes())
        .merge(api::user::user_routes())
        .merge(api::artist::artist_routes())
        .merge(api::booking::booking_routes())
        .merge(api::chapter::chapter_routes())
        .merge(api::requests::request_routes())
        .merge(api::media::media_routes())
        .route_layer(from_fn_with_state(pool.clone(), actor_middleware))
        .route_layer(from_fn(jwt_middleware));

    let app = Router::new()
        .merge(api::health::health_routes())
        .merge(public_routes)
        .merge(private_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", merged_doc))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CorsLayer::permissive())
        .layer(Extension(actor_cache))
        .layer(Extension(admin_policy))
        .with_state(pool.clone());

    run_server(app, pool).await;
}

async fn run_server(app: Router, pool: PgPool) {
    let addr = Config::get().bind_addr.clone();
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pool))
        .await
        .expect("Server encountered an error");
}

async fn shutdown_signal(pool: PgPool) {
    signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received, closing database pool");
    pool.close().await;
}
