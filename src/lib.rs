pub mod ai_relay;
pub mod authentication;
pub mod client;
pub mod data_formats;
pub mod db_helpers;
pub mod errors;
pub mod handlers;
pub mod models;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::{delete, get, post, put};
use axum::{http::StatusCode, Extension, Json, Router};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use ai_relay::RelayConfig;

pub type JsonResponse<T> = (StatusCode, Json<T>);

pub async fn init_db() -> anyhow::Result<SqlitePool> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    init_db_with_url(&url).await
}

pub async fn init_db_with_url(url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .context("invalid DATABASE_URL")?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("failed to connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    Ok(pool)
}

pub fn make_router(pool: Arc<SqlitePool>, relay: Option<RelayConfig>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(handlers::register_user))
        .route("/login", post(handlers::login_user))
        .route("/me", get(handlers::current_user));

    let user_routes = Router::new()
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/avatar", post(handlers::upload_avatar));

    let forum_routes = Router::new()
        .route("/posts", get(handlers::list_posts).post(handlers::create_post))
        .route("/search", get(handlers::search_posts))
        .route("/posts/:id", get(handlers::get_post))
        .route("/posts/:id/like", post(handlers::toggle_like))
        .route(
            "/posts/:id/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        .route(
            "/posts/:id/comments/:comment_id",
            delete(handlers::delete_comment),
        )
        .route("/upload", post(handlers::upload_post_image));

    let route_routes = Router::new()
        .route("/", get(handlers::list_routes).post(handlers::create_route))
        .route("/popular", get(handlers::popular_routes))
        .route(
            "/:id",
            get(handlers::get_route)
                .put(handlers::update_route)
                .delete(handlers::delete_route),
        )
        .route(
            "/:id/coordinates",
            get(handlers::get_coordinates)
                .put(handlers::save_coordinates)
                .post(handlers::save_coordinates),
        );

    let article_routes = Router::new()
        .route(
            "/",
            get(handlers::list_articles).post(handlers::create_article),
        )
        .route("/popular", get(handlers::popular_articles))
        .route(
            "/:id",
            get(handlers::get_article)
                .put(handlers::update_article)
                .delete(handlers::delete_article),
        );

    let message_routes = Router::new()
        .route("/", get(handlers::list_messages))
        .route("/unread-count", get(handlers::unread_count))
        .route("/read-all", put(handlers::mark_all_messages_read))
        .route("/:id/read", put(handlers::mark_message_read))
        .route("/:id", delete(handlers::delete_message));

    let admin_routes = Router::new()
        .route("/posts", get(handlers::admin_list_posts))
        .route("/posts/:id", delete(handlers::admin_delete_post))
        .route("/users", get(handlers::admin_list_users))
        .route("/users/:id", delete(handlers::admin_delete_user))
        .route("/routes", get(handlers::admin_list_routes))
        .route("/routes/:id", delete(handlers::admin_delete_route));

    let mut api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/forum", forum_routes)
        .nest("/hiking-routes", route_routes)
        .nest("/articles", article_routes)
        .nest("/messages", message_routes)
        .nest("/admin", admin_routes);

    // The chat relay only mounts when upstream credentials are configured.
    if let Some(config) = relay {
        api = api
            .nest(
                "/ai",
                Router::new()
                    .route("/chat", post(ai_relay::chat))
                    .layer(Extension(config))
                    .layer(Extension(reqwest::Client::new())),
            );
    }

    Router::new()
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(handlers::uploads_root()))
        .layer(Extension(pool))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn run_app(pool: SqlitePool, addr: SocketAddr) -> anyhow::Result<()> {
    let relay = match RelayConfig::from_env() {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("chat relay disabled: {e}");
            None
        }
    };
    let app = make_router(Arc::new(pool), relay);
    tracing::info!("listening on {addr}");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("server exited with an error")
}

/// Asks the OS for a free port. Used by the integration tests to run
/// several servers side by side.
pub fn get_random_free_port() -> anyhow::Result<u16> {
    let listener =
        std::net::TcpListener::bind("127.0.0.1:0").context("failed to bind a probe socket")?;
    Ok(listener.local_addr()?.port())
}
