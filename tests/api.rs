use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde_json::{json, Value};
use sqlx::SqlitePool;

static UPLOADS: OnceLock<tempfile::TempDir> = OnceLock::new();

struct TestApp {
    base: String,
    pool: SqlitePool,
    client: reqwest::Client,
    // Dropping the dir deletes the database file.
    _dir: tempfile::TempDir,
}

async fn spawn_app() -> TestApp {
    std::env::set_var("JWT_SECRET", "integration-secret");
    let uploads = UPLOADS.get_or_init(|| tempfile::tempdir().unwrap());
    std::env::set_var("UPLOADS_DIR", uploads.path());

    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite://{}", dir.path().join("test.db").display());
    let pool = trailhub::init_db_with_url(&db_url).await.unwrap();

    let port = trailhub::get_random_free_port().unwrap();
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let app = trailhub::make_router(Arc::new(pool.clone()), None);
    tokio::spawn(async move {
        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .await
            .unwrap();
    });
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    TestApp {
        base: format!("http://127.0.0.1:{port}"),
        pool,
        client: reqwest::Client::new(),
        _dir: dir,
    }
}

impl TestApp {
    /// Registers a user and returns (token, user id).
    async fn register(&self, username: &str) -> (String, i64) {
        let response = self
            .client
            .post(format!("{}/api/auth/register", self.base))
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "hunter2",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_i64().unwrap(),
        )
    }

    async fn make_admin(&self, user_id: i64) {
        sqlx::query("UPDATE users SET is_admin = 1 WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    async fn create_post(&self, token: &str, title: &str, content: &str) -> i64 {
        let response = self
            .client
            .post(format!("{}/api/forum/posts", self.base))
            .bearer_auth(token)
            .json(&json!({ "title": title, "content": content }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        body["data"]["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn login_round_trip_and_duplicate_email_is_rejected() {
    let app = spawn_app().await;
    app.register("mallory").await;

    // Same email, different username: rejected and no second row appears.
    let response = app
        .client
        .post(format!("{}/api/auth/register", app.base))
        .json(&json!({
            "username": "mallory2",
            "email": "mallory@example.com",
            "password": "hunter2",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    let rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = 'mallory@example.com'")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(rows, 1);

    let response = app
        .client
        .post(format!("{}/api/auth/login", app.base))
        .json(&json!({ "username": "mallory", "password": "hunter2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let token = body["data"]["token"].as_str().unwrap();

    let response = app
        .client
        .get(format!("{}/api/auth/me", app.base))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["username"], "mallory");
}

#[tokio::test]
async fn wrong_password_gets_one_generic_rejection() {
    let app = spawn_app().await;
    app.register("carol").await;

    let wrong_password = app
        .client
        .post(format!("{}/api/auth/login", app.base))
        .json(&json!({ "username": "carol", "password": "nope" }))
        .send()
        .await
        .unwrap();
    let unknown_user = app
        .client
        .post(format!("{}/api/auth/login", app.base))
        .json(&json!({ "username": "nobody", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_password.status(), 401);
    assert_eq!(unknown_user.status(), 401);
    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_user.json().await.unwrap();
    assert_eq!(a["message"], b["message"]);
}

#[tokio::test]
async fn long_content_is_summarized_with_ellipsis() {
    let app = spawn_app().await;
    let (token, _) = app.register("summarizer").await;
    let content = "x".repeat(250);
    let post_id = app.create_post(&token, "long one", &content).await;

    let response = app
        .client
        .get(format!("{}/api/forum/posts/{post_id}", app.base))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let summary = body["data"]["summary"].as_str().unwrap();
    assert_eq!(summary.chars().count(), 203);
    assert!(summary.ends_with("..."));
}

#[tokio::test]
async fn staged_upload_is_claimed_by_post_creation() {
    let app = spawn_app().await;
    let (token, _) = app.register("uploader").await;

    let form = reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(vec![0xffu8, 0xd8, 0xff, 0xe0])
            .file_name("summit.jpg"),
    );
    let response = app
        .client
        .post(format!("{}/api/forum/upload", app.base))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let url = body["data"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/forum/"));

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM upload_sessions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(sessions, 1);

    let post_id = app.create_post(&token, "with photo", "view from the top").await;

    let response = app
        .client
        .get(format!("{}/api/forum/posts/{post_id}", app.base))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let images: Vec<String> = body["data"]["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(images, vec![url]);

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM upload_sessions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(sessions, 0);
}

#[tokio::test]
async fn expired_staged_uploads_are_purged_instead_of_claimed() {
    let app = spawn_app().await;
    let (token, _) = app.register("latecomer").await;

    let form = reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(vec![0xffu8, 0xd8]).file_name("stale.jpg"),
    );
    let response = app
        .client
        .post(format!("{}/api/forum/upload", app.base))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    sqlx::query("UPDATE upload_sessions SET expires_at = datetime('now', '-1 hour')")
        .execute(&app.pool)
        .await
        .unwrap();

    let post_id = app.create_post(&token, "too late", "the photo is gone").await;

    let response = app
        .client
        .get(format!("{}/api/forum/posts/{post_id}", app.base))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["images"].as_array().unwrap().len(), 0);

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM upload_sessions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(sessions, 0);
    let orphans: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM post_images WHERE upload_session_id IS NOT NULL")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(orphans, 0, "expired staged rows must be deleted");
}

#[tokio::test]
async fn toggling_a_like_twice_restores_the_initial_state() {
    let app = spawn_app().await;
    let (token, _) = app.register("liker").await;
    let post_id = app.create_post(&token, "likeable", "content").await;

    let like_url = format!("{}/api/forum/posts/{post_id}/like", app.base);
    let on: Value = app
        .client
        .post(&like_url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(on["data"]["likes"], 1);
    assert_eq!(on["data"]["isLiked"], true);

    let off: Value = app
        .client
        .post(&like_url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(off["data"]["likes"], 0);
    assert_eq!(off["data"]["isLiked"], false);
}

#[tokio::test]
async fn deleting_a_thread_root_removes_its_replies_and_fixes_the_counter() {
    let app = spawn_app().await;
    let (token, _) = app.register("threader").await;
    let post_id = app.create_post(&token, "threaded", "content").await;
    let comments_url = format!("{}/api/forum/posts/{post_id}/comments", app.base);

    let root: Value = app
        .client
        .post(&comments_url)
        .bearer_auth(&token)
        .json(&json!({ "content": "top level" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let root_id = root["data"]["id"].as_i64().unwrap();

    for i in 0..2 {
        let response = app
            .client
            .post(&comments_url)
            .bearer_auth(&token)
            .json(&json!({ "content": format!("reply {i}"), "parentId": root_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
    }

    let counter: i64 = sqlx::query_scalar("SELECT comments FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(counter, 3);

    let response = app
        .client
        .delete(format!("{comments_url}/{root_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let counter: i64 = sqlx::query_scalar("SELECT comments FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(counter, 0);
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_comments")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn replies_to_replies_are_rejected() {
    let app = spawn_app().await;
    let (token, _) = app.register("nester").await;
    let post_id = app.create_post(&token, "nested", "content").await;
    let comments_url = format!("{}/api/forum/posts/{post_id}/comments", app.base);

    let root: Value = app
        .client
        .post(&comments_url)
        .bearer_auth(&token)
        .json(&json!({ "content": "root" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let root_id = root["data"]["id"].as_i64().unwrap();

    let reply: Value = app
        .client
        .post(&comments_url)
        .bearer_auth(&token)
        .json(&json!({ "content": "reply", "parentId": root_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let reply_id = reply["data"]["id"].as_i64().unwrap();

    let response = app
        .client
        .post(&comments_url)
        .bearer_auth(&token)
        .json(&json!({ "content": "too deep", "parentId": reply_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn likes_notify_the_author_except_for_self_likes() {
    let app = spawn_app().await;
    let (author_token, author_id) = app.register("author").await;
    let (fan_token, _) = app.register("fan").await;
    let post_id = app.create_post(&author_token, "notify me", "content").await;
    let like_url = format!("{}/api/forum/posts/{post_id}/like", app.base);

    app.client
        .post(&like_url)
        .bearer_auth(&author_token)
        .send()
        .await
        .unwrap();
    let messages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(messages, 0, "self-likes must not notify");

    app.client
        .post(&like_url)
        .bearer_auth(&fan_token)
        .send()
        .await
        .unwrap();
    let messages: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND type = 'like'",
    )
    .bind(author_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(messages, 1);

    // The notification shows up in the author's inbox.
    let response = app
        .client
        .get(format!("{}/api/messages?type=unread", app.base))
        .bearer_auth(&author_token)
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["messages"][0]["type"], "like");
    assert_eq!(body["data"]["messages"][0]["sender"]["name"], "fan");
}

#[tokio::test]
async fn route_coordinates_round_trip_preserves_waypoint_order() {
    let app = spawn_app().await;
    let (token, _) = app.register("cartographer").await;

    let response = app
        .client
        .post(format!("{}/api/hiking-routes", app.base))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Ridge Traverse",
            "description": "exposed but worth it",
            "difficulty": "hard",
            "length": 14.2,
            "elevation": 1250.0,
            "duration": 420,
            "location": "North Face",
            "coordinates": { "lat": 46.2, "lng": 7.5 },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let route_id = body["data"]["id"].as_i64().unwrap();

    let waypoints = json!([
        { "lat": 46.21, "lng": 7.51 },
        { "lat": 46.22, "lng": 7.53 },
        { "lat": 46.23, "lng": 7.52 },
    ]);
    let response = app
        .client
        .put(format!("{}/api/hiking-routes/{route_id}/coordinates", app.base))
        .bearer_auth(&token)
        .json(&json!({
            "startName": "Car park",
            "startLat": 46.20,
            "startLng": 7.50,
            "endName": "Summit cross",
            "endLat": 46.24,
            "endLng": 7.54,
            "waypoints": waypoints,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .client
        .get(format!("{}/api/hiking-routes/{route_id}/coordinates", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["startLat"], 46.20);
    assert_eq!(body["data"]["endName"], "Summit cross");
    assert_eq!(body["data"]["waypoints"], waypoints);
}

#[tokio::test]
async fn route_catalog_answers_under_the_hiking_routes_path() {
    let app = spawn_app().await;

    let listing = app
        .client
        .get(format!("{}/api/hiking-routes", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(listing.status(), 200);
    let body: Value = listing.json().await.unwrap();
    assert_eq!(body["data"]["total"], 0);

    let popular = app
        .client
        .get(format!("{}/api/hiking-routes/popular", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(popular.status(), 200);
}

#[tokio::test]
async fn admin_surface_is_closed_to_regular_users() {
    let app = spawn_app().await;
    let (user_token, _) = app.register("pleb").await;
    let (_, target_id) = app.register("target").await;

    let response = app
        .client
        .get(format!("{}/api/admin/users", app.base))
        .bearer_auth(&user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = app
        .client
        .delete(format!("{}/api/admin/users/{target_id}", app.base))
        .bearer_auth(&user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    let survivor: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(target_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(survivor, 1, "a refused delete must not touch the target");
}

#[tokio::test]
async fn admins_cannot_delete_themselves() {
    let app = spawn_app().await;
    let (admin_token, admin_id) = app.register("root").await;
    app.make_admin(admin_id).await;

    let response = app
        .client
        .delete(format!("{}/api/admin/users/{admin_id}", app.base))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let still_there: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(admin_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(still_there, 1);
}

#[tokio::test]
async fn counter_reconciliation_repairs_drifted_posts() {
    let app = spawn_app().await;
    let (token, _) = app.register("driftwood").await;
    let post_id = app.create_post(&token, "drifting", "content").await;
    app.client
        .post(format!("{}/api/forum/posts/{post_id}/like", app.base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    // Counters match the relation rows, so reconciliation is a no-op.
    let repaired = trailhub::db_helpers::reconcile_post_counters(&app.pool)
        .await
        .unwrap();
    assert_eq!(repaired, 0);

    sqlx::query("UPDATE posts SET likes = 99, comments = 7 WHERE id = ?")
        .bind(post_id)
        .execute(&app.pool)
        .await
        .unwrap();

    let repaired = trailhub::db_helpers::reconcile_post_counters(&app.pool)
        .await
        .unwrap();
    assert_eq!(repaired, 1);
    let (likes, comments): (i64, i64) =
        sqlx::query_as("SELECT likes, comments FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(likes, 1);
    assert_eq!(comments, 0);
}

#[tokio::test]
async fn hottest_sort_puts_the_most_liked_post_first() {
    let app = spawn_app().await;
    let (token, _) = app.register("sorter").await;
    let first = app.create_post(&token, "older", "content").await;
    let _second = app.create_post(&token, "newer", "content").await;
    app.client
        .post(format!("{}/api/forum/posts/{first}/like", app.base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let latest: Value = app
        .client
        .get(format!("{}/api/forum/posts?sort_type=latest", app.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(latest["data"][0]["title"], "newer");

    let hottest: Value = app
        .client
        .get(format!("{}/api/forum/posts?sort_type=hottest", app.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hottest["data"][0]["title"], "older");
}
