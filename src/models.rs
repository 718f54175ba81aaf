use chrono::NaiveDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
}

/// A forum post joined with its author, counters and the viewer's like state.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub location: Option<String>,
    pub likes: i64,
    pub comments: i64,
    pub created_at: NaiveDateTime,
    pub author_id: i64,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub tag_list: Option<String>,
    pub is_liked: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub parent_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub author_id: i64,
    pub author_name: String,
    pub author_avatar: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RouteRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub difficulty: String,
    pub length: f64,
    pub elevation: f64,
    pub duration: i64,
    pub location: String,
    pub coordinates: String,
    pub rating: f64,
    pub reviews: i64,
    pub image: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub creator_id: i64,
    pub creator_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CoordinatesRow {
    pub id: i64,
    pub route_id: i64,
    pub start_name: String,
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_name: String,
    pub end_lat: f64,
    pub end_lng: f64,
    pub waypoints: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub category: String,
    pub image: String,
    pub views: i64,
    pub user_id: i64,
    pub created_at: NaiveDateTime,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub id: i64,
    pub r#type: String,
    pub content: Option<String>,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
    pub post_id: i64,
    pub post_title: Option<String>,
    pub sender_id: i64,
    pub sender_name: Option<String>,
    pub sender_avatar: Option<String>,
    pub comment_id: Option<i64>,
}
