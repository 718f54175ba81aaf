use serde::{Deserialize, Serialize};

use crate::models::{ArticleRow, CommentRow, CoordinatesRow, MessageRow, PostRow, RouteRow, User};

use super::Waypoint;

/// The single response envelope used by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: None,
        }
    }

}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Self {
        ApiResponse {
            success: true,
            data: None,
            message: Some(message.to_string()),
        }
    }
}

/// Admin listings carry a total row count next to the page of data, and a
/// liveness flag for the route listing's degrade-to-sample path.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminListResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub total: i64,
    #[serde(rename = "isLive")]
    pub is_live: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthorResponse {
    pub id: i64,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub is_admin: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            avatar: user.avatar,
            bio: user.bio,
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub location: Option<String>,
    pub created_at: String,
    pub author: AuthorResponse,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub likes: i64,
    pub comments: i64,
    pub is_liked: bool,
}

impl PostResponse {
    pub fn new(row: PostRow, images: Vec<String>) -> Self {
        let tags = row
            .tag_list
            .as_deref()
            .unwrap_or("")
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.to_string())
            .collect();
        PostResponse {
            id: row.id,
            title: row.title,
            content: row.content,
            summary: row.summary,
            location: row.location,
            created_at: row.created_at.to_string(),
            author: AuthorResponse {
                id: row.author_id,
                name: row.author_name,
                avatar: row.author_avatar,
            },
            images,
            tags,
            likes: row.likes,
            comments: row.comments,
            is_liked: row.is_liked,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub created_at: String,
    pub author: AuthorResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentResponse>>,
}

impl CommentResponse {
    pub fn new(row: CommentRow, replies: Option<Vec<CommentResponse>>) -> Self {
        CommentResponse {
            id: row.id,
            content: row.content,
            created_at: row.created_at.to_string(),
            author: AuthorResponse {
                id: row.author_id,
                name: row.author_name,
                avatar: row.author_avatar,
            },
            replies,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub likes: i64,
    pub is_liked: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub difficulty: String,
    pub length: f64,
    pub elevation: f64,
    pub duration: i64,
    pub location: String,
    pub coordinates: serde_json::Value,
    pub rating: f64,
    pub reviews: i64,
    pub image: Option<String>,
    pub status: String,
    pub created_at: String,
    pub creator: AuthorResponse,
    pub images: Vec<String>,
}

impl RouteResponse {
    pub fn new(row: RouteRow, images: Vec<String>) -> Self {
        let coordinates =
            serde_json::from_str(&row.coordinates).unwrap_or(serde_json::Value::Null);
        RouteResponse {
            id: row.id,
            name: row.name,
            description: row.description,
            difficulty: row.difficulty,
            length: row.length,
            elevation: row.elevation,
            duration: row.duration,
            location: row.location,
            coordinates,
            rating: row.rating,
            reviews: row.reviews,
            image: row.image,
            status: row.status,
            created_at: row.created_at.to_string(),
            creator: AuthorResponse {
                id: row.creator_id,
                name: row.creator_name.unwrap_or_default(),
                avatar: None,
            },
            images,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatesResponse {
    pub route_id: i64,
    pub start_name: String,
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_name: String,
    pub end_lat: f64,
    pub end_lng: f64,
    pub waypoints: Vec<Waypoint>,
}

impl From<CoordinatesRow> for CoordinatesResponse {
    fn from(row: CoordinatesRow) -> Self {
        let waypoints = serde_json::from_str(&row.waypoints).unwrap_or_default();
        CoordinatesResponse {
            route_id: row.route_id,
            start_name: row.start_name,
            start_lat: row.start_lat,
            start_lng: row.start_lng,
            end_name: row.end_name,
            end_lat: row.end_lat,
            end_lng: row.end_lng,
            waypoints,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub category: String,
    pub image: String,
    pub views: i64,
    pub created_at: String,
    pub author: AuthorResponse,
}

impl From<ArticleRow> for ArticleResponse {
    fn from(row: ArticleRow) -> Self {
        ArticleResponse {
            id: row.id,
            title: row.title,
            content: row.content,
            summary: row.summary,
            category: row.category,
            image: row.image,
            views: row.views,
            created_at: row.created_at.to_string(),
            author: AuthorResponse {
                id: row.user_id,
                name: row.author_name.unwrap_or_default(),
                avatar: row.author_avatar,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePostRef {
    pub id: i64,
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: i64,
    pub r#type: String,
    pub content: Option<String>,
    pub is_read: bool,
    pub created_at: String,
    pub post: MessagePostRef,
    pub sender: AuthorResponse,
    pub comment_id: Option<i64>,
}

impl From<MessageRow> for MessageResponse {
    fn from(row: MessageRow) -> Self {
        MessageResponse {
            id: row.id,
            r#type: row.r#type,
            content: row.content,
            is_read: row.is_read,
            created_at: row.created_at.to_string(),
            post: MessagePostRef {
                id: row.post_id,
                title: row.post_title,
            },
            sender: AuthorResponse {
                id: row.sender_id,
                name: row.sender_name.unwrap_or_default(),
                avatar: row.sender_avatar,
            },
            comment_id: row.comment_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

// Slim row shapes for the admin console tables.

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminPostItem {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub likes: i64,
    pub comments: i64,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserItem {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminRouteItem {
    pub id: i64,
    pub name: String,
    pub difficulty: String,
    pub location: String,
    pub rating: f64,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_skips_absent_fields() {
        let ok = serde_json::to_value(ApiResponse::ok(1)).unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["data"], 1);
        assert!(ok.get("message").is_none());

        let msg = serde_json::to_value(ApiResponse::message("done")).unwrap();
        assert_eq!(msg["message"], "done");
        assert!(msg.get("data").is_none());
    }

    #[test]
    fn waypoints_decode_to_the_exact_floats_that_were_stored() {
        let row = CoordinatesRow {
            id: 1,
            route_id: 9,
            start_name: "Trailhead".into(),
            start_lat: 46.204391357421875,
            start_lng: -121.0 / 3.0,
            end_name: "Summit".into(),
            end_lat: 46.25,
            end_lng: -40.3,
            waypoints: serde_json::to_string(&[Waypoint {
                lat: 45.28396364135753,
                lng: -121.71330543145973,
            }])
            .unwrap(),
        };
        let response = CoordinatesResponse::from(row);
        assert_eq!(
            response.waypoints[0].lat.to_bits(),
            45.28396364135753_f64.to_bits()
        );
        assert_eq!(
            response.waypoints[0].lng.to_bits(),
            (-121.71330543145973_f64).to_bits()
        );
    }

    #[test]
    fn empty_tag_list_yields_no_tags() {
        use chrono::NaiveDateTime;
        let row = PostRow {
            id: 1,
            title: "t".into(),
            content: "c".into(),
            summary: "c".into(),
            location: None,
            likes: 0,
            comments: 0,
            created_at: NaiveDateTime::from_timestamp_opt(0, 0).unwrap(),
            author_id: 1,
            author_name: "u".into(),
            author_avatar: None,
            tag_list: Some("".into()),
            is_liked: false,
        };
        let resp = PostResponse::new(row, vec![]);
        assert!(resp.tags.is_empty());
    }
}
