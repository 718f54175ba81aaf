use serde::{Deserialize, Serialize};

use super::Difficulty;

// ----------------- Auth -----------------
#[derive(Deserialize, Serialize, Debug)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub username: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

// ----------------- Forum -----------------
#[derive(Deserialize, Serialize, Debug)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CommentRequest {
    pub content: String,
    #[serde(default, rename = "parentId")]
    pub parent_id: Option<i64>,
}

// ----------------- Routes -----------------
#[derive(Deserialize, Serialize, Debug)]
pub struct CreateRouteRequest {
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub length: f64,
    pub elevation: f64,
    pub duration: i64,
    pub location: String,
    pub coordinates: serde_json::Value,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Partial update for a route. Absent fields are left untouched; a field
/// set to a value overwrites. Built explicitly rather than from dynamic
/// per-field SQL so the statement is validated before it is constructed.
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct RouteUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub length: Option<f64>,
    pub elevation: Option<f64>,
    pub duration: Option<i64>,
    pub location: Option<String>,
    pub coordinates: Option<serde_json::Value>,
    pub status: Option<String>,
}

impl RouteUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.difficulty.is_none()
            && self.length.is_none()
            && self.elevation.is_none()
            && self.duration.is_none()
            && self.location.is_none()
            && self.coordinates.is_none()
            && self.status.is_none()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SaveCoordinatesRequest {
    #[serde(default)]
    pub start_name: Option<String>,
    pub start_lat: f64,
    pub start_lng: f64,
    #[serde(default)]
    pub end_name: Option<String>,
    pub end_lat: f64,
    pub end_lng: f64,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

// ----------------- Articles -----------------
#[derive(Deserialize, Serialize, Debug)]
pub struct ArticleRequest {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub category: String,
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_update_treats_absent_fields_as_untouched() {
        let update: RouteUpdate = serde_json::from_str(r#"{"name": "New name"}"#).unwrap();
        assert_eq!(update.name.as_deref(), Some("New name"));
        assert!(update.description.is_none());
        assert!(update.difficulty.is_none());
        assert!(!update.is_empty());

        let empty: RouteUpdate = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }
}
