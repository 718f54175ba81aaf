mod request;
mod response;

pub use request::*;
pub use response::*;

use serde::{Deserialize, Serialize};

/// Fixed page size for forum listings.
pub const POSTS_PER_PAGE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Extreme,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Extreme => "extreme",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    #[default]
    Latest,
    Hottest,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct PostListQuery {
    pub page: u32,
    pub sort_type: PostSort,
}

impl Default for PostListQuery {
    fn default() -> Self {
        PostListQuery {
            page: 1,
            sort_type: PostSort::Latest,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct PostSearchQuery {
    pub query: String,
    #[serde(default)]
    pub sort_type: PostSort,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        PageQuery {
            page: 1,
            limit: 10,
            search: None,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct RouteListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub difficulty: Option<Difficulty>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ArticleListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub category: Option<String>,
    pub time_filter: Option<String>,
    pub search_query: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct MessageListQuery {
    pub r#type: String,
    pub page: u32,
    pub limit: u32,
}

impl Default for MessageListQuery {
    fn default() -> Self {
        MessageListQuery {
            r#type: "all".to_string(),
            page: 1,
            limit: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_type_deserializes_from_query_values() {
        let q: PostListQuery =
            serde_json::from_str(r#"{"page": 2, "sort_type": "hottest"}"#).unwrap();
        assert_eq!(q.page, 2);
        assert_eq!(q.sort_type, PostSort::Hottest);

        let q: PostListQuery = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.sort_type, PostSort::Latest);
    }

    #[test]
    fn difficulty_is_lowercase_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&Difficulty::Extreme).unwrap(),
            r#""extreme""#
        );
        let d: Difficulty = serde_json::from_str(r#""medium""#).unwrap();
        assert_eq!(d.as_str(), "medium");
    }
}
