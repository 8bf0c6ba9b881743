use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The three per-customer join tables share one shape; the kind picks the
/// table and the column naming the content row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    Post,
    OtherPost,
    BusinessPost,
}

impl MappingKind {
    pub const ALL: [MappingKind; 3] = [MappingKind::Post, MappingKind::OtherPost, MappingKind::BusinessPost];

    pub fn table(&self) -> &'static str {
        match self {
            MappingKind::Post => "customer_post_frame_mappings",
            MappingKind::OtherPost => "customer_other_post_frame_mappings",
            MappingKind::BusinessPost => "business_post_frame_mappings",
        }
    }

    pub fn content_column(&self) -> &'static str {
        match self {
            MappingKind::Post => "post_id",
            MappingKind::OtherPost => "other_post_id",
            MappingKind::BusinessPost => "business_post_id",
        }
    }

    pub fn content_table(&self) -> &'static str {
        match self {
            MappingKind::Post => "posts",
            MappingKind::OtherPost => "other_posts",
            MappingKind::BusinessPost => "business_posts",
        }
    }

    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "posts" => Some(MappingKind::Post),
            "other-posts" => Some(MappingKind::OtherPost),
            "business-posts" => Some(MappingKind::BusinessPost),
            _ => None,
        }
    }
}

impl std::fmt::Display for MappingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MappingKind::Post => "post",
            MappingKind::OtherPost => "other_post",
            MappingKind::BusinessPost => "business_post",
        };
        write!(f, "{}", label)
    }
}

/// One row of a mapping table. `content_id` is aliased from the kind's
/// content column when loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ContentMapping {
    pub id: i64,
    pub customer_id: i64,
    pub content_id: i64,
    pub customer_frame_id: i64,
    pub is_downloaded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
