use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub event_date: NaiveDate,
    pub event_type: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Parent category when this row is a sub-category.
    pub parent_id: Option<i64>,
    pub banner_image: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BusinessCategory {
    pub id: i64,
    pub name: String,
    pub profession_type: Option<String>,
    pub thumbnail: Option<String>,
}

/// Event poster. Only posts whose event is today or later are mapped.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub event_id: i64,
    pub group_id: Option<i64>,
    pub file_type: Option<String>,
    pub file: Option<String>,
    pub added_on: DateTime<Utc>,
    pub event_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OtherPost {
    pub id: i64,
    pub category_id: i64,
    pub group_id: Option<i64>,
    pub file_type: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BusinessPost {
    pub id: i64,
    pub business_category_id: Option<i64>,
    pub group_id: Option<i64>,
    pub profession_type: Option<String>,
    pub file_type: Option<String>,
    pub file: Option<String>,
    pub added_on: DateTime<Utc>,
}
