use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CustomerGroup {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A customer's uploaded frame together with the group and business
/// category that decide which posts get mapped onto it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CustomerFrame {
    pub id: i64,
    pub customer_id: i64,
    pub group_id: Option<i64>,
    /// Main business category only; sub-categories are never stored here.
    pub business_category_id: Option<i64>,
    pub profession_type: Option<String>,
    pub display_name: Option<String>,
    pub frame_img: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Group names starting with an upper-case `A` mark the "A" tier.
pub fn is_a_group_name(name: &str) -> bool {
    name.starts_with('A')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_group_is_case_sensitive_prefix() {
        assert!(is_a_group_name("A"));
        assert!(is_a_group_name("Alpha"));
        assert!(!is_a_group_name("a"));
        assert!(!is_a_group_name("Beta"));
        assert!(!is_a_group_name(""));
    }
}
