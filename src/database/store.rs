use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::accounts::{FrameSummaryRow, NewUser, UserFilter};
use crate::database::manager::DatabaseError;
use crate::database::models::{
    BusinessCategory, BusinessPost, CodeType, ContentMapping, CustomerFrame, CustomerGroup, MappingKind, OtherPost, Post,
    Subscription, User, UserCode,
};

/// Fields accepted when a frame is first stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFrame {
    pub customer_id: i64,
    pub group_id: Option<i64>,
    pub business_category_id: Option<i64>,
    pub profession_type: Option<String>,
    pub display_name: Option<String>,
    pub frame_img: Option<String>,
}

/// Filters for frame listings.
#[derive(Debug, Clone, Default)]
pub struct FrameFilter {
    /// Restrict to a single customer's frames.
    pub customer_id: Option<i64>,
    /// Case-insensitive match on group name, WhatsApp number or display name.
    pub search: Option<String>,
    /// Exact group name.
    pub group_name: Option<String>,
    /// Exact profession type.
    pub profession_type: Option<String>,
}

impl FrameFilter {
    /// Whether a frame passes the filter, given its group name and owner's WhatsApp number
    pub fn matches(&self, frame: &CustomerFrame, group_name: Option<&str>, whatsapp_number: Option<&str>) -> bool {
        if self.customer_id.is_some_and(|c| frame.customer_id != c) {
            return false;
        }
        if let Some(wanted) = &self.group_name {
            if group_name != Some(wanted.as_str()) {
                return false;
            }
        }
        if let Some(wanted) = &self.profession_type {
            if frame.profession_type.as_deref() != Some(wanted.as_str()) {
                return false;
            }
        }
        match &self.search {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                [group_name, whatsapp_number, frame.display_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .any(|v| v.to_lowercase().contains(&term))
            }
        }
    }
}

/// A mapping row joined with what the mapping views render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MappingView {
    pub id: i64,
    pub customer_id: i64,
    pub content_id: i64,
    pub customer_frame_id: i64,
    pub is_downloaded: bool,
    pub content_file: Option<String>,
    pub frame_img: Option<String>,
    pub frame_group_name: Option<String>,
    /// Only populated for event posts.
    pub event_name: Option<String>,
}

/// Persistence seam for frames, catalogs and the three mapping tables.
///
/// A `None` group or category in the catalog queries matches rows whose
/// column is NULL, mirroring how an unset foreign key filters.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Store whose writes stay pending until `commit` is called on it.
    async fn begin(&self) -> Result<Arc<dyn MappingStore>, DatabaseError>;
    async fn commit(&self) -> Result<(), DatabaseError>;
    async fn rollback(&self) -> Result<(), DatabaseError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;
    async fn find_group(&self, id: i64) -> Result<Option<CustomerGroup>, DatabaseError>;
    async fn find_business_category(&self, id: i64) -> Result<Option<BusinessCategory>, DatabaseError>;

    async fn find_frame(&self, id: i64) -> Result<Option<CustomerFrame>, DatabaseError>;
    async fn list_frames(&self, filter: &FrameFilter) -> Result<Vec<CustomerFrame>, DatabaseError>;
    async fn insert_frame(&self, frame: &NewFrame) -> Result<CustomerFrame, DatabaseError>;
    async fn update_frame(&self, frame: &CustomerFrame) -> Result<CustomerFrame, DatabaseError>;
    async fn delete_frame(&self, id: i64) -> Result<bool, DatabaseError>;

    /// Posts of a group whose event falls on or after `from`.
    async fn upcoming_posts(&self, group_id: Option<i64>, from: NaiveDate) -> Result<Vec<Post>, DatabaseError>;
    async fn other_posts(&self, group_id: Option<i64>) -> Result<Vec<OtherPost>, DatabaseError>;
    async fn business_posts(&self, business_category_id: Option<i64>) -> Result<Vec<BusinessPost>, DatabaseError>;

    /// A customer's post mappings whose post belongs to `group_id`.
    async fn post_mappings_in_group(
        &self,
        customer_id: i64,
        group_id: Option<i64>,
    ) -> Result<Vec<ContentMapping>, DatabaseError>;
    async fn mappings_for_customer(&self, kind: MappingKind, customer_id: i64) -> Result<Vec<ContentMapping>, DatabaseError>;
    /// Get-or-create by (customer, content). A new row points at `frame_id`
    /// and starts not downloaded; the flag reports whether it was created.
    async fn get_or_create_mapping(
        &self,
        kind: MappingKind,
        customer_id: i64,
        content_id: i64,
        frame_id: i64,
    ) -> Result<(ContentMapping, bool), DatabaseError>;
    async fn save_mapping(&self, kind: MappingKind, mapping: &ContentMapping) -> Result<ContentMapping, DatabaseError>;

    async fn mapping_views(&self, kind: MappingKind, customer_id: i64) -> Result<Vec<MappingView>, DatabaseError>;
    async fn find_mapping(&self, kind: MappingKind, id: i64) -> Result<Option<ContentMapping>, DatabaseError>;
}

/// Users, one-time codes and what login reports about a customer.
#[async_trait]
pub trait AccountStore: MappingStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn insert_user(&self, user: &NewUser) -> Result<User, DatabaseError>;
    /// Newest first.
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, DatabaseError>;
    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> Result<(), DatabaseError>;
    async fn mark_email_verified(&self, user_id: i64) -> Result<(), DatabaseError>;

    /// Most recent code of a type, verified or not.
    async fn latest_code(&self, user_id: i64, code_type: CodeType) -> Result<Option<UserCode>, DatabaseError>;
    async fn insert_code(&self, user_id: i64, code_type: CodeType, code: i32) -> Result<UserCode, DatabaseError>;
    async fn mark_code_verified(&self, code_id: i64) -> Result<(), DatabaseError>;
    async fn delete_code(&self, code_id: i64) -> Result<(), DatabaseError>;

    async fn subscriptions_for_user(&self, user_id: i64) -> Result<Vec<Subscription>, DatabaseError>;
    /// Frames of a customer ordered by business category, as login reports them.
    async fn frame_summaries(&self, customer_id: i64) -> Result<Vec<FrameSummaryRow>, DatabaseError>;
}

/// Revocation list for issued JWTs.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn revoke_token(&self, jti: Uuid, user_id: i64, expires_at: DateTime<Utc>) -> Result<(), DatabaseError>;
    async fn is_token_revoked(&self, jti: Uuid) -> Result<bool, DatabaseError>;
}
