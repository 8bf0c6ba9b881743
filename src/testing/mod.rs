use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::database::accounts::{FrameSummaryRow, NewUser, UserFilter};
use crate::database::manager::DatabaseError;
use crate::database::models::{
    BusinessCategory, BusinessPost, CodeType, ContentMapping, CustomerFrame, CustomerGroup, MappingKind, OtherPost, Post,
    Subscription, User, UserCode,
};
use crate::database::store::{AccountStore, FrameFilter, MappingStore, MappingView, NewFrame, TokenStore};

#[derive(Default, Clone)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    groups: Vec<CustomerGroup>,
    categories: Vec<BusinessCategory>,
    frames: Vec<CustomerFrame>,
    posts: Vec<Post>,
    other_posts: Vec<OtherPost>,
    business_posts: Vec<BusinessPost>,
    mappings: HashMap<MappingKind, Vec<ContentMapping>>,
    codes: Vec<UserCode>,
    subscriptions: Vec<Subscription>,
    revoked: HashSet<Uuid>,
}

impl Tables {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory store for engine and router tests. A store returned by
/// `begin` shares the tables and restores them on rollback.
#[derive(Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    snapshot: Option<Arc<Mutex<Option<Tables>>>>,
    mapping_fault: Arc<Mutex<Option<usize>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    /// Make the `nth` `get_or_create_mapping` call from now on fail once
    pub fn fail_mapping_write(&self, nth: usize) {
        *self.mapping_fault.lock().unwrap() = Some(nth);
    }

    fn check_mapping_fault(&self) -> Result<(), DatabaseError> {
        let mut fault = self.mapping_fault.lock().unwrap();
        if let Some(remaining) = fault.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                *fault = None;
                return Err(DatabaseError::QueryError("mapping write failed".to_string()));
            }
        }
        Ok(())
    }

    pub fn user(&self, id: i64) -> Option<User> {
        self.lock().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn codes(&self, user_id: i64) -> Vec<UserCode> {
        self.lock().codes.iter().filter(|c| c.user_id == user_id).cloned().collect()
    }

    pub fn add_subscription(&self, user_id: i64, end_date: NaiveDate) {
        let mut t = self.lock();
        let id = t.id();
        t.subscriptions.push(Subscription {
            id,
            order_number: (1000 + id).to_string(),
            user_id,
            plan_id: 1,
            payment_method_id: 1,
            start_date: end_date - chrono::Duration::days(30),
            end_date,
            transaction_number: None,
            file: None,
            is_active: true,
            created_at: Utc::now(),
        });
    }

    pub fn add_customer(&self, email: &str) -> User {
        self.add_user(email, "customer")
    }

    pub fn add_admin(&self, email: &str) -> User {
        self.add_user(email, "admin")
    }

    fn add_user(&self, email: &str, user_type: &str) -> User {
        let admin = user_type == "admin";
        let mut t = self.lock();
        let id = t.id();
        let user = User {
            id,
            email: email.to_string(),
            username: Some(email.to_string()),
            password_hash: String::new(),
            first_name: "Test".to_string(),
            last_name: "Customer".to_string(),
            user_type: user_type.to_string(),
            whatsapp_number: format!("90000{:05}", id),
            address: None,
            pincode: None,
            city: None,
            dob: None,
            business_category_id: None,
            no_of_post: 1,
            is_verify: true,
            is_staff: admin,
            is_deleted: false,
            email_verified_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        t.users.push(user.clone());
        user
    }

    pub fn delete_user(&self, id: i64) {
        let mut t = self.lock();
        if let Some(user) = t.users.iter_mut().find(|u| u.id == id) {
            user.is_deleted = true;
        }
    }

    pub fn add_group(&self, name: &str) -> CustomerGroup {
        let mut t = self.lock();
        let id = t.id();
        let group = CustomerGroup {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        t.groups.push(group.clone());
        group
    }

    pub fn add_business_category(&self, name: &str) -> BusinessCategory {
        let mut t = self.lock();
        let id = t.id();
        let category = BusinessCategory {
            id,
            name: name.to_string(),
            profession_type: None,
            thumbnail: None,
        };
        t.categories.push(category.clone());
        category
    }

    pub fn add_post(&self, group_id: Option<i64>, event_date: NaiveDate) -> Post {
        let mut t = self.lock();
        let id = t.id();
        let post = Post {
            id,
            event_id: 1,
            group_id,
            file_type: Some("image".to_string()),
            file: Some(format!("posts/{}.png", id)),
            added_on: Utc::now(),
            event_date,
        };
        t.posts.push(post.clone());
        post
    }

    pub fn add_other_post(&self, group_id: Option<i64>) -> OtherPost {
        let mut t = self.lock();
        let id = t.id();
        let post = OtherPost {
            id,
            category_id: 1,
            group_id,
            file_type: Some("image".to_string()),
            file: Some(format!("other_posts/{}.png", id)),
        };
        t.other_posts.push(post.clone());
        post
    }

    pub fn add_business_post(&self, business_category_id: Option<i64>, group_id: Option<i64>) -> BusinessPost {
        let mut t = self.lock();
        let id = t.id();
        let post = BusinessPost {
            id,
            business_category_id,
            group_id,
            profession_type: None,
            file_type: Some("image".to_string()),
            file: Some(format!("business_posts/{}.png", id)),
            added_on: Utc::now(),
        };
        t.business_posts.push(post.clone());
        post
    }

    pub fn mapping_rows(&self, kind: MappingKind) -> Vec<ContentMapping> {
        self.lock().mappings.get(&kind).cloned().unwrap_or_default()
    }

    pub fn mapping(&self, kind: MappingKind, customer_id: i64, content_id: i64) -> Option<ContentMapping> {
        self.mapping_rows(kind)
            .into_iter()
            .find(|m| m.customer_id == customer_id && m.content_id == content_id)
    }

    pub fn set_downloaded(&self, kind: MappingKind, customer_id: i64, content_id: i64, value: bool) {
        let mut t = self.lock();
        if let Some(m) = t
            .mappings
            .entry(kind)
            .or_default()
            .iter_mut()
            .find(|m| m.customer_id == customer_id && m.content_id == content_id)
        {
            m.is_downloaded = value;
        }
    }

    pub fn frame_count(&self) -> usize {
        self.lock().frames.len()
    }

    fn take_snapshot(&self) -> Result<Tables, DatabaseError> {
        self.snapshot
            .as_ref()
            .and_then(|slot| slot.lock().unwrap().take())
            .ok_or_else(|| DatabaseError::QueryError("no open transaction".to_string()))
    }
}

#[async_trait]
impl MappingStore for MemoryStore {
    async fn begin(&self) -> Result<Arc<dyn MappingStore>, DatabaseError> {
        if self.snapshot.is_some() {
            return Err(DatabaseError::QueryError("transaction already open".to_string()));
        }
        let saved = self.lock().clone();
        Ok(Arc::new(MemoryStore {
            tables: self.tables.clone(),
            snapshot: Some(Arc::new(Mutex::new(Some(saved)))),
            mapping_fault: self.mapping_fault.clone(),
        }))
    }

    async fn commit(&self) -> Result<(), DatabaseError> {
        self.take_snapshot().map(|_| ())
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        let saved = self.take_snapshot()?;
        *self.lock() = saved;
        Ok(())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_group(&self, id: i64) -> Result<Option<CustomerGroup>, DatabaseError> {
        Ok(self.lock().groups.iter().find(|g| g.id == id).cloned())
    }

    async fn find_business_category(&self, id: i64) -> Result<Option<BusinessCategory>, DatabaseError> {
        Ok(self.lock().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_frame(&self, id: i64) -> Result<Option<CustomerFrame>, DatabaseError> {
        Ok(self.lock().frames.iter().find(|f| f.id == id).cloned())
    }

    async fn list_frames(&self, filter: &FrameFilter) -> Result<Vec<CustomerFrame>, DatabaseError> {
        let t = self.lock();
        let mut frames: Vec<CustomerFrame> = t
            .frames
            .iter()
            .filter(|f| {
                let group = f
                    .group_id
                    .and_then(|g| t.groups.iter().find(|x| x.id == g))
                    .map(|g| g.name.as_str());
                let phone = t
                    .users
                    .iter()
                    .find(|u| u.id == f.customer_id)
                    .map(|u| u.whatsapp_number.as_str());
                filter.matches(f, group, phone)
            })
            .cloned()
            .collect();
        frames.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(frames)
    }

    async fn insert_frame(&self, frame: &NewFrame) -> Result<CustomerFrame, DatabaseError> {
        let mut t = self.lock();
        let id = t.id();
        let now = Utc::now();
        let saved = CustomerFrame {
            id,
            customer_id: frame.customer_id,
            group_id: frame.group_id,
            business_category_id: frame.business_category_id,
            profession_type: frame.profession_type.clone(),
            display_name: frame.display_name.clone(),
            frame_img: frame.frame_img.clone(),
            created_at: now,
            updated_at: now,
        };
        t.frames.push(saved.clone());
        Ok(saved)
    }

    async fn update_frame(&self, frame: &CustomerFrame) -> Result<CustomerFrame, DatabaseError> {
        let mut t = self.lock();
        let slot = t
            .frames
            .iter_mut()
            .find(|f| f.id == frame.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("frame {}", frame.id)))?;
        *slot = CustomerFrame {
            updated_at: Utc::now(),
            ..frame.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_frame(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut t = self.lock();
        let before = t.frames.len();
        t.frames.retain(|f| f.id != id);
        for rows in t.mappings.values_mut() {
            rows.retain(|m| m.customer_frame_id != id);
        }
        Ok(t.frames.len() < before)
    }

    async fn upcoming_posts(&self, group_id: Option<i64>, from: NaiveDate) -> Result<Vec<Post>, DatabaseError> {
        Ok(self
            .lock()
            .posts
            .iter()
            .filter(|p| p.group_id == group_id && p.event_date >= from)
            .cloned()
            .collect())
    }

    async fn other_posts(&self, group_id: Option<i64>) -> Result<Vec<OtherPost>, DatabaseError> {
        Ok(self.lock().other_posts.iter().filter(|p| p.group_id == group_id).cloned().collect())
    }

    async fn business_posts(&self, business_category_id: Option<i64>) -> Result<Vec<BusinessPost>, DatabaseError> {
        Ok(self
            .lock()
            .business_posts
            .iter()
            .filter(|p| p.business_category_id == business_category_id)
            .cloned()
            .collect())
    }

    async fn post_mappings_in_group(
        &self,
        customer_id: i64,
        group_id: Option<i64>,
    ) -> Result<Vec<ContentMapping>, DatabaseError> {
        let t = self.lock();
        let in_group: HashSet<i64> = t.posts.iter().filter(|p| p.group_id == group_id).map(|p| p.id).collect();
        Ok(t
            .mappings
            .get(&MappingKind::Post)
            .map(|rows| {
                rows.iter()
                    .filter(|m| m.customer_id == customer_id && in_group.contains(&m.content_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn mappings_for_customer(&self, kind: MappingKind, customer_id: i64) -> Result<Vec<ContentMapping>, DatabaseError> {
        Ok(self
            .mapping_rows(kind)
            .into_iter()
            .filter(|m| m.customer_id == customer_id)
            .collect())
    }

    async fn get_or_create_mapping(
        &self,
        kind: MappingKind,
        customer_id: i64,
        content_id: i64,
        frame_id: i64,
    ) -> Result<(ContentMapping, bool), DatabaseError> {
        self.check_mapping_fault()?;
        let mut t = self.lock();
        if let Some(existing) = t
            .mappings
            .get(&kind)
            .and_then(|rows| rows.iter().find(|m| m.customer_id == customer_id && m.content_id == content_id))
        {
            return Ok((existing.clone(), false));
        }
        let id = t.id();
        let now = Utc::now();
        let mapping = ContentMapping {
            id,
            customer_id,
            content_id,
            customer_frame_id: frame_id,
            is_downloaded: false,
            created_at: now,
            updated_at: now,
        };
        t.mappings.entry(kind).or_default().push(mapping.clone());
        Ok((mapping, true))
    }

    async fn save_mapping(&self, kind: MappingKind, mapping: &ContentMapping) -> Result<ContentMapping, DatabaseError> {
        let mut t = self.lock();
        let slot = t
            .mappings
            .entry(kind)
            .or_default()
            .iter_mut()
            .find(|m| m.id == mapping.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("{} mapping {}", kind, mapping.id)))?;
        slot.customer_frame_id = mapping.customer_frame_id;
        slot.is_downloaded = mapping.is_downloaded;
        slot.updated_at = Utc::now();
        Ok(slot.clone())
    }

    async fn mapping_views(&self, kind: MappingKind, customer_id: i64) -> Result<Vec<MappingView>, DatabaseError> {
        let t = self.lock();
        let mut views: Vec<MappingView> = t
            .mappings
            .get(&kind)
            .map(|rows| rows.iter().filter(|m| m.customer_id == customer_id).collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter()
            .map(|m| {
                let frame = t.frames.iter().find(|f| f.id == m.customer_frame_id);
                let content_file = match kind {
                    MappingKind::Post => t.posts.iter().find(|p| p.id == m.content_id).and_then(|p| p.file.clone()),
                    MappingKind::OtherPost => t
                        .other_posts
                        .iter()
                        .find(|p| p.id == m.content_id)
                        .and_then(|p| p.file.clone()),
                    MappingKind::BusinessPost => t
                        .business_posts
                        .iter()
                        .find(|p| p.id == m.content_id)
                        .and_then(|p| p.file.clone()),
                };
                MappingView {
                    id: m.id,
                    customer_id: m.customer_id,
                    content_id: m.content_id,
                    customer_frame_id: m.customer_frame_id,
                    is_downloaded: m.is_downloaded,
                    content_file,
                    frame_img: frame.and_then(|f| f.frame_img.clone()),
                    frame_group_name: frame
                        .and_then(|f| f.group_id)
                        .and_then(|g| t.groups.iter().find(|x| x.id == g))
                        .map(|g| g.name.clone()),
                    event_name: match kind {
                        MappingKind::Post => Some("Event".to_string()),
                        _ => None,
                    },
                }
            })
            .collect();
        views.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(views)
    }

    async fn find_mapping(&self, kind: MappingKind, id: i64) -> Result<Option<ContentMapping>, DatabaseError> {
        Ok(self.mapping_rows(kind).into_iter().find(|m| m.id == id))
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: &NewUser) -> Result<User, DatabaseError> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DatabaseError::Conflict(format!("email {} is taken", user.email)));
        }
        let id = t.id();
        let now = Utc::now();
        let stored = User {
            id,
            email: user.email.clone(),
            username: Some(user.email.clone()),
            password_hash: user.password_hash.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            user_type: user.user_type.clone(),
            whatsapp_number: user.whatsapp_number.clone(),
            address: user.address.clone(),
            pincode: user.pincode,
            city: user.city.clone(),
            dob: user.dob,
            business_category_id: user.business_category_id,
            no_of_post: user.no_of_post.unwrap_or(1),
            is_verify: false,
            is_staff: user.is_staff,
            is_deleted: false,
            email_verified_at: None,
            created_at: now,
            updated_at: now,
        };
        t.users.push(stored.clone());
        Ok(stored)
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, DatabaseError> {
        let mut users: Vec<User> = self.lock().users.iter().filter(|u| filter.matches(u)).cloned().collect();
        users.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(users)
    }

    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> Result<(), DatabaseError> {
        if let Some(user) = self.lock().users.iter_mut().find(|u| u.id == user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn mark_email_verified(&self, user_id: i64) -> Result<(), DatabaseError> {
        if let Some(user) = self.lock().users.iter_mut().find(|u| u.id == user_id) {
            user.email_verified_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn latest_code(&self, user_id: i64, code_type: CodeType) -> Result<Option<UserCode>, DatabaseError> {
        Ok(self
            .lock()
            .codes
            .iter()
            .filter(|c| c.user_id == user_id && c.code_type == code_type.as_str())
            .max_by_key(|c| c.id)
            .cloned())
    }

    async fn insert_code(&self, user_id: i64, code_type: CodeType, code: i32) -> Result<UserCode, DatabaseError> {
        let mut t = self.lock();
        let id = t.id();
        let stored = UserCode {
            id,
            user_id,
            code,
            code_type: code_type.as_str().to_string(),
            verified_at: None,
            created_at: Utc::now(),
        };
        t.codes.push(stored.clone());
        Ok(stored)
    }

    async fn mark_code_verified(&self, code_id: i64) -> Result<(), DatabaseError> {
        if let Some(code) = self.lock().codes.iter_mut().find(|c| c.id == code_id) {
            code.verified_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_code(&self, code_id: i64) -> Result<(), DatabaseError> {
        self.lock().codes.retain(|c| c.id != code_id);
        Ok(())
    }

    async fn subscriptions_for_user(&self, user_id: i64) -> Result<Vec<Subscription>, DatabaseError> {
        let mut subscriptions: Vec<Subscription> = self
            .lock()
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        subscriptions.sort_by(|a, b| b.end_date.cmp(&a.end_date));
        Ok(subscriptions)
    }

    async fn frame_summaries(&self, customer_id: i64) -> Result<Vec<FrameSummaryRow>, DatabaseError> {
        let t = self.lock();
        let mut rows: Vec<FrameSummaryRow> = t
            .frames
            .iter()
            .filter(|f| f.customer_id == customer_id)
            .map(|f| {
                let category = f
                    .business_category_id
                    .and_then(|c| t.categories.iter().find(|x| x.id == c));
                FrameSummaryRow {
                    frame_id: f.id,
                    profession_type: f.profession_type.clone(),
                    group_name: f
                        .group_id
                        .and_then(|g| t.groups.iter().find(|x| x.id == g))
                        .map(|g| g.name.clone()),
                    category_id: category.map(|c| c.id),
                    category_name: category.map(|c| c.name.clone()),
                    category_thumbnail: category.and_then(|c| c.thumbnail.clone()),
                }
            })
            .collect();
        rows.sort_by_key(|r| (r.category_id.is_none(), r.category_id, r.frame_id));
        Ok(rows)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn revoke_token(&self, jti: Uuid, _user_id: i64, _expires_at: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.lock().revoked.insert(jti);
        Ok(())
    }

    async fn is_token_revoked(&self, jti: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.lock().revoked.contains(&jti))
    }
}
