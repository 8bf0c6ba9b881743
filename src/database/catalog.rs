use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    BusinessCategory, BusinessPost, Category, CustomerGroup, Event, OtherPost, PaymentMethod, Plan, Post, Subscription,
};
use crate::database::postgres::PgStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub event_date: NaiveDate,
    pub event_type: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<i64>,
    pub banner_image: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBusinessCategory {
    pub name: String,
    pub profession_type: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub event_id: i64,
    pub group_id: Option<i64>,
    pub file_type: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOtherPost {
    pub category_id: i64,
    pub group_id: Option<i64>,
    pub file_type: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBusinessPost {
    pub business_category_id: Option<i64>,
    pub group_id: Option<i64>,
    pub profession_type: Option<String>,
    pub file_type: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlan {
    pub name: String,
    pub duration_in_months: i32,
    pub price: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
    pub user_id: i64,
    pub plan_id: i64,
    pub payment_method_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub transaction_number: Option<String>,
    pub file: Option<String>,
}

/// Post joined with its event and group for listings
#[derive(Debug, Clone, FromRow)]
pub struct PostListingRow {
    #[sqlx(flatten)]
    pub post: Post,
    pub event_name: String,
    pub event_thumbnail: Option<String>,
    pub group_name: Option<String>,
}

/// Business post joined with its group and business category for listings
#[derive(Debug, Clone, FromRow)]
pub struct BusinessPostListingRow {
    #[sqlx(flatten)]
    pub post: BusinessPost,
    pub group_name: Option<String>,
    pub business_category_name: Option<String>,
    pub category_thumbnail: Option<String>,
}

/// Subscription list filters; all set filters apply together
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionFilter {
    pub user_id: Option<i64>,
    /// Ends between `today` and `today + 10 days`
    pub expiring_soon: bool,
    pub expired: bool,
    pub active: bool,
}

pub(crate) const SUBSCRIPTION_COLUMNS: &str = "id, order_number, user_id, plan_id, payment_method_id, start_date, end_date, \
                                    transaction_number, file, is_active, created_at";

impl PgStore {
    // Groups

    pub async fn list_groups(&self) -> Result<Vec<CustomerGroup>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(
            sqlx::query_as::<_, CustomerGroup>("SELECT id, name, created_at, updated_at FROM customer_groups ORDER BY name")
                .fetch_all(&mut *conn)
                .await?,
        )
    }

    pub async fn insert_group(&self, name: &str) -> Result<CustomerGroup, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, CustomerGroup>(
            "INSERT INTO customer_groups (name) VALUES ($1) RETURNING id, name, created_at, updated_at",
        )
        .bind(name)
        .fetch_one(&mut *conn)
        .await?)
    }

    pub async fn rename_group(&self, id: i64, name: &str) -> Result<CustomerGroup, DatabaseError> {
        let mut conn = self.conn().await?;
        sqlx::query_as::<_, CustomerGroup>(
            "UPDATE customer_groups SET name = $2, updated_at = now() WHERE id = $1
             RETURNING id, name, created_at, updated_at",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("group {}", id)))
    }

    pub async fn delete_group(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut conn = self.conn().await?;
        let result = sqlx::query("DELETE FROM customer_groups WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // Content catalogs

    pub async fn list_events(&self) -> Result<Vec<Event>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, Event>(
            "SELECT id, name, event_date, event_type, thumbnail FROM events ORDER BY event_date, id",
        )
        .fetch_all(&mut *conn)
        .await?)
    }

    pub async fn insert_event(&self, event: &NewEvent) -> Result<Event, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, Event>(
            "INSERT INTO events (name, event_date, event_type, thumbnail) VALUES ($1, $2, $3, $4)
             RETURNING id, name, event_date, event_type, thumbnail",
        )
        .bind(&event.name)
        .bind(event.event_date)
        .bind(&event.event_type)
        .bind(&event.thumbnail)
        .fetch_one(&mut *conn)
        .await?)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, Category>(
            "SELECT id, name, parent_id, banner_image, is_active, is_featured FROM categories ORDER BY id",
        )
        .fetch_all(&mut *conn)
        .await?)
    }

    pub async fn insert_category(&self, category: &NewCategory) -> Result<Category, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, parent_id, banner_image, is_active, is_featured) VALUES ($1, $2, $3, $4, $5)
             RETURNING id, name, parent_id, banner_image, is_active, is_featured",
        )
        .bind(&category.name)
        .bind(category.parent_id)
        .bind(&category.banner_image)
        .bind(category.is_active)
        .bind(category.is_featured)
        .fetch_one(&mut *conn)
        .await?)
    }

    pub async fn list_business_categories(&self) -> Result<Vec<BusinessCategory>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, BusinessCategory>(
            "SELECT id, name, profession_type, thumbnail FROM business_categories ORDER BY id",
        )
        .fetch_all(&mut *conn)
        .await?)
    }

    pub async fn insert_business_category(&self, category: &NewBusinessCategory) -> Result<BusinessCategory, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, BusinessCategory>(
            "INSERT INTO business_categories (name, profession_type, thumbnail) VALUES ($1, $2, $3)
             RETURNING id, name, profession_type, thumbnail",
        )
        .bind(&category.name)
        .bind(&category.profession_type)
        .bind(&category.thumbnail)
        .fetch_one(&mut *conn)
        .await?)
    }

    pub async fn list_posts(&self) -> Result<Vec<PostListingRow>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, PostListingRow>(
            "SELECT p.id, p.event_id, p.group_id, p.file_type, p.file, p.added_on, e.event_date,
                    e.name AS event_name, e.thumbnail AS event_thumbnail, g.name AS group_name
             FROM posts p
             JOIN events e ON e.id = p.event_id
             LEFT JOIN customer_groups g ON g.id = p.group_id
             ORDER BY p.id DESC",
        )
        .fetch_all(&mut *conn)
        .await?)
    }

    pub async fn insert_post(&self, post: &NewPost) -> Result<Post, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, Post>(
            "WITH p AS (
                 INSERT INTO posts (event_id, group_id, file_type, file) VALUES ($1, $2, $3, $4)
                 RETURNING id, event_id, group_id, file_type, file, added_on
             )
             SELECT p.id, p.event_id, p.group_id, p.file_type, p.file, p.added_on, e.event_date
             FROM p JOIN events e ON e.id = p.event_id",
        )
        .bind(post.event_id)
        .bind(post.group_id)
        .bind(&post.file_type)
        .bind(&post.file)
        .fetch_one(&mut *conn)
        .await?)
    }

    pub async fn list_other_posts(&self) -> Result<Vec<OtherPost>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, OtherPost>(
            "SELECT id, category_id, group_id, file_type, file FROM other_posts ORDER BY id DESC",
        )
        .fetch_all(&mut *conn)
        .await?)
    }

    pub async fn insert_other_post(&self, post: &NewOtherPost) -> Result<OtherPost, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, OtherPost>(
            "INSERT INTO other_posts (category_id, group_id, file_type, file) VALUES ($1, $2, $3, $4)
             RETURNING id, category_id, group_id, file_type, file",
        )
        .bind(post.category_id)
        .bind(post.group_id)
        .bind(&post.file_type)
        .bind(&post.file)
        .fetch_one(&mut *conn)
        .await?)
    }

    pub async fn list_business_posts(&self) -> Result<Vec<BusinessPostListingRow>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, BusinessPostListingRow>(
            "SELECT b.id, b.business_category_id, b.group_id, b.profession_type, b.file_type, b.file, b.added_on,
                    g.name AS group_name, c.name AS business_category_name, c.thumbnail AS category_thumbnail
             FROM business_posts b
             LEFT JOIN customer_groups g ON g.id = b.group_id
             LEFT JOIN business_categories c ON c.id = b.business_category_id
             ORDER BY b.id DESC",
        )
        .fetch_all(&mut *conn)
        .await?)
    }

    pub async fn insert_business_post(&self, post: &NewBusinessPost) -> Result<BusinessPost, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, BusinessPost>(
            "INSERT INTO business_posts (business_category_id, group_id, profession_type, file_type, file)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, business_category_id, group_id, profession_type, file_type, file, added_on",
        )
        .bind(post.business_category_id)
        .bind(post.group_id)
        .bind(&post.profession_type)
        .bind(&post.file_type)
        .bind(&post.file)
        .fetch_one(&mut *conn)
        .await?)
    }

    // Billing

    pub async fn list_plans(&self) -> Result<Vec<Plan>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(
            sqlx::query_as::<_, Plan>("SELECT id, name, duration_in_months, price FROM plans ORDER BY id")
                .fetch_all(&mut *conn)
                .await?,
        )
    }

    pub async fn insert_plan(&self, plan: &NewPlan) -> Result<Plan, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, Plan>(
            "INSERT INTO plans (name, duration_in_months, price) VALUES ($1, $2, $3)
             RETURNING id, name, duration_in_months, price",
        )
        .bind(&plan.name)
        .bind(plan.duration_in_months)
        .bind(plan.price)
        .fetch_one(&mut *conn)
        .await?)
    }

    pub async fn delete_plan(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut conn = self.conn().await?;
        let result = sqlx::query("DELETE FROM plans WHERE id = $1").bind(id).execute(&mut *conn).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(
            sqlx::query_as::<_, PaymentMethod>("SELECT id, name FROM payment_methods ORDER BY id")
                .fetch_all(&mut *conn)
                .await?,
        )
    }

    pub async fn insert_payment_method(&self, name: &str) -> Result<PaymentMethod, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(
            sqlx::query_as::<_, PaymentMethod>("INSERT INTO payment_methods (name) VALUES ($1) RETURNING id, name")
                .bind(name)
                .fetch_one(&mut *conn)
                .await?,
        )
    }

    pub async fn delete_payment_method(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut conn = self.conn().await?;
        let result = sqlx::query("DELETE FROM payment_methods WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_subscriptions(
        &self,
        filter: &SubscriptionFilter,
        today: NaiveDate,
    ) -> Result<Vec<Subscription>, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!(
            "SELECT {} FROM subscriptions
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND (NOT $2 OR (end_date >= $5 AND end_date <= $5 + 10))
               AND (NOT $3 OR end_date < $5)
               AND (NOT $4 OR end_date >= $5)
             ORDER BY id DESC",
            SUBSCRIPTION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Subscription>(&sql)
            .bind(filter.user_id)
            .bind(filter.expiring_soon)
            .bind(filter.expired)
            .bind(filter.active)
            .bind(today)
            .fetch_all(&mut *conn)
            .await?)
    }

    pub async fn last_order_number(&self) -> Result<Option<String>, DatabaseError> {
        let mut conn = self.conn().await?;
        let row: Option<(String,)> = sqlx::query_as("SELECT order_number FROM subscriptions ORDER BY id DESC LIMIT 1")
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|(n,)| n))
    }

    pub async fn insert_subscription(
        &self,
        subscription: &NewSubscription,
        order_number: &str,
    ) -> Result<Subscription, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!(
            "INSERT INTO subscriptions (order_number, user_id, plan_id, payment_method_id, start_date, end_date,
                                        transaction_number, file)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            SUBSCRIPTION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Subscription>(&sql)
            .bind(order_number)
            .bind(subscription.user_id)
            .bind(subscription.plan_id)
            .bind(subscription.payment_method_id)
            .bind(subscription.start_date)
            .bind(subscription.end_date)
            .bind(&subscription.transaction_number)
            .bind(&subscription.file)
            .fetch_one(&mut *conn)
            .await?)
    }
}
