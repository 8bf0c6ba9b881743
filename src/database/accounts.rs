use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::catalog::SUBSCRIPTION_COLUMNS;
use crate::database::manager::DatabaseError;
use crate::database::models::{CodeType, Subscription, User, UserCode, UserType};
use crate::database::postgres::{PgStore, USER_COLUMNS};
use crate::database::store::AccountStore;

/// Columns accepted at registration; the password arrives already hashed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: String,
    pub whatsapp_number: String,
    pub address: Option<String>,
    pub pincode: Option<i32>,
    pub city: Option<String>,
    pub dob: Option<NaiveDate>,
    pub business_category_id: Option<i64>,
    pub no_of_post: Option<i32>,
    pub is_staff: bool,
}

/// A customer's frame joined with its group and business category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct FrameSummaryRow {
    pub frame_id: i64,
    pub profession_type: Option<String>,
    pub group_name: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub category_thumbnail: Option<String>,
}

/// `data=` selector of the admin user listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserScope {
    /// Unverified customers who signed up today
    Recent,
    Admin,
    /// Verified customers
    Active,
    /// Unverified customers
    Inactive,
    /// Soft-deleted customers
    #[serde(rename = "delete")]
    Deleted,
}

/// Filters for the admin user listing
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub scope: Option<UserScope>,
    /// Case-insensitive match on first name, last name, email or WhatsApp number
    pub search: Option<String>,
    /// Start of the business day in UTC, bounding the `recent` scope
    pub day_start: DateTime<Utc>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        let customer = user.user_type == UserType::Customer.as_str();
        let in_scope = match self.scope {
            None => true,
            Some(UserScope::Recent) => {
                customer
                    && !user.is_verify
                    && user.created_at >= self.day_start
                    && user.created_at < self.day_start + Duration::days(1)
            }
            Some(UserScope::Admin) => user.user_type == UserType::Admin.as_str(),
            Some(UserScope::Active) => customer && user.is_verify,
            Some(UserScope::Inactive) => customer && !user.is_verify,
            Some(UserScope::Deleted) => customer && user.is_deleted,
        };

        in_scope
            && match &self.search {
                None => true,
                Some(term) => {
                    let term = term.to_lowercase();
                    [&user.first_name, &user.last_name, &user.email, &user.whatsapp_number]
                        .iter()
                        .any(|v| v.to_lowercase().contains(&term))
                }
            }
    }
}

const CODE_COLUMNS: &str = "id, user_id, code, code_type, verified_at, created_at";

#[async_trait]
impl AccountStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!("SELECT {} FROM users WHERE lower(email) = lower($1)", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(&mut *conn).await?)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<User, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!(
            "INSERT INTO users (email, username, password_hash, first_name, last_name, user_type, whatsapp_number,
                                address, pincode, city, dob, business_category_id, no_of_post, is_staff)
             VALUES ($1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, COALESCE($12, 1), $13)
             RETURNING {}",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.user_type)
            .bind(&user.whatsapp_number)
            .bind(&user.address)
            .bind(user.pincode)
            .bind(&user.city)
            .bind(user.dob)
            .bind(user.business_category_id)
            .bind(user.no_of_post)
            .bind(user.is_staff)
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!(
            "SELECT {} FROM users
             WHERE CASE $1::TEXT
                       WHEN 'recent' THEN user_type = 'customer' AND NOT is_verify
                                          AND created_at >= $3 AND created_at < $3 + INTERVAL '1 day'
                       WHEN 'admin' THEN user_type = 'admin'
                       WHEN 'active' THEN user_type = 'customer' AND is_verify
                       WHEN 'inactive' THEN user_type = 'customer' AND NOT is_verify
                       WHEN 'delete' THEN user_type = 'customer' AND is_deleted
                       ELSE TRUE
                   END
               AND ($2::TEXT IS NULL
                    OR first_name ILIKE '%' || $2 || '%'
                    OR last_name ILIKE '%' || $2 || '%'
                    OR email ILIKE '%' || $2 || '%'
                    OR whatsapp_number ILIKE '%' || $2 || '%')
             ORDER BY id DESC",
            USER_COLUMNS
        );
        let scope = filter.scope.map(|s| match s {
            UserScope::Recent => "recent",
            UserScope::Admin => "admin",
            UserScope::Active => "active",
            UserScope::Inactive => "inactive",
            UserScope::Deleted => "delete",
        });
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(scope)
            .bind(filter.search.as_deref())
            .bind(filter.day_start)
            .fetch_all(&mut *conn)
            .await?)
    }

    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> Result<(), DatabaseError> {
        let mut conn = self.conn().await?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn mark_email_verified(&self, user_id: i64) -> Result<(), DatabaseError> {
        let mut conn = self.conn().await?;
        sqlx::query("UPDATE users SET email_verified_at = now(), updated_at = now() WHERE id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn latest_code(&self, user_id: i64, code_type: CodeType) -> Result<Option<UserCode>, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!(
            "SELECT {} FROM user_codes WHERE user_id = $1 AND code_type = $2 ORDER BY id DESC LIMIT 1",
            CODE_COLUMNS
        );
        Ok(sqlx::query_as::<_, UserCode>(&sql)
            .bind(user_id)
            .bind(code_type.as_str())
            .fetch_optional(&mut *conn)
            .await?)
    }

    async fn insert_code(&self, user_id: i64, code_type: CodeType, code: i32) -> Result<UserCode, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!(
            "INSERT INTO user_codes (user_id, code, code_type) VALUES ($1, $2, $3) RETURNING {}",
            CODE_COLUMNS
        );
        Ok(sqlx::query_as::<_, UserCode>(&sql)
            .bind(user_id)
            .bind(code)
            .bind(code_type.as_str())
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn mark_code_verified(&self, code_id: i64) -> Result<(), DatabaseError> {
        let mut conn = self.conn().await?;
        sqlx::query("UPDATE user_codes SET verified_at = now() WHERE id = $1")
            .bind(code_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn delete_code(&self, code_id: i64) -> Result<(), DatabaseError> {
        let mut conn = self.conn().await?;
        sqlx::query("DELETE FROM user_codes WHERE id = $1")
            .bind(code_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn subscriptions_for_user(&self, user_id: i64) -> Result<Vec<Subscription>, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY end_date DESC",
            SUBSCRIPTION_COLUMNS
        );
        Ok(sqlx::query_as::<_, Subscription>(&sql).bind(user_id).fetch_all(&mut *conn).await?)
    }

    async fn frame_summaries(&self, customer_id: i64) -> Result<Vec<FrameSummaryRow>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, FrameSummaryRow>(
            r#"
            SELECT f.id AS frame_id, f.profession_type, g.name AS group_name,
                   c.id AS category_id, c.name AS category_name, c.thumbnail AS category_thumbnail
            FROM customer_frames f
            LEFT JOIN customer_groups g ON g.id = f.group_id
            LEFT JOIN business_categories c ON c.id = f.business_category_id
            WHERE f.customer_id = $1
            ORDER BY c.id NULLS LAST, f.id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?)
    }
}
