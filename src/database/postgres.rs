use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    BusinessCategory, BusinessPost, ContentMapping, CustomerFrame, CustomerGroup, MappingKind, OtherPost, Post, User,
};
use crate::database::store::{FrameFilter, MappingStore, MappingView, NewFrame, TokenStore};

const FRAME_COLUMNS: &str = "id, customer_id, group_id, business_category_id, profession_type, display_name, \
                             frame_img, created_at, updated_at";

pub const USER_COLUMNS: &str = "id, email, username, password_hash, first_name, last_name, user_type, \
                                whatsapp_number, address, pincode, city, dob, business_category_id, no_of_post, \
                                is_verify, is_staff, is_deleted, email_verified_at, created_at, updated_at";

type SharedTransaction = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// PostgreSQL implementation of the store traits. The pool is resolved
/// through `DatabaseManager` per call so the server can start before the
/// database is reachable.
///
/// A store returned by `begin` runs every query on one open transaction
/// until `commit` or `rollback`; dropping it uncommitted rolls back.
#[derive(Clone, Default)]
pub struct PgStore {
    tx: Option<SharedTransaction>,
}

/// Connection a single query runs on
pub(crate) enum Conn<'a> {
    Pooled(PoolConnection<Postgres>),
    Tx(MappedMutexGuard<'a, Transaction<'static, Postgres>>),
}

impl Deref for Conn<'_> {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        match self {
            Conn::Pooled(conn) => &**conn,
            Conn::Tx(tx) => &***tx,
        }
    }
}

impl DerefMut for Conn<'_> {
    fn deref_mut(&mut self) -> &mut PgConnection {
        match self {
            Conn::Pooled(conn) => &mut **conn,
            Conn::Tx(tx) => &mut ***tx,
        }
    }
}

impl PgStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn pool(&self) -> Result<PgPool, DatabaseError> {
        DatabaseManager::pool().await
    }

    pub(crate) async fn conn(&self) -> Result<Conn<'_>, DatabaseError> {
        match &self.tx {
            None => Ok(Conn::Pooled(self.pool().await?.acquire().await?)),
            Some(tx) => MutexGuard::try_map(tx.lock().await, Option::as_mut)
                .map(Conn::Tx)
                .map_err(|_| DatabaseError::QueryError("transaction already finished".to_string())),
        }
    }

    /// Open a transaction; the returned store shares it across clones
    pub async fn begin_transaction(&self) -> Result<PgStore, DatabaseError> {
        if self.tx.is_some() {
            return Err(DatabaseError::QueryError("transaction already open".to_string()));
        }
        let tx = self.pool().await?.begin().await?;
        Ok(PgStore {
            tx: Some(Arc::new(Mutex::new(Some(tx)))),
        })
    }

    async fn take_transaction(&self) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        let slot = self
            .tx
            .as_ref()
            .ok_or_else(|| DatabaseError::QueryError("no open transaction".to_string()))?;
        slot.lock()
            .await
            .take()
            .ok_or_else(|| DatabaseError::QueryError("transaction already finished".to_string()))
    }

    fn mapping_columns(kind: MappingKind) -> String {
        format!(
            "id, customer_id, {} AS content_id, customer_frame_id, is_downloaded, created_at, updated_at",
            kind.content_column()
        )
    }
}

#[async_trait]
impl MappingStore for PgStore {
    async fn begin(&self) -> Result<Arc<dyn MappingStore>, DatabaseError> {
        Ok(Arc::new(self.begin_transaction().await?))
    }

    async fn commit(&self) -> Result<(), DatabaseError> {
        self.take_transaction().await?.commit().await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        self.take_transaction().await?.rollback().await?;
        Ok(())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&mut *conn).await?)
    }

    async fn find_group(&self, id: i64) -> Result<Option<CustomerGroup>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(
            sqlx::query_as::<_, CustomerGroup>("SELECT id, name, created_at, updated_at FROM customer_groups WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?,
        )
    }

    async fn find_business_category(&self, id: i64) -> Result<Option<BusinessCategory>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, BusinessCategory>(
            "SELECT id, name, profession_type, thumbnail FROM business_categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?)
    }

    async fn find_frame(&self, id: i64) -> Result<Option<CustomerFrame>, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!("SELECT {} FROM customer_frames WHERE id = $1", FRAME_COLUMNS);
        Ok(sqlx::query_as::<_, CustomerFrame>(&sql).bind(id).fetch_optional(&mut *conn).await?)
    }

    async fn list_frames(&self, filter: &FrameFilter) -> Result<Vec<CustomerFrame>, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = r#"
            SELECT f.id, f.customer_id, f.group_id, f.business_category_id, f.profession_type,
                   f.display_name, f.frame_img, f.created_at, f.updated_at
            FROM customer_frames f
            JOIN users u ON u.id = f.customer_id
            LEFT JOIN customer_groups g ON g.id = f.group_id
            WHERE ($1::BIGINT IS NULL OR f.customer_id = $1)
              AND ($2::TEXT IS NULL
                   OR g.name ILIKE '%' || $2 || '%'
                   OR u.whatsapp_number ILIKE '%' || $2 || '%'
                   OR f.display_name ILIKE '%' || $2 || '%')
              AND ($3::TEXT IS NULL OR g.name = $3)
              AND ($4::TEXT IS NULL OR f.profession_type = $4)
            ORDER BY f.id DESC
        "#;
        Ok(sqlx::query_as::<_, CustomerFrame>(sql)
            .bind(filter.customer_id)
            .bind(filter.search.as_deref())
            .bind(filter.group_name.as_deref())
            .bind(filter.profession_type.as_deref())
            .fetch_all(&mut *conn)
            .await?)
    }

    async fn insert_frame(&self, frame: &NewFrame) -> Result<CustomerFrame, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!(
            "INSERT INTO customer_frames (customer_id, group_id, business_category_id, profession_type, display_name, frame_img)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            FRAME_COLUMNS
        );
        Ok(sqlx::query_as::<_, CustomerFrame>(&sql)
            .bind(frame.customer_id)
            .bind(frame.group_id)
            .bind(frame.business_category_id)
            .bind(&frame.profession_type)
            .bind(&frame.display_name)
            .bind(&frame.frame_img)
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn update_frame(&self, frame: &CustomerFrame) -> Result<CustomerFrame, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!(
            "UPDATE customer_frames
             SET group_id = $2, business_category_id = $3, profession_type = $4, display_name = $5,
                 frame_img = $6, updated_at = now()
             WHERE id = $1
             RETURNING {}",
            FRAME_COLUMNS
        );
        sqlx::query_as::<_, CustomerFrame>(&sql)
            .bind(frame.id)
            .bind(frame.group_id)
            .bind(frame.business_category_id)
            .bind(&frame.profession_type)
            .bind(&frame.display_name)
            .bind(&frame.frame_img)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("frame {}", frame.id)))
    }

    async fn delete_frame(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut conn = self.conn().await?;
        let result = sqlx::query("DELETE FROM customer_frames WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upcoming_posts(&self, group_id: Option<i64>, from: NaiveDate) -> Result<Vec<Post>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, Post>(
            r#"
            SELECT p.id, p.event_id, p.group_id, p.file_type, p.file, p.added_on, e.event_date
            FROM posts p
            JOIN events e ON e.id = p.event_id
            WHERE p.group_id IS NOT DISTINCT FROM $1
              AND e.event_date >= $2
            ORDER BY p.id
            "#,
        )
        .bind(group_id)
        .bind(from)
        .fetch_all(&mut *conn)
        .await?)
    }

    async fn other_posts(&self, group_id: Option<i64>) -> Result<Vec<OtherPost>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, OtherPost>(
            "SELECT id, category_id, group_id, file_type, file FROM other_posts
             WHERE group_id IS NOT DISTINCT FROM $1 ORDER BY id",
        )
        .bind(group_id)
        .fetch_all(&mut *conn)
        .await?)
    }

    async fn business_posts(&self, business_category_id: Option<i64>) -> Result<Vec<BusinessPost>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, BusinessPost>(
            "SELECT id, business_category_id, group_id, profession_type, file_type, file, added_on
             FROM business_posts
             WHERE business_category_id IS NOT DISTINCT FROM $1 ORDER BY id",
        )
        .bind(business_category_id)
        .fetch_all(&mut *conn)
        .await?)
    }

    async fn post_mappings_in_group(
        &self,
        customer_id: i64,
        group_id: Option<i64>,
    ) -> Result<Vec<ContentMapping>, DatabaseError> {
        let mut conn = self.conn().await?;
        Ok(sqlx::query_as::<_, ContentMapping>(
            r#"
            SELECT m.id, m.customer_id, m.post_id AS content_id, m.customer_frame_id, m.is_downloaded,
                   m.created_at, m.updated_at
            FROM customer_post_frame_mappings m
            JOIN posts p ON p.id = m.post_id
            WHERE m.customer_id = $1
              AND p.group_id IS NOT DISTINCT FROM $2
            ORDER BY m.id
            "#,
        )
        .bind(customer_id)
        .bind(group_id)
        .fetch_all(&mut *conn)
        .await?)
    }

    async fn mappings_for_customer(&self, kind: MappingKind, customer_id: i64) -> Result<Vec<ContentMapping>, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!(
            "SELECT {} FROM {} WHERE customer_id = $1 ORDER BY id",
            Self::mapping_columns(kind),
            kind.table()
        );
        Ok(sqlx::query_as::<_, ContentMapping>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?)
    }

    async fn get_or_create_mapping(
        &self,
        kind: MappingKind,
        customer_id: i64,
        content_id: i64,
        frame_id: i64,
    ) -> Result<(ContentMapping, bool), DatabaseError> {
        let mut conn = self.conn().await?;
        let columns = Self::mapping_columns(kind);

        // The unique (customer, content) key makes concurrent saves converge on one row
        let insert = format!(
            "INSERT INTO {table} (customer_id, {col}, customer_frame_id) VALUES ($1, $2, $3)
             ON CONFLICT (customer_id, {col}) DO NOTHING
             RETURNING {columns}",
            table = kind.table(),
            col = kind.content_column(),
            columns = columns
        );
        let created = sqlx::query_as::<_, ContentMapping>(&insert)
            .bind(customer_id)
            .bind(content_id)
            .bind(frame_id)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(mapping) = created {
            return Ok((mapping, true));
        }

        let select = format!(
            "SELECT {} FROM {} WHERE customer_id = $1 AND {} = $2",
            columns,
            kind.table(),
            kind.content_column()
        );
        let existing = sqlx::query_as::<_, ContentMapping>(&select)
            .bind(customer_id)
            .bind(content_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok((existing, false))
    }

    async fn save_mapping(&self, kind: MappingKind, mapping: &ContentMapping) -> Result<ContentMapping, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!(
            "UPDATE {} SET customer_frame_id = $2, is_downloaded = $3, updated_at = now()
             WHERE id = $1
             RETURNING {}",
            kind.table(),
            Self::mapping_columns(kind)
        );
        sqlx::query_as::<_, ContentMapping>(&sql)
            .bind(mapping.id)
            .bind(mapping.customer_frame_id)
            .bind(mapping.is_downloaded)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} mapping {}", kind, mapping.id)))
    }

    async fn mapping_views(&self, kind: MappingKind, customer_id: i64) -> Result<Vec<MappingView>, DatabaseError> {
        let mut conn = self.conn().await?;
        let event_join = match kind {
            MappingKind::Post => "LEFT JOIN events e ON e.id = c.event_id",
            _ => "",
        };
        let event_name = match kind {
            MappingKind::Post => "e.name",
            _ => "NULL::TEXT",
        };
        let sql = format!(
            r#"
            SELECT m.id, m.customer_id, m.{col} AS content_id, m.customer_frame_id, m.is_downloaded,
                   c.file AS content_file, f.frame_img, g.name AS frame_group_name, {event_name} AS event_name
            FROM {table} m
            JOIN {content_table} c ON c.id = m.{col}
            JOIN customer_frames f ON f.id = m.customer_frame_id
            LEFT JOIN customer_groups g ON g.id = f.group_id
            {event_join}
            WHERE m.customer_id = $1
            ORDER BY m.id DESC
            "#,
            col = kind.content_column(),
            table = kind.table(),
            content_table = kind.content_table(),
            event_name = event_name,
            event_join = event_join,
        );
        Ok(sqlx::query_as::<_, MappingView>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?)
    }

    async fn find_mapping(&self, kind: MappingKind, id: i64) -> Result<Option<ContentMapping>, DatabaseError> {
        let mut conn = self.conn().await?;
        let sql = format!("SELECT {} FROM {} WHERE id = $1", Self::mapping_columns(kind), kind.table());
        Ok(sqlx::query_as::<_, ContentMapping>(&sql).bind(id).fetch_optional(&mut *conn).await?)
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn revoke_token(&self, jti: Uuid, user_id: i64, expires_at: DateTime<Utc>) -> Result<(), DatabaseError> {
        let mut conn = self.conn().await?;
        sqlx::query(
            "INSERT INTO revoked_tokens (jti, user_id, expires_at) VALUES ($1, $2, $3)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn is_token_revoked(&self, jti: Uuid) -> Result<bool, DatabaseError> {
        let mut conn = self.conn().await?;
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT jti FROM revoked_tokens WHERE jti = $1")
            .bind(jti)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.is_some())
    }
}
