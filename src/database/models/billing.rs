use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    pub duration_in_months: i32,
    pub price: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub order_number: String,
    pub user_id: i64,
    pub plan_id: i64,
    pub payment_method_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub transaction_number: Option<String>,
    pub file: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
