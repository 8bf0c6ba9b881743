use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Customer,
    Admin,
}

impl UserType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "customer" => Some(UserType::Customer),
            "admin" => Some(UserType::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Customer => "customer",
            UserType::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
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
    pub no_of_post: i32,
    pub is_verify: bool,
    pub is_staff: bool,
    pub is_deleted: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.is_staff || self.user_type == UserType::Admin.as_str()
    }

    /// Customers hold a single post slot; anything above that is a reseller account.
    pub fn is_customer(&self) -> bool {
        self.no_of_post <= 1
    }

    pub fn display_name(&self) -> String {
        format!("{} {}({})", self.first_name, self.last_name, self.whatsapp_number)
    }
}
