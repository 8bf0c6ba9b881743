use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    ForgottenPassword,
}

impl CodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeType::ForgottenPassword => "forgotten_password",
        }
    }
}

/// One-time code mailed to a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserCode {
    pub id: i64,
    pub user_id: i64,
    pub code: i32,
    pub code_type: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
