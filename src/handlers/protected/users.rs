use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::config;
use crate::database::accounts::{UserFilter, UserScope};
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::account_service::{CustomerSummary, RegisterRequest};

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    /// recent | admin | active | inactive | delete
    pub data: Option<UserScope>,
    pub search: Option<String>,
}

impl UserQuery {
    fn into_filter(self) -> UserFilter {
        UserFilter {
            scope: self.data,
            search: self.search.filter(|s| !s.trim().is_empty()),
            day_start: config::business_day_start(config::today()),
        }
    }
}

/// GET /api/users?data=&search=
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Vec<User>> {
    user.require_admin()?;
    Ok(ApiResponse::success(state.accounts.list_users(&query.into_filter()).await?))
}

/// POST /api/users: the only HTTP path that can create admin accounts
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Value> {
    user.require_admin()?;
    let created = state.accounts.create_user(request).await?;
    tracing::info!("Admin {} created {} {}", user.id, created.user_type, created.id);
    Ok(ApiResponse::created(json!({
        "id": created.id,
        "email": created.email,
        "user_type": created.user_type,
    })))
}

/// GET /api/customers
pub async fn customers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<CustomerSummary>> {
    user.require_admin()?;
    Ok(ApiResponse::success(state.accounts.list_customers().await?))
}
