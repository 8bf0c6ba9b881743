use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::CustomerGroup;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Deserialize)]
pub struct GroupRequest {
    pub name: String,
}

impl GroupRequest {
    fn name(&self) -> Result<&str, ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::validation_error("Group name is required", None));
        }
        Ok(name)
    }
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<CustomerGroup>> {
    Ok(ApiResponse::success(state.db.list_groups().await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<CustomerGroup> {
    let group = state
        .store
        .find_group(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Group {} not found", id)))?;
    Ok(ApiResponse::success(group))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<GroupRequest>,
) -> ApiResult<CustomerGroup> {
    user.require_admin()?;
    let group = state.db.insert_group(request.name()?).await?;
    tracing::info!("Created group {} '{}'", group.id, group.name);
    Ok(ApiResponse::created(group))
}

/// Renaming a group changes `is_a_group` answers but not any mapping rows
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(request): Json<GroupRequest>,
) -> ApiResult<CustomerGroup> {
    user.require_admin()?;
    Ok(ApiResponse::success(state.db.rename_group(id, request.name()?).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    user.require_admin()?;
    if !state.db.delete_group(id).await? {
        return Err(ApiError::not_found(format!("Group {} not found", id)));
    }
    Ok(ApiResponse::<()>::no_content())
}
