use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::database::models::{ContentMapping, MappingKind};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Default, Deserialize)]
pub struct MappingQuery {
    /// Admins may look at another customer's mappings
    pub customer_id: Option<i64>,
}

fn kind_from_path(segment: &str) -> Result<MappingKind, ApiError> {
    MappingKind::from_path(segment).ok_or_else(|| {
        ApiError::not_found(format!(
            "Unknown mapping table '{}'; expected posts, other-posts or business-posts",
            segment
        ))
    })
}

/// GET /api/mappings/:kind
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(kind): Path<String>,
    Query(query): Query<MappingQuery>,
) -> ApiResult<Vec<Value>> {
    let kind = kind_from_path(&kind)?;
    let customer_id = query.customer_id.unwrap_or(user.id);
    user.require_self_or_admin(customer_id)?;
    Ok(ApiResponse::success(state.mappings.list(kind, customer_id).await?))
}

/// POST /api/mappings/:kind/:id/downloaded
pub async fn mark_downloaded(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((kind, id)): Path<(String, i64)>,
) -> ApiResult<ContentMapping> {
    let kind = kind_from_path(&kind)?;
    Ok(ApiResponse::success(state.mappings.mark_downloaded(kind, id, user.id).await?))
}
