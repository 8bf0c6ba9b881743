use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::database::models::CustomerFrame;
use crate::database::store::{FrameFilter, NewFrame};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::observer::{FrameChanges, MappingOutcome, ObserverResult, ObserverWarning};

#[derive(Debug, Default, Deserialize)]
pub struct FrameQuery {
    pub search: Option<String>,
    pub group_name: Option<String>,
    pub profession_type: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// A frame write as the client sees it: the stored row plus whatever the
/// mapping pipeline did or declined to do
#[derive(Debug, Serialize)]
pub struct FrameResponse {
    pub frame: CustomerFrame,
    pub warnings: Vec<ObserverWarning>,
    pub mappings: Vec<MappingOutcome>,
    pub execution_ms: u128,
}

impl From<ObserverResult> for FrameResponse {
    fn from(result: ObserverResult) -> Self {
        Self {
            frame: result.frame,
            warnings: result.warnings,
            mappings: result.outcomes,
            execution_ms: result.execution_time.as_millis(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResyncFailure {
    pub frame_id: i64,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ResyncSummary {
    pub mappings: Vec<MappingOutcome>,
    pub failures: Vec<ResyncFailure>,
}

/// GET /api/frames?search=&group_name=&profession_type= - admins see every
/// frame, customers only their own
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<FrameQuery>,
) -> ApiResult<Vec<CustomerFrame>> {
    let filter = FrameFilter {
        customer_id: if user.is_admin() { None } else { Some(user.id) },
        search: non_blank(query.search),
        group_name: non_blank(query.group_name),
        profession_type: non_blank(query.profession_type),
    };
    Ok(ApiResponse::success(state.frames.list(&filter).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<CustomerFrame> {
    let frame = state.frames.get(id).await?;
    user.require_self_or_admin(frame.customer_id)?;
    Ok(ApiResponse::success(frame))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(frame): Json<NewFrame>,
) -> ApiResult<FrameResponse> {
    user.require_admin()?;
    let result = state.frames.create(frame).await?;
    Ok(ApiResponse::created(result.into()))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(changes): Json<FrameChanges>,
) -> ApiResult<FrameResponse> {
    user.require_admin()?;
    let result = state.frames.update(id, changes).await?;
    Ok(ApiResponse::success(result.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    user.require_admin()?;
    state.frames.delete(id).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// POST /api/frames/:id/resync
pub async fn resync(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<FrameResponse> {
    user.require_admin()?;
    let result = state.frames.resync(id).await?;
    Ok(ApiResponse::success(result.into()))
}

/// POST /api/frames/resync - every frame; one failing frame does not stop the rest
pub async fn resync_all(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<ResyncSummary> {
    user.require_admin()?;
    let (mappings, failures) = state.frames.resync_all().await?;
    Ok(ApiResponse::success(ResyncSummary {
        mappings,
        failures: failures
            .into_iter()
            .map(|(frame_id, e)| ResyncFailure {
                frame_id,
                error: e.to_string(),
            })
            .collect(),
    }))
}
