use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::account_service::MobileDashboard;

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh: Option<String>,
}

/// POST /api/auth/logout - revoke the presented access token and an optional refresh token
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Option<Json<LogoutRequest>>,
) -> ApiResult<Value> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    state
        .accounts
        .logout(user.id, user.jti, user.expires_at, request.refresh.as_deref())
        .await?;
    tracing::info!("User {} logged out", user.id);
    Ok(ApiResponse::success(json!({ "message": "Logged out" })))
}

/// GET /api/auth/whoami
pub async fn whoami(Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "id": user.id,
        "email": user.email,
        "user_type": user.user_type,
        "is_staff": user.is_staff,
        "expires_at": user.expires_at,
    })))
}

/// GET /api/dashboard/mobile
pub async fn mobile_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<MobileDashboard> {
    Ok(ApiResponse::success(state.accounts.mobile_dashboard(user.id).await?))
}
