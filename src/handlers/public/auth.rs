use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::account_service::{LoginResponse, RegisterRequest};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: i32,
}

#[derive(Debug, Deserialize)]
pub struct NewPasswordRequest {
    pub email: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// POST /auth/register
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> ApiResult<Value> {
    let user = state.accounts.register(request).await?;
    Ok(ApiResponse::created(json!({
        "id": user.id,
        "email": user.email,
        "user_type": user.user_type,
    })))
}

/// POST /auth/login
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::validation_error("Email and password are required", None));
    }
    let response = state.accounts.login(request.email.trim(), &request.password).await?;
    tracing::info!("User {} logged in", response.id);
    Ok(ApiResponse::success(response))
}

/// POST /auth/refresh
pub async fn refresh(State(state): State<AppState>, Json(request): Json<RefreshRequest>) -> ApiResult<Value> {
    let access = state.accounts.refresh(&request.refresh).await?;
    Ok(ApiResponse::success(json!({ "access": access })))
}

/// POST /auth/verify
pub async fn verify(State(state): State<AppState>, Json(request): Json<VerifyRequest>) -> ApiResult<Value> {
    state.accounts.verify(&request.token).await?;
    Ok(ApiResponse::success(json!({ "valid": true })))
}

/// GET /auth/check-email?email=
pub async fn check_email(State(state): State<AppState>, Query(query): Query<EmailQuery>) -> ApiResult<Value> {
    state.accounts.check_email(query.email.trim()).await?;
    Ok(ApiResponse::success(json!({ "message": "Email exists" })))
}

/// GET /auth/send-otp?email=
pub async fn send_otp(State(state): State<AppState>, Query(query): Query<EmailQuery>) -> ApiResult<Value> {
    state.accounts.send_otp(query.email.trim()).await?;
    Ok(ApiResponse::success(json!({ "message": "OTP sent successfully" })))
}

/// POST /auth/verify-otp
pub async fn verify_otp(State(state): State<AppState>, Json(request): Json<VerifyOtpRequest>) -> ApiResult<Value> {
    state.accounts.verify_otp(request.email.trim(), request.otp).await?;
    Ok(ApiResponse::success(json!({ "message": "Email verified successfully" })))
}

/// POST /auth/set-new-password
pub async fn set_new_password(
    State(state): State<AppState>,
    Json(request): Json<NewPasswordRequest>,
) -> ApiResult<Value> {
    state
        .accounts
        .set_new_password(request.email.trim(), &request.new_password, &request.confirm_password)
        .await?;
    Ok(ApiResponse::success(json!({ "message": "Password updated successfully" })))
}
