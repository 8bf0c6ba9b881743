use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{validate_jwt, AuthError, Claims, TokenType};
use crate::error::ApiError;

/// Authenticated user context extracted from the access token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub user_type: String,
    pub is_staff: bool,
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            expires_at: claims.expires_at(),
            email: claims.email,
            user_type: claims.user_type,
            is_staff: claims.is_staff,
            jti: claims.jti,
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.is_staff || self.user_type == "admin"
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Administrator access required"))
        }
    }

    /// Admins may act on anyone; customers only on themselves
    pub fn require_self_or_admin(&self, user_id: i64) -> Result<(), ApiError> {
        if self.is_admin() || self.id == user_id {
            Ok(())
        } else {
            Err(ApiError::forbidden("You do not have access to this resource"))
        }
    }
}

/// JWT authentication middleware that validates access tokens, rejects
/// revoked ones and injects `AuthUser` into the request
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_jwt_from_headers(&headers) {
        Ok(token) => token,
        Err(msg) => return ApiError::unauthorized(msg).into_response(),
    };

    let claims = match validate_jwt(&token, TokenType::Access) {
        Ok(claims) => claims,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.tokens.is_token_revoked(claims.jti).await {
        Ok(false) => {}
        Ok(true) => return ApiError::from(AuthError::Revoked).into_response(),
        Err(e) => return ApiError::from(e).into_response(),
    }

    request.extensions_mut().insert(AuthUser::from(claims));
    next.run(request).await
}

/// Extract JWT token from Authorization header
pub fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
