use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::database::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub user_type: String,
    pub is_staff: bool,
    pub token_type: TokenType,
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: &User, token_type: TokenType) -> Self {
        let now = Utc::now();
        let security = &config::config().security;
        let hours = match token_type {
            TokenType::Access => security.access_token_hours,
            TokenType::Refresh => security.refresh_token_hours,
        };

        Self {
            sub: user.id,
            email: user.email.clone(),
            user_type: user.user_type.clone(),
            is_staff: user.is_staff,
            token_type,
            jti: Uuid::new_v4(),
            exp: (now + Duration::hours(hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has been revoked")]
    Revoked,

    #[error("Expected a {0:?} token")]
    WrongTokenType(TokenType),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

fn secret() -> Result<&'static str, AuthError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }
    Ok(secret.as_str())
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    let encoding_key = EncodingKey::from_secret(secret()?.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Decode a token and check it is of the expected kind. Revocation is
/// checked by the caller against the token store.
pub fn validate_jwt(token: &str, expected: TokenType) -> Result<Claims, AuthError> {
    let decoding_key = DecodingKey::from_secret(secret()?.as_bytes());
    let data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    if data.claims.token_type != expected {
        return Err(AuthError::WrongTokenType(expected));
    }
    Ok(data.claims)
}

pub fn issue_tokens(user: &User) -> Result<TokenPair, AuthError> {
    Ok(TokenPair {
        refresh: generate_jwt(&Claims::new(user, TokenType::Refresh))?,
        access: generate_jwt(&Claims::new(user, TokenType::Access))?,
    })
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, config::config().security.bcrypt_cost).map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
