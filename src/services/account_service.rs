use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{self, AuthError, TokenType};
use crate::config;
use crate::database::accounts::{FrameSummaryRow, NewUser, UserFilter};
use crate::database::manager::DatabaseError;
use crate::database::models::{frame::is_a_group_name, CodeType, Subscription, User, UserType};
use crate::database::store::{AccountStore, TokenStore};
use crate::services::media::media_url;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid Email and Password")]
    InvalidCredentials,

    #[error("This account has been deleted. Please contact support for assistance.")]
    AccountDeleted,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Code has not been verified")]
    CodeNotVerified,

    #[error("Admin accounts can only be created by an administrator")]
    AdminRegistration,

    #[error("Invalid Code")]
    InvalidCode,

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Outgoing mail seam
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Writes mail to the log instead of delivering it
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(
            from = %config::config().mail.from_address,
            to,
            subject,
            "Outgoing mail: {}",
            body
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub user_type: String,
    pub whatsapp_number: String,
    pub address: Option<String>,
    pub pincode: Option<i32>,
    pub city: Option<String>,
    pub dob: Option<NaiveDate>,
    pub business_category_id: Option<i64>,
    pub no_of_post: Option<i32>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategorySummary {
    pub id: i64,
    pub business_sub_category_name: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProfessionTypeSummary {
    pub name: Option<String>,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub refresh: String,
    pub access: String,
    pub id: i64,
    pub is_verify: bool,
    pub mobile_number: String,
    pub is_customer: bool,
    pub is_a_group: bool,
    pub is_expired: bool,
    pub days_left: i64,
    pub profession_types: Vec<ProfessionTypeSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignedCategory {
    pub id: i64,
    pub name: String,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MobileDashboard {
    pub id: i64,
    pub is_verify: bool,
    pub is_expired: bool,
    pub days_left: Option<i64>,
    pub assigned_business_categories: Vec<AssignedCategory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionStatus {
    pub is_expired: bool,
    /// Days until the latest subscription ends; `None` when there is no live one
    pub days_left: Option<i64>,
}

/// Status from the subscription ending last. No subscription counts as expired.
pub fn subscription_status(subscriptions: &[Subscription], today: NaiveDate) -> SubscriptionStatus {
    match subscriptions.iter().max_by_key(|s| s.end_date) {
        Some(latest) if latest.end_date >= today => SubscriptionStatus {
            is_expired: false,
            days_left: Some((latest.end_date - today).num_days()),
        },
        _ => SubscriptionStatus {
            is_expired: true,
            days_left: None,
        },
    }
}

/// Group frames with a business category by the frame's profession type,
/// keeping the order in which each first appears. Frames without one share
/// the `None` group.
pub fn profession_types(rows: &[FrameSummaryRow], thumbnail_url: impl Fn(Option<&str>) -> Option<String>) -> Vec<ProfessionTypeSummary> {
    let mut grouped: Vec<ProfessionTypeSummary> = Vec::new();

    for row in rows {
        let (Some(category_id), Some(category_name)) = (row.category_id, row.category_name.as_ref()) else {
            continue;
        };
        let name = row.profession_type.clone();
        let category = CategorySummary {
            id: category_id,
            business_sub_category_name: category_name.clone(),
            file: thumbnail_url(row.category_thumbnail.as_deref()),
        };

        match grouped.iter_mut().find(|g| g.name == name) {
            Some(group) => group.categories.push(category),
            None => grouped.push(ProfessionTypeSummary {
                name,
                categories: vec![category],
            }),
        }
    }

    grouped
}

/// Compact user row for pickers
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CustomerSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub whatsapp_number: String,
}

impl From<&User> for CustomerSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.display_name(),
            email: user.email.clone(),
            whatsapp_number: user.whatsapp_number.clone(),
        }
    }
}

pub struct AccountService {
    db: Arc<dyn AccountStore>,
    tokens: Arc<dyn TokenStore>,
    mailer: Arc<dyn Mailer>,
}

impl AccountService {
    pub fn new(db: Arc<dyn AccountStore>, tokens: Arc<dyn TokenStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, tokens, mailer }
    }

    /// Self-service sign-up; only customer accounts
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AccountError> {
        if UserType::parse(&request.user_type) == Some(UserType::Admin) {
            tracing::warn!("Rejected public admin registration for {}", request.email);
            return Err(AccountError::AdminRegistration);
        }
        self.create_user(request).await
    }

    /// Any user type; callers are administrators or the operator CLI
    pub async fn create_user(&self, request: RegisterRequest) -> Result<User, AccountError> {
        let user_type = UserType::parse(&request.user_type)
            .ok_or_else(|| AccountError::Invalid("Invalid user type. Must be 'customer' or 'admin'.".to_string()))?;
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(AccountError::Invalid("Email and password are required".to_string()));
        }

        let new_user = NewUser {
            email: request.email.trim().to_string(),
            password_hash: auth::hash_password(&request.password)?,
            first_name: request.first_name,
            last_name: request.last_name,
            user_type: user_type.as_str().to_string(),
            whatsapp_number: request.whatsapp_number,
            address: request.address,
            pincode: request.pincode,
            city: request.city,
            dob: request.dob,
            business_category_id: request.business_category_id,
            no_of_post: request.no_of_post,
            is_staff: user_type == UserType::Admin,
        };

        let user = self.db.insert_user(&new_user).await?;
        tracing::info!("Registered {} {}", user.user_type, user.id);
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AccountError> {
        let user = self
            .db
            .find_user_by_email(email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;
        if user.is_deleted {
            return Err(AccountError::AccountDeleted);
        }
        if !auth::verify_password(password, &user.password_hash) {
            return Err(AccountError::InvalidCredentials);
        }

        let pair = auth::issue_tokens(&user)?;
        let status = subscription_status(&self.db.subscriptions_for_user(user.id).await?, config::today());
        let frames = self.db.frame_summaries(user.id).await?;

        Ok(LoginResponse {
            refresh: pair.refresh,
            access: pair.access,
            id: user.id,
            is_verify: user.is_verify,
            mobile_number: user.whatsapp_number.clone(),
            is_customer: user.is_customer(),
            is_a_group: frames
                .first()
                .and_then(|f| f.group_name.as_deref())
                .map(is_a_group_name)
                .unwrap_or(false),
            is_expired: status.is_expired,
            days_left: status.days_left.unwrap_or(0),
            profession_types: profession_types(&frames, media_url),
        })
    }

    /// New access token from a live refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AccountError> {
        let claims = auth::validate_jwt(refresh_token, TokenType::Refresh)?;
        if self.tokens.is_token_revoked(claims.jti).await? {
            return Err(AuthError::Revoked.into());
        }
        let user = self
            .db
            .find_user(claims.sub)
            .await?
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| AuthError::InvalidToken("account no longer active".to_string()))?;

        Ok(auth::generate_jwt(&auth::Claims::new(&user, TokenType::Access))?)
    }

    /// Accepts either token kind as long as it is valid and not revoked
    pub async fn verify(&self, token: &str) -> Result<(), AccountError> {
        let claims = auth::validate_jwt(token, TokenType::Access).or_else(|_| auth::validate_jwt(token, TokenType::Refresh))?;
        if self.tokens.is_token_revoked(claims.jti).await? {
            return Err(AuthError::Revoked.into());
        }
        Ok(())
    }

    pub async fn check_email(&self, email: &str) -> Result<(), AccountError> {
        match self.db.find_user_by_email(email).await? {
            Some(_) => Ok(()),
            None => Err(AccountError::Invalid("Email does not exist".to_string())),
        }
    }

    /// Reuse the pending code or create one, then mail it. Delivery failures
    /// are logged and do not fail the request.
    pub async fn send_otp(&self, email: &str) -> Result<(), AccountError> {
        let user = self.user_by_email(email).await?;
        let code = match self.db.latest_code(user.id, CodeType::ForgottenPassword).await? {
            Some(code) if code.verified_at.is_none() => code,
            _ => {
                let value = rand::thread_rng().gen_range(100_000..=999_999);
                self.db.insert_code(user.id, CodeType::ForgottenPassword, value).await?
            }
        };

        let body = format!("Your email verification OTP is: {}", code.code);
        if let Err(e) = self.mailer.send(&user.email, "OTP for Email Verification", &body).await {
            tracing::error!("Failed to send OTP mail to user {}: {}", user.id, e);
        }
        Ok(())
    }

    pub async fn verify_otp(&self, email: &str, code: i32) -> Result<(), AccountError> {
        let user = self.user_by_email(email).await?;
        let stored = self
            .db
            .latest_code(user.id, CodeType::ForgottenPassword)
            .await?
            .ok_or(AccountError::InvalidCode)?;
        if stored.code != code {
            return Err(AccountError::InvalidCode);
        }

        self.db.mark_code_verified(stored.id).await?;
        self.db.mark_email_verified(user.id).await?;
        Ok(())
    }

    pub async fn set_new_password(&self, email: &str, new_password: &str, confirm_password: &str) -> Result<(), AccountError> {
        if new_password != confirm_password {
            return Err(AccountError::PasswordMismatch);
        }
        if new_password.is_empty() {
            return Err(AccountError::Invalid("Password must not be empty".to_string()));
        }

        let user = self.user_by_email(email).await?;
        let code = self
            .db
            .latest_code(user.id, CodeType::ForgottenPassword)
            .await?
            .filter(|c| c.verified_at.is_some())
            .ok_or(AccountError::CodeNotVerified)?;

        self.db.set_password_hash(user.id, &auth::hash_password(new_password)?).await?;
        self.db.delete_code(code.id).await?;
        tracing::info!("Password reset for user {}", user.id);
        Ok(())
    }

    /// Revoke the presented access token and, when given, a refresh token
    pub async fn logout(
        &self,
        user_id: i64,
        access_jti: Uuid,
        access_expires_at: DateTime<Utc>,
        refresh_token: Option<&str>,
    ) -> Result<(), AccountError> {
        self.tokens.revoke_token(access_jti, user_id, access_expires_at).await?;

        if let Some(token) = refresh_token {
            let refresh = auth::validate_jwt(token, TokenType::Refresh)?;
            if refresh.sub != user_id {
                return Err(AccountError::Invalid("Refresh token belongs to another user".to_string()));
            }
            self.tokens.revoke_token(refresh.jti, refresh.sub, refresh.expires_at()).await?;
        }
        Ok(())
    }

    pub async fn mobile_dashboard(&self, user_id: i64) -> Result<MobileDashboard, AccountError> {
        let user = self
            .db
            .find_user(user_id)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("User {} not found", user_id)))?;
        let status = subscription_status(&self.db.subscriptions_for_user(user.id).await?, config::today());

        let assigned_business_categories = self
            .db
            .frame_summaries(user.id)
            .await?
            .into_iter()
            .filter_map(|row| {
                Some(AssignedCategory {
                    id: row.category_id?,
                    name: row.category_name?,
                    thumbnail: media_url(row.category_thumbnail.as_deref()),
                })
            })
            .collect();

        Ok(MobileDashboard {
            id: user.id,
            is_verify: user.is_verify,
            is_expired: status.is_expired,
            days_left: status.days_left,
            assigned_business_categories,
        })
    }

    pub async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, AccountError> {
        Ok(self.db.list_users(filter).await?)
    }

    /// Live customer accounts, newest first
    pub async fn list_customers(&self) -> Result<Vec<CustomerSummary>, AccountError> {
        let users = self.db.list_users(&UserFilter::default()).await?;
        Ok(users
            .iter()
            .filter(|u| u.user_type == UserType::Customer.as_str() && !u.is_deleted)
            .map(CustomerSummary::from)
            .collect())
    }

    async fn user_by_email(&self, email: &str) -> Result<User, AccountError> {
        self.db
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AccountError::Invalid("User not found with this email".to_string()))
    }
}
