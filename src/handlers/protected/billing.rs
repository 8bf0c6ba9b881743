use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::config;
use crate::database::catalog::{NewPlan, NewSubscription, SubscriptionFilter};
use crate::database::models::{PaymentMethod, Plan, Subscription};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::billing;

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
    #[serde(default)]
    pub days_until_expiry: bool,
    #[serde(default)]
    pub expired: bool,
    #[serde(default)]
    pub active: bool,
}

impl From<SubscriptionQuery> for SubscriptionFilter {
    fn from(query: SubscriptionQuery) -> Self {
        SubscriptionFilter {
            user_id: None,
            expiring_soon: query.days_until_expiry,
            expired: query.expired,
            active: query.active,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentMethodRequest {
    pub name: String,
}

pub async fn list_plans(State(state): State<AppState>) -> ApiResult<Vec<Plan>> {
    Ok(ApiResponse::success(state.db.list_plans().await?))
}

pub async fn create_plan(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(plan): Json<NewPlan>,
) -> ApiResult<Plan> {
    user.require_admin()?;
    if plan.duration_in_months <= 0 || plan.price < 0 {
        return Err(ApiError::validation_error("Plan duration must be positive and price not negative", None));
    }
    Ok(ApiResponse::created(state.db.insert_plan(&plan).await?))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    user.require_admin()?;
    if !state.db.delete_plan(id).await? {
        return Err(ApiError::not_found(format!("Plan {} not found", id)));
    }
    Ok(ApiResponse::<()>::no_content())
}

pub async fn list_payment_methods(State(state): State<AppState>) -> ApiResult<Vec<PaymentMethod>> {
    Ok(ApiResponse::success(state.db.list_payment_methods().await?))
}

pub async fn create_payment_method(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<PaymentMethodRequest>,
) -> ApiResult<PaymentMethod> {
    user.require_admin()?;
    if request.name.trim().is_empty() {
        return Err(ApiError::validation_error("Payment method name is required", None));
    }
    Ok(ApiResponse::created(state.db.insert_payment_method(request.name.trim()).await?))
}

pub async fn delete_payment_method(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    user.require_admin()?;
    if !state.db.delete_payment_method(id).await? {
        return Err(ApiError::not_found(format!("Payment method {} not found", id)));
    }
    Ok(ApiResponse::<()>::no_content())
}

/// GET /api/subscriptions?days_until_expiry=true&expired=true&active=true
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SubscriptionQuery>,
) -> ApiResult<Vec<Subscription>> {
    let filter = billing::scope_filter(query.into(), user.id, user.is_admin());
    Ok(ApiResponse::success(
        state.db.list_subscriptions(&filter, config::today()).await?,
    ))
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<NewSubscription>,
) -> ApiResult<Subscription> {
    user.require_admin()?;
    Ok(ApiResponse::created(billing::create_subscription(&state.db, &request).await?))
}
