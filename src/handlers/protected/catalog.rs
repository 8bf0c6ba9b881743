use axum::{extract::State, Extension, Json};
use chrono::NaiveDate;

use crate::app::AppState;
use crate::config;
use crate::database::catalog::{
    NewBusinessCategory, NewBusinessPost, NewCategory, NewEvent, NewOtherPost, NewPost,
};
use crate::database::models::{BusinessCategory, BusinessPost, Category, CustomerFrame, Event, OtherPost, Post};
use crate::database::store::FrameFilter;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::catalog_views::{
    business_post_listings, nest_categories, post_listings, BusinessPostListing, CategoryNode, PostListing,
};
use crate::services::media::media_url;

/// Events are scheduled ahead; a date before today is rejected
pub fn validate_event_date(event_date: NaiveDate, today: NaiveDate) -> Result<(), ApiError> {
    if event_date < today {
        return Err(ApiError::validation_error("Event date cannot be in the past", None));
    }
    Ok(())
}

fn require_name(name: &str, what: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation_error(format!("{} name is required", what), None));
    }
    Ok(())
}

pub async fn list_events(State(state): State<AppState>) -> ApiResult<Vec<Event>> {
    Ok(ApiResponse::success(state.db.list_events().await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(event): Json<NewEvent>,
) -> ApiResult<Event> {
    user.require_admin()?;
    require_name(&event.name, "Event")?;
    validate_event_date(event.event_date, config::today())?;
    Ok(ApiResponse::created(state.db.insert_event(&event).await?))
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<CategoryNode>> {
    let categories = state.db.list_categories().await?;
    Ok(ApiResponse::success(nest_categories(categories, media_url)))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(category): Json<NewCategory>,
) -> ApiResult<Category> {
    user.require_admin()?;
    require_name(&category.name, "Category")?;
    Ok(ApiResponse::created(state.db.insert_category(&category).await?))
}

pub async fn list_business_categories(State(state): State<AppState>) -> ApiResult<Vec<BusinessCategory>> {
    Ok(ApiResponse::success(state.db.list_business_categories().await?))
}

pub async fn create_business_category(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(category): Json<NewBusinessCategory>,
) -> ApiResult<BusinessCategory> {
    user.require_admin()?;
    require_name(&category.name, "Business category")?;
    Ok(ApiResponse::created(state.db.insert_business_category(&category).await?))
}

// New posts reach existing frames through `POST /api/frames/resync`
// (or `posterctl resync`), not on insert.

async fn viewer_frames(state: &AppState, user: &AuthUser) -> Result<Vec<CustomerFrame>, ApiError> {
    let filter = FrameFilter {
        customer_id: Some(user.id),
        ..Default::default()
    };
    Ok(state.store.list_frames(&filter).await?)
}

pub async fn list_posts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<PostListing>> {
    let rows = state.db.list_posts().await?;
    let frames = viewer_frames(&state, &user).await?;
    Ok(ApiResponse::success(post_listings(rows, &frames, media_url)))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(post): Json<NewPost>,
) -> ApiResult<Post> {
    user.require_admin()?;
    Ok(ApiResponse::created(state.db.insert_post(&post).await?))
}

pub async fn list_other_posts(State(state): State<AppState>) -> ApiResult<Vec<OtherPost>> {
    Ok(ApiResponse::success(state.db.list_other_posts().await?))
}

pub async fn create_other_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(post): Json<NewOtherPost>,
) -> ApiResult<OtherPost> {
    user.require_admin()?;
    Ok(ApiResponse::created(state.db.insert_other_post(&post).await?))
}

pub async fn list_business_posts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<BusinessPostListing>> {
    let rows = state.db.list_business_posts().await?;
    let frames = viewer_frames(&state, &user).await?;
    Ok(ApiResponse::success(business_post_listings(rows, &frames, media_url)))
}

pub async fn create_business_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(post): Json<NewBusinessPost>,
) -> ApiResult<BusinessPost> {
    user.require_admin()?;
    Ok(ApiResponse::created(state.db.insert_business_post(&post).await?))
}
