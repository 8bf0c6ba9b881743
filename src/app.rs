use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{self, MappingPolicy};
use crate::database::manager::DatabaseManager;
use crate::database::postgres::PgStore;
use crate::database::store::{AccountStore, MappingStore, TokenStore};
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::services::{AccountService, FrameService, LogMailer, Mailer, MappingViewService};

/// Shared handler state. The mapping engine and token checks go through the
/// store traits; plain catalog CRUD talks to Postgres directly.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MappingStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub frames: FrameService,
    pub mappings: MappingViewService,
    pub accounts: Arc<AccountService>,
    pub db: PgStore,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, tokens: Arc<dyn TokenStore>, mailer: Arc<dyn Mailer>, policy: MappingPolicy) -> Self
    where
        S: AccountStore + 'static,
    {
        let accounts_store: Arc<dyn AccountStore> = store.clone();
        let store: Arc<dyn MappingStore> = store;
        Self {
            frames: FrameService::new(store.clone(), policy),
            mappings: MappingViewService::new(store.clone()),
            accounts: Arc::new(AccountService::new(accounts_store, tokens.clone(), mailer)),
            store,
            tokens,
            db: PgStore::new(),
        }
    }

    /// Postgres-backed state using the configured mapping policy
    pub fn from_config() -> Self {
        let store = Arc::new(PgStore::new());
        Self::new(
            store.clone(),
            store,
            Arc::new(LogMailer),
            config::config().mapping.policy,
        )
    }
}

pub fn app(state: AppState) -> Router {
    let settings = config::config();

    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        .merge(protected_routes().route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware)))
        .layer(DefaultBodyLimit::max(settings.api.max_request_size_bytes))
        .with_state(state);

    let router = match cors_layer() {
        Some(cors) => router.layer(cors),
        None => router,
    };

    if settings.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn cors_layer() -> Option<CorsLayer> {
    let security = &config::config().security;
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
            .allow_headers(Any),
    )
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/verify", post(auth::verify))
        .route("/auth/check-email", get(auth::check_email))
        .route("/auth/send-otp", get(auth::send_otp))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/set-new-password", post(auth::set_new_password))
}

fn protected_routes() -> Router<AppState> {
    use protected::{account, billing, catalog, frames, groups, mappings, users};

    Router::new()
        // Session
        .route("/api/auth/whoami", get(account::whoami))
        .route("/api/auth/logout", post(account::logout))
        .route("/api/dashboard/mobile", get(account::mobile_dashboard))
        // Accounts (admin)
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/customers", get(users::customers))
        // Groups and frames
        .route("/api/groups", get(groups::list).post(groups::create))
        .route(
            "/api/groups/:id",
            get(groups::get).put(groups::update).delete(groups::delete),
        )
        .route("/api/frames", get(frames::list).post(frames::create))
        .route("/api/frames/resync", post(frames::resync_all))
        .route(
            "/api/frames/:id",
            get(frames::get).patch(frames::update).delete(frames::delete),
        )
        .route("/api/frames/:id/resync", post(frames::resync))
        // Mapping tables
        .route("/api/mappings/:kind", get(mappings::list))
        .route("/api/mappings/:kind/:id/downloaded", post(mappings::mark_downloaded))
        // Content catalogs
        .route("/api/events", get(catalog::list_events).post(catalog::create_event))
        .route("/api/categories", get(catalog::list_categories).post(catalog::create_category))
        .route(
            "/api/business-categories",
            get(catalog::list_business_categories).post(catalog::create_business_category),
        )
        .route("/api/posts", get(catalog::list_posts).post(catalog::create_post))
        .route("/api/other-posts", get(catalog::list_other_posts).post(catalog::create_other_post))
        .route(
            "/api/business-posts",
            get(catalog::list_business_posts).post(catalog::create_business_post),
        )
        // Billing
        .route("/api/plans", get(billing::list_plans).post(billing::create_plan))
        .route("/api/plans/:id", axum::routing::delete(billing::delete_plan))
        .route(
            "/api/payment-methods",
            get(billing::list_payment_methods).post(billing::create_payment_method),
        )
        .route("/api/payment-methods/:id", axum::routing::delete(billing::delete_payment_method))
        .route(
            "/api/subscriptions",
            get(billing::list_subscriptions).post(billing::create_subscription),
        )
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Poster Frame API",
            "version": env!("CARGO_PKG_VERSION"),
            "mapping_policy": config::config().mapping.policy,
            "endpoints": {
                "auth": "/auth/* (public - tokens and password recovery)",
                "session": "/api/auth/*, /api/dashboard/mobile (protected)",
                "users": "/api/users, /api/customers (protected, admin)",
                "frames": "/api/groups, /api/frames[/:id][/resync] (protected, admin writes)",
                "mappings": "/api/mappings/:kind[/:id/downloaded] (protected)",
                "catalog": "/api/events, /api/categories, /api/business-categories, /api/posts, /api/other-posts, /api/business-posts (protected, admin writes)",
                "billing": "/api/plans, /api/payment-methods, /api/subscriptions (protected)",
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
