use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub mapping: MappingConfig,
    pub media: MediaConfig,
    pub mail: MailConfig,
    pub time: TimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub access_token_hours: u64,
    pub refresh_token_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub bcrypt_cost: u32,
}

/// How frame saves are reconciled against the content catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingPolicy {
    /// Behaviour of the most recent signal handlers, ambiguities logged.
    Latest,
    /// Full reconciliation of all three mapping tables on every change.
    Reconcile,
}

impl MappingPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "latest" | "legacy" => Some(MappingPolicy::Latest),
            "reconcile" | "strict" => Some(MappingPolicy::Reconcile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    pub policy: MappingPolicy,
    /// Reproduce the always-true `is_a_group` flag of the mapping views.
    pub legacy_is_a_group: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub from_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// Offset applied to UTC when deciding what "today" is (Asia/Kolkata by default).
    pub utc_offset_minutes: i32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Some(port) = env::var("POSTER_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ACCESS_TOKEN_HOURS") {
            self.security.access_token_hours = v.parse().unwrap_or(self.security.access_token_hours);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_TOKEN_HOURS") {
            self.security.refresh_token_hours = v.parse().unwrap_or(self.security.refresh_token_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }

        // Mapping overrides
        if let Ok(v) = env::var("MAPPING_POLICY") {
            match MappingPolicy::parse(&v) {
                Some(policy) => self.mapping.policy = policy,
                None => tracing::warn!("Ignoring unknown MAPPING_POLICY value '{}'", v),
            }
        }
        if let Ok(v) = env::var("MAPPING_LEGACY_IS_A_GROUP") {
            self.mapping.legacy_is_a_group = v.parse().unwrap_or(self.mapping.legacy_is_a_group);
        }

        if let Ok(v) = env::var("MEDIA_BASE_URL") {
            self.media.base_url = v;
        }
        if let Ok(v) = env::var("MAIL_FROM_ADDRESS") {
            self.mail.from_address = v;
        }
        if let Ok(v) = env::var("TIME_UTC_OFFSET_MINUTES") {
            self.time.utc_offset_minutes = v.parse().unwrap_or(self.time.utc_offset_minutes);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: false,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                jwt_secret: "development-secret-change-me".to_string(),
                access_token_hours: 24 * 15,
                refresh_token_hours: 24 * 15,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                bcrypt_cost: 4,
            },
            mapping: MappingConfig {
                policy: MappingPolicy::Latest,
                legacy_is_a_group: true,
            },
            media: MediaConfig {
                base_url: "http://localhost:3000/media/".to_string(),
            },
            mail: MailConfig {
                from_address: "no-reply@localhost".to_string(),
            },
            time: TimeConfig { utc_offset_minutes: 330 },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_token_hours: 24 * 15,
                refresh_token_hours: 24 * 15,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                bcrypt_cost: bcrypt::DEFAULT_COST,
            },
            mapping: MappingConfig {
                policy: MappingPolicy::Latest,
                legacy_is_a_group: true,
            },
            media: MediaConfig {
                base_url: "https://staging.example.com/media/".to_string(),
            },
            mail: MailConfig {
                from_address: "no-reply@staging.example.com".to_string(),
            },
            time: TimeConfig { utc_offset_minutes: 330 },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_token_hours: 24 * 15,
                refresh_token_hours: 24 * 15,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                bcrypt_cost: bcrypt::DEFAULT_COST,
            },
            mapping: MappingConfig {
                policy: MappingPolicy::Latest,
                legacy_is_a_group: true,
            },
            media: MediaConfig {
                base_url: "https://app.example.com/media/".to_string(),
            },
            mail: MailConfig {
                from_address: "no-reply@example.com".to_string(),
            },
            time: TimeConfig { utc_offset_minutes: 330 },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

/// Current calendar date in the configured business timezone.
pub fn today() -> chrono::NaiveDate {
    let offset = chrono::Duration::minutes(config().time.utc_offset_minutes as i64);
    (chrono::Utc::now() + offset).date_naive()
}

/// UTC instant at which `day` begins in the business timezone.
pub fn business_day_start(day: chrono::NaiveDate) -> chrono::DateTime<chrono::Utc> {
    use chrono::TimeZone;
    let offset = chrono::Duration::minutes(config().time.utc_offset_minutes as i64);
    chrono::Utc.from_utc_datetime(&(day.and_time(chrono::NaiveTime::MIN) - offset))
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
