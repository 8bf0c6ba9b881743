use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::database::models::CustomerFrame;
use crate::observer::reconcile::MappingOutcome;
use crate::observer::traits::ObserverRing;

/// Observer system errors with structured error types
#[derive(Debug, Error, Clone)]
pub enum ObserverError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("System error: {0}")]
    SystemError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Non-fatal issues, chiefly reconciliation ambiguities
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObserverWarning {
    pub observer: String,
    pub ring: u8,
    pub message: String,
}

impl ObserverWarning {
    pub fn new(observer: &str, ring: ObserverRing, message: impl Into<String>) -> Self {
        Self {
            observer: observer.to_string(),
            ring: ring as u8,
            message: message.into(),
        }
    }
}

/// Results from a successful pipeline run
#[derive(Debug, Clone)]
pub struct ObserverResult {
    pub frame: CustomerFrame,
    pub outcomes: Vec<MappingOutcome>,
    pub warnings: Vec<ObserverWarning>,
    pub execution_time: Duration,
    pub rings_executed: Vec<ObserverRing>,
}

impl From<crate::database::manager::DatabaseError> for ObserverError {
    fn from(error: crate::database::manager::DatabaseError) -> Self {
        match error {
            crate::database::manager::DatabaseError::NotFound(msg) => ObserverError::NotFound(msg),
            other => ObserverError::DatabaseError(other.to_string()),
        }
    }
}
