use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;

/// Observer rings with semantic meaning - synchronous (0-6) and asynchronous (7-9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObserverRing {
    DataPreparation = 0, // Load the stored frame, apply requested changes
    InputValidation = 1, // Referenced customer, group and category exist
    Security = 2,
    Business = 3,
    Enrichment = 4,
    Database = 5,     // Persist the frame row
    PostDatabase = 6, // Mapping table reconciliation
    Audit = 7,        // Transition logging (async)
    Integration = 8,
    Notification = 9,
}

impl ObserverRing {
    pub fn is_synchronous(&self) -> bool {
        (*self as u8) <= 6
    }

    pub fn is_asynchronous(&self) -> bool {
        (*self as u8) >= 7
    }

    /// Rings that a given operation walks through, in order
    pub fn for_operation(operation: &Operation) -> Vec<Self> {
        use ObserverRing::*;

        match operation {
            Operation::Create => vec![InputValidation, Security, Business, Enrichment, Database, PostDatabase, Audit],
            Operation::Update => vec![
                DataPreparation, InputValidation, Security, Business, Enrichment, Database, PostDatabase, Audit,
            ],
            // Resync re-runs reconciliation against the stored frame without writing it
            Operation::Resync => vec![DataPreparation, PostDatabase],
        }
    }
}

/// Frame operations that flow through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Update,
    Resync,
}

/// Base trait for all observers with metadata and applicability checks
pub trait Observer: Send + Sync {
    fn name(&self) -> &'static str;

    fn ring(&self) -> ObserverRing;

    fn applies_to_operation(&self, op: Operation) -> bool;

    /// Execution timeout (default 5 seconds)
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Priority within ring (lower numbers execute first)
    fn priority(&self) -> u8 {
        50
    }
}

/// Rings 0-6: may mutate the context and block the pipeline
#[async_trait]
pub trait SyncObserver: Observer {
    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError>;
}

/// Rings 7-9: read-only, run after the response data is settled
#[async_trait]
pub trait AsyncObserver: Observer {
    async fn execute(&self, ctx: &ObserverContext) -> Result<(), ObserverError>;
}

pub enum ObserverBox {
    Sync(Box<dyn SyncObserver>),
    Async(Box<dyn AsyncObserver>),
}

impl ObserverBox {
    pub fn name(&self) -> &'static str {
        match self {
            ObserverBox::Sync(o) => o.name(),
            ObserverBox::Async(o) => o.name(),
        }
    }

    pub fn ring(&self) -> ObserverRing {
        match self {
            ObserverBox::Sync(o) => o.ring(),
            ObserverBox::Async(o) => o.ring(),
        }
    }

    pub fn applies_to_operation(&self, op: Operation) -> bool {
        match self {
            ObserverBox::Sync(o) => o.applies_to_operation(op),
            ObserverBox::Async(o) => o.applies_to_operation(op),
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            ObserverBox::Sync(o) => o.timeout(),
            ObserverBox::Async(o) => o.timeout(),
        }
    }

    pub fn priority(&self) -> u8 {
        match self {
            ObserverBox::Sync(o) => o.priority(),
            ObserverBox::Async(o) => o.priority(),
        }
    }

    pub async fn execute_sync(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        match self {
            ObserverBox::Sync(o) => o.execute(ctx).await,
            ObserverBox::Async(_) => Ok(()), // Async observers don't execute in sync phase
        }
    }

    pub async fn execute_async(&self, ctx: &ObserverContext) -> Result<(), ObserverError> {
        match self {
            ObserverBox::Async(o) => o.execute(ctx).await,
            ObserverBox::Sync(_) => Ok(()), // Sync observers don't execute in async phase
        }
    }
}
