use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use std::time::Instant;

use crate::config::MappingPolicy;
use crate::database::models::CustomerFrame;
use crate::database::store::{MappingStore, NewFrame};
use crate::observer::error::{ObserverError, ObserverWarning};
use crate::observer::reconcile::MappingOutcome;
use crate::observer::traits::{ObserverRing, Operation};

/// Partial update of a frame. Nullable columns use a double option so that
/// an explicit `null` clears the value while an absent key leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FrameChanges {
    #[serde(default, deserialize_with = "nullable")]
    pub group_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub business_category_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub profession_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub frame_img: Option<Option<String>>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl FrameChanges {
    pub fn apply(&self, frame: &CustomerFrame) -> CustomerFrame {
        let mut next = frame.clone();
        if let Some(v) = self.group_id {
            next.group_id = v;
        }
        if let Some(v) = self.business_category_id {
            next.business_category_id = v;
        }
        if let Some(v) = &self.profession_type {
            next.profession_type = v.clone();
        }
        if let Some(v) = &self.display_name {
            next.display_name = v.clone();
        }
        if let Some(v) = &self.frame_img {
            next.frame_img = v.clone();
        }
        next
    }
}

/// What the caller asked the pipeline to do
#[derive(Debug, Clone)]
pub enum FrameInput {
    Create(NewFrame),
    Update { id: i64, changes: FrameChanges },
    Resync { id: i64 },
}

impl FrameInput {
    pub fn operation(&self) -> Operation {
        match self {
            FrameInput::Create(_) => Operation::Create,
            FrameInput::Update { .. } => Operation::Update,
            FrameInput::Resync { .. } => Operation::Resync,
        }
    }

    pub fn frame_id(&self) -> Option<i64> {
        match self {
            FrameInput::Create(_) => None,
            FrameInput::Update { id, .. } | FrameInput::Resync { id } => Some(*id),
        }
    }
}

/// Context flowing through the frame observer pipeline
pub struct ObserverContext {
    pub operation: Operation,
    pub input: FrameInput,
    pub store: Arc<dyn MappingStore>,
    pub policy: MappingPolicy,
    /// Business date used to decide which events are still upcoming
    pub today: NaiveDate,

    /// Stored frame before this operation (Ring 0)
    pub existing: Option<CustomerFrame>,
    /// Stored frame with the requested changes applied (Ring 0, updates only)
    pub proposed: Option<CustomerFrame>,
    /// Frame as persisted (Ring 5, or the stored frame on resync)
    pub saved: Option<CustomerFrame>,

    pub outcomes: Vec<MappingOutcome>,

    pub start_time: Instant,
    pub current_ring: Option<ObserverRing>,
    pub errors: Vec<ObserverError>,
    pub warnings: Vec<ObserverWarning>,
}

impl ObserverContext {
    pub fn new(input: FrameInput, store: Arc<dyn MappingStore>, policy: MappingPolicy, today: NaiveDate) -> Self {
        Self {
            operation: input.operation(),
            input,
            store,
            policy,
            today,
            existing: None,
            proposed: None,
            saved: None,
            outcomes: Vec::new(),
            start_time: Instant::now(),
            current_ring: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Log and record a non-fatal issue
    pub fn warn(&mut self, observer: &str, message: impl Into<String>) {
        let ring = self.current_ring.unwrap_or(ObserverRing::PostDatabase);
        let warning = ObserverWarning::new(observer, ring, message);
        tracing::warn!("{}: {}", observer, warning.message);
        self.warnings.push(warning);
    }

    pub fn record_outcome(&mut self, outcome: MappingOutcome) {
        if let Some(frame) = &self.saved {
            outcome.log(frame.customer_id, frame.id);
        }
        self.outcomes.push(outcome);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// (customer, group, category) the operation is about to store
    pub fn candidate_refs(&self) -> Option<(i64, Option<i64>, Option<i64>)> {
        match &self.input {
            FrameInput::Create(new) => Some((new.customer_id, new.group_id, new.business_category_id)),
            _ => self
                .proposed
                .as_ref()
                .map(|f| (f.customer_id, f.group_id, f.business_category_id)),
        }
    }

    /// Frame after Ring 5, or an error when called too early
    pub fn saved_frame(&self) -> Result<&CustomerFrame, ObserverError> {
        self.saved
            .as_ref()
            .ok_or_else(|| ObserverError::SystemError("frame has not been persisted yet".to_string()))
    }

    pub fn group_changed(&self) -> bool {
        match (&self.existing, &self.saved) {
            (Some(old), Some(new)) => old.group_id != new.group_id,
            _ => self.operation == Operation::Create,
        }
    }

    pub fn category_changed(&self) -> bool {
        match (&self.existing, &self.saved) {
            (Some(old), Some(new)) => old.business_category_id != new.business_category_id,
            _ => self.operation == Operation::Create,
        }
    }
}
