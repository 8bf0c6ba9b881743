// Ring 0: loads the stored frame and applies the requested changes
use async_trait::async_trait;

use crate::observer::context::{FrameInput, ObserverContext};
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation, SyncObserver};

#[derive(Default)]
pub struct LoadExistingFrame;

impl Observer for LoadExistingFrame {
    fn name(&self) -> &'static str {
        "LoadExistingFrame"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::DataPreparation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Update | Operation::Resync)
    }
}

#[async_trait]
impl SyncObserver for LoadExistingFrame {
    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let id = ctx
            .input
            .frame_id()
            .ok_or_else(|| ObserverError::ValidationError("Frame id is required".to_string()))?;

        let existing = ctx
            .store
            .find_frame(id)
            .await?
            .ok_or_else(|| ObserverError::NotFound(format!("Frame {} not found", id)))?;

        match &ctx.input {
            FrameInput::Update { changes, .. } => {
                ctx.proposed = Some(changes.apply(&existing));
            }
            FrameInput::Resync { .. } => {
                // Nothing is written on resync; the stored row is the saved state
                ctx.saved = Some(existing.clone());
            }
            FrameInput::Create(_) => {}
        }

        tracing::debug!("Loaded frame {} for {:?}", id, ctx.operation);
        ctx.existing = Some(existing);
        Ok(())
    }
}
