// Ring 5: writes the frame row
use async_trait::async_trait;

use crate::observer::context::{FrameInput, ObserverContext};
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation, SyncObserver};

#[derive(Default)]
pub struct FrameSqlExecutor;

impl Observer for FrameSqlExecutor {
    fn name(&self) -> &'static str {
        "FrameSqlExecutor"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Database
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }
}

#[async_trait]
impl SyncObserver for FrameSqlExecutor {
    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let saved = match &ctx.input {
            FrameInput::Create(new) => ctx.store.insert_frame(new).await?,
            FrameInput::Update { id, .. } => {
                let proposed = ctx
                    .proposed
                    .as_ref()
                    .ok_or_else(|| ObserverError::SystemError(format!("Frame {} was not loaded", id)))?;
                ctx.store.update_frame(proposed).await?
            }
            FrameInput::Resync { .. } => return Ok(()),
        };

        tracing::info!("Saved frame {} for customer {}", saved.id, saved.customer_id);
        ctx.saved = Some(saved);
        Ok(())
    }
}
