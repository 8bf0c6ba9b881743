// Ring 7: logs group and business category transitions
use async_trait::async_trait;

use crate::database::models::CustomerFrame;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{AsyncObserver, Observer, ObserverRing, Operation};

#[derive(Default)]
pub struct FrameAuditObserver;

impl Observer for FrameAuditObserver {
    fn name(&self) -> &'static str {
        "FrameAuditObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Audit
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }
}

#[async_trait]
impl AsyncObserver for FrameAuditObserver {
    async fn execute(&self, ctx: &ObserverContext) -> Result<(), ObserverError> {
        let frame = ctx.saved_frame()?;
        for line in transitions(ctx.existing.as_ref(), frame) {
            tracing::info!(frame_id = frame.id, customer_id = frame.customer_id, "{}", line);
        }
        Ok(())
    }
}

fn transitions(old: Option<&CustomerFrame>, new: &CustomerFrame) -> Vec<String> {
    let mut lines = Vec::new();
    match old {
        Some(old) => {
            if old.group_id != new.group_id {
                lines.push(format!("Group changed from {:?} to {:?}", old.group_id, new.group_id));
            }
            if old.business_category_id != new.business_category_id {
                lines.push(format!(
                    "Business category changed from {:?} to {:?}",
                    old.business_category_id, new.business_category_id
                ));
            }
        }
        None => {
            if let Some(group_id) = new.group_id {
                lines.push(format!("Group set to {}", group_id));
            }
            if let Some(category_id) = new.business_category_id {
                lines.push(format!("Business category set to {}", category_id));
            }
        }
    }
    lines
}
