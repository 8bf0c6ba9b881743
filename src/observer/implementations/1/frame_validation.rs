// Ring 1: the customer, group and business category a frame points at must exist
use async_trait::async_trait;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation, SyncObserver};

#[derive(Default)]
pub struct FrameValidation;

impl Observer for FrameValidation {
    fn name(&self) -> &'static str {
        "FrameValidation"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }
}

#[async_trait]
impl SyncObserver for FrameValidation {
    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let (customer_id, group_id, category_id) = ctx
            .candidate_refs()
            .ok_or_else(|| ObserverError::SystemError("No frame to validate".to_string()))?;

        let customer = ctx
            .store
            .find_user(customer_id)
            .await?
            .ok_or_else(|| ObserverError::ValidationError(format!("Customer {} does not exist", customer_id)))?;
        if customer.is_deleted {
            return Err(ObserverError::ValidationError(format!(
                "Customer {} account is deleted",
                customer_id
            )));
        }

        if let Some(group_id) = group_id {
            if ctx.store.find_group(group_id).await?.is_none() {
                return Err(ObserverError::ValidationError(format!("Group {} does not exist", group_id)));
            }
        }

        if let Some(category_id) = category_id {
            if ctx.store.find_business_category(category_id).await?.is_none() {
                return Err(ObserverError::ValidationError(format!(
                    "Business category {} does not exist",
                    category_id
                )));
            }
        }

        Ok(())
    }
}
