// Ring 6: business post mappings follow the frame's business category
use async_trait::async_trait;

use crate::config::MappingPolicy;
use crate::database::models::MappingKind;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::reconcile::{link_contents, reconcile_table};
use crate::observer::traits::{Observer, ObserverRing, Operation, SyncObserver};

#[derive(Default)]
pub struct BusinessPostMappingObserver;

impl Observer for BusinessPostMappingObserver {
    fn name(&self) -> &'static str {
        "BusinessPostMappingObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::PostDatabase
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    fn priority(&self) -> u8 {
        30
    }
}

#[async_trait]
impl SyncObserver for BusinessPostMappingObserver {
    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let frame = ctx.saved_frame()?.clone();
        let store = ctx.store.clone();

        let outcome = match ctx.policy {
            MappingPolicy::Latest => {
                if ctx.operation == Operation::Create {
                    if frame.business_category_id.is_some() {
                        ctx.warn(
                            self.name(),
                            format!(
                                "Frame {} created with a business category; business posts are mapped on its next update",
                                frame.id
                            ),
                        );
                    }
                    return Ok(());
                }
                if frame.business_category_id.is_none() {
                    ctx.warn(
                        self.name(),
                        format!(
                            "Frame {} has no business category; business posts without a category will be mapped",
                            frame.id
                        ),
                    );
                }
                let ids: Vec<i64> = store
                    .business_posts(frame.business_category_id)
                    .await?
                    .iter()
                    .map(|p| p.id)
                    .collect();
                link_contents(&*store, MappingKind::BusinessPost, frame.customer_id, frame.id, &ids, false).await?
            }
            MappingPolicy::Reconcile => {
                let changed = ctx.group_changed() || ctx.category_changed();
                let ids: Vec<i64> = match (frame.business_category_id, frame.group_id) {
                    (Some(category_id), Some(group_id)) => store
                        .business_posts(Some(category_id))
                        .await?
                        .iter()
                        .filter(|p| p.group_id == Some(group_id))
                        .map(|p| p.id)
                        .collect(),
                    _ => Vec::new(),
                };
                reconcile_table(&*store, MappingKind::BusinessPost, frame.customer_id, frame.id, &ids, changed).await?
            }
        };

        ctx.record_outcome(outcome);
        Ok(())
    }
}
