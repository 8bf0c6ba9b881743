// Ring 6: other (category) post mappings follow the frame's group
use async_trait::async_trait;

use crate::config::MappingPolicy;
use crate::database::models::MappingKind;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::reconcile::{link_contents, reconcile_table};
use crate::observer::traits::{Observer, ObserverRing, Operation, SyncObserver};

#[derive(Default)]
pub struct OtherPostMappingObserver;

impl Observer for OtherPostMappingObserver {
    fn name(&self) -> &'static str {
        "OtherPostMappingObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::PostDatabase
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    fn priority(&self) -> u8 {
        20
    }
}

#[async_trait]
impl SyncObserver for OtherPostMappingObserver {
    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let frame = ctx.saved_frame()?.clone();
        let store = ctx.store.clone();

        let outcome = match ctx.policy {
            MappingPolicy::Latest => {
                if ctx.operation == Operation::Create {
                    if frame.group_id.is_some() {
                        ctx.warn(
                            self.name(),
                            format!("Frame {} created with a group; other posts are mapped on its next update", frame.id),
                        );
                    }
                    return Ok(());
                }
                if frame.group_id.is_none() {
                    ctx.warn(
                        self.name(),
                        format!("Frame {} has no group; other posts without a group will be mapped", frame.id),
                    );
                }
                let ids: Vec<i64> = store.other_posts(frame.group_id).await?.iter().map(|p| p.id).collect();
                link_contents(&*store, MappingKind::OtherPost, frame.customer_id, frame.id, &ids, false).await?
            }
            MappingPolicy::Reconcile => {
                let changed = ctx.group_changed();
                let ids: Vec<i64> = match frame.group_id {
                    Some(group_id) => store.other_posts(Some(group_id)).await?.iter().map(|p| p.id).collect(),
                    None => Vec::new(),
                };
                reconcile_table(&*store, MappingKind::OtherPost, frame.customer_id, frame.id, &ids, changed).await?
            }
        };

        ctx.record_outcome(outcome);
        Ok(())
    }
}
