// Ring 6: event post mappings follow the frame's group
use async_trait::async_trait;

use crate::config::MappingPolicy;
use crate::database::models::MappingKind;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::reconcile::{link_contents, reconcile_table, MappingOutcome};
use crate::observer::traits::{Observer, ObserverRing, Operation, SyncObserver};

#[derive(Default)]
pub struct PostMappingObserver;

impl Observer for PostMappingObserver {
    fn name(&self) -> &'static str {
        "PostMappingObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::PostDatabase
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[async_trait]
impl SyncObserver for PostMappingObserver {
    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        match ctx.policy {
            MappingPolicy::Latest => self.latest(ctx).await,
            MappingPolicy::Reconcile => self.reconcile(ctx).await,
        }
    }
}

impl PostMappingObserver {
    async fn latest(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let frame = ctx.saved_frame()?.clone();

        if ctx.operation == Operation::Create {
            if frame.group_id.is_some() {
                ctx.warn(
                    self.name(),
                    format!("Frame {} created with a group; no post mappings are created until it is updated", frame.id),
                );
            }
            return Ok(());
        }

        let store = ctx.store.clone();

        // Resync maps whatever the stored group currently offers
        if ctx.operation == Operation::Resync {
            if frame.group_id.is_none() {
                ctx.warn(
                    self.name(),
                    format!("Frame {} has no group; posts without a group will be mapped", frame.id),
                );
            }
            let posts = store.upcoming_posts(frame.group_id, ctx.today).await?;
            let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
            let outcome = link_contents(&*store, MappingKind::Post, frame.customer_id, frame.id, &ids, false).await?;
            ctx.record_outcome(outcome);
            return Ok(());
        }

        let old_group = match &ctx.existing {
            Some(existing) if existing.group_id != frame.group_id => existing.group_id,
            _ => return Ok(()),
        };
        let new_group = frame.group_id;

        if new_group.is_none() {
            ctx.warn(
                self.name(),
                format!("Frame {} has no group; posts without a group will be mapped", frame.id),
            );
        }

        let mut outcome = MappingOutcome::new(MappingKind::Post);

        let previous = store.post_mappings_in_group(frame.customer_id, old_group).await?;
        if previous.is_empty() {
            let posts = store.upcoming_posts(new_group, ctx.today).await?;
            let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
            outcome.merge(&link_contents(&*store, MappingKind::Post, frame.customer_id, frame.id, &ids, true).await?);
        } else {
            ctx.warn(
                self.name(),
                format!(
                    "Customer {} still has {} post mappings in group {:?}; posts of group {:?} were not mapped",
                    frame.customer_id,
                    previous.len(),
                    old_group,
                    new_group
                ),
            );
        }

        if old_group.is_none() && new_group.is_some() {
            let posts = store.upcoming_posts(new_group, ctx.today).await?;
            let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
            outcome.merge(&link_contents(&*store, MappingKind::Post, frame.customer_id, frame.id, &ids, true).await?);
        }

        ctx.record_outcome(outcome);
        Ok(())
    }

    async fn reconcile(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let frame = ctx.saved_frame()?.clone();
        let changed = ctx.group_changed();
        let store = ctx.store.clone();

        let targets: Vec<i64> = match frame.group_id {
            Some(group_id) => store
                .upcoming_posts(Some(group_id), ctx.today)
                .await?
                .iter()
                .map(|p| p.id)
                .collect(),
            None => Vec::new(),
        };

        let outcome = reconcile_table(&*store, MappingKind::Post, frame.customer_id, frame.id, &targets, changed).await?;
        ctx.record_outcome(outcome);
        Ok(())
    }
}
