// Ring-ordered observer pipeline for frame saves

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;

use crate::config::MappingPolicy;
use crate::database::store::MappingStore;
use crate::observer::context::{FrameInput, ObserverContext};
use crate::observer::error::{ObserverError, ObserverResult};
use crate::observer::implementations::register_frame_observers;
use crate::observer::traits::{ObserverBox, ObserverRing};

/// Executes observers in ring order. Rings 0-6 run one after the other and
/// may mutate the context; rings 7-9 run concurrently once the frame is committed.
pub struct ObserverPipeline {
    observers: HashMap<ObserverRing, Vec<ObserverBox>>,
}

impl ObserverPipeline {
    /// Empty pipeline; observers are added with `register_observer`
    pub fn new() -> Self {
        Self {
            observers: HashMap::new(),
        }
    }

    /// Pipeline with every frame observer registered
    pub fn frame_pipeline() -> Self {
        let mut pipeline = Self::new();
        register_frame_observers(&mut pipeline);
        pipeline
    }

    pub fn register_observer(&mut self, observer: ObserverBox) {
        let ring = observer.ring();
        let name = observer.name();
        let slot = self.observers.entry(ring).or_default();
        slot.push(observer);
        slot.sort_by_key(|o| o.priority());

        tracing::debug!("Registered observer '{}' for ring {:?}", name, ring);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.values().map(Vec::len).sum()
    }

    /// Run one frame operation through every relevant ring.
    ///
    /// The synchronous rings share one store transaction, so the frame row
    /// and its mapping rows are stored together or not at all.
    pub async fn execute(
        &self,
        input: FrameInput,
        store: Arc<dyn MappingStore>,
        policy: MappingPolicy,
        today: NaiveDate,
    ) -> Result<ObserverResult, ObserverError> {
        let tx = store.begin().await?;
        let mut ctx = ObserverContext::new(input, tx.clone(), policy, today);
        let relevant_rings = ObserverRing::for_operation(&ctx.operation);

        tracing::info!(
            "Observer pipeline starting: operation={:?}, frame={:?}, policy={:?}",
            ctx.operation,
            ctx.input.frame_id(),
            ctx.policy
        );

        for &ring in relevant_rings.iter().filter(|r| r.is_synchronous()) {
            ctx.current_ring = Some(ring);

            if !self.execute_ring(ring, &mut ctx).await {
                tracing::warn!("Observer pipeline stopped at ring {:?} due to errors", ring);
                break;
            }
        }

        if let Some(error) = ctx.errors.first().cloned() {
            if let Err(e) = tx.rollback().await {
                tracing::error!("Rollback after failed frame operation also failed: {}", e);
            }
            return Err(error);
        }
        tx.commit().await?;
        ctx.store = store;

        self.execute_async_rings(&relevant_rings, &ctx).await;

        let frame = ctx.saved_frame()?.clone();
        Ok(ObserverResult {
            frame,
            outcomes: ctx.outcomes,
            warnings: ctx.warnings,
            execution_time: ctx.start_time.elapsed(),
            rings_executed: relevant_rings,
        })
    }

    /// Returns false when the pipeline must stop
    async fn execute_ring(&self, ring: ObserverRing, ctx: &mut ObserverContext) -> bool {
        let observers = match self.observers.get(&ring) {
            Some(obs) => obs,
            None => {
                tracing::debug!("No observers registered for ring {:?}", ring);
                return true;
            }
        };

        for observer in observers {
            if !observer.applies_to_operation(ctx.operation) {
                tracing::trace!(
                    "Observer {} skipped - doesn't apply to operation {:?}",
                    observer.name(),
                    ctx.operation
                );
                continue;
            }

            let observer_start = Instant::now();
            let result = timeout(observer.timeout(), observer.execute_sync(ctx)).await;
            let execution_time = observer_start.elapsed();

            match result {
                Ok(Ok(())) => {
                    tracing::debug!("Observer: {} completed in {:?}", observer.name(), execution_time);
                }
                Ok(Err(error)) => {
                    tracing::warn!("Observer: {} failed in {:?}: {}", observer.name(), execution_time, error);
                    ctx.errors.push(error);
                }
                Err(_elapsed) => {
                    tracing::error!("Observer: {} timed out after {:?}", observer.name(), observer.timeout());
                    ctx.errors.push(ObserverError::TimeoutError(format!(
                        "Observer {} timed out after {:?}",
                        observer.name(),
                        observer.timeout()
                    )));
                }
            }

            // Past the frame write nothing else in the ring runs; the transaction is rolled back
            if ctx.has_errors() && ring >= ObserverRing::Database {
                return false;
            }
        }

        !ctx.has_errors()
    }

    /// Audit and later rings: run together, failures are only logged
    async fn execute_async_rings(&self, relevant_rings: &[ObserverRing], ctx: &ObserverContext) {
        let pending: Vec<_> = relevant_rings
            .iter()
            .filter(|r| r.is_asynchronous())
            .filter_map(|r| self.observers.get(r))
            .flatten()
            .filter(|o| o.applies_to_operation(ctx.operation))
            .map(|observer| async move {
                match timeout(observer.timeout(), observer.execute_async(ctx)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => tracing::warn!("Async observer {} failed: {}", observer.name(), error),
                    Err(_) => tracing::warn!("Async observer {} timed out", observer.name()),
                }
            })
            .collect();

        futures::future::join_all(pending).await;
    }
}

impl Default for ObserverPipeline {
    fn default() -> Self {
        Self::new()
    }
}
