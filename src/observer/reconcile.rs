// Mapping table reconciliation primitives shared by the Ring 6 observers
use serde::Serialize;
use std::collections::HashSet;

use crate::database::manager::DatabaseError;
use crate::database::models::MappingKind;
use crate::database::store::MappingStore;

/// Counts of what one pass did to one mapping table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MappingOutcome {
    pub kind: MappingKind,
    pub created: usize,
    pub relinked: usize,
    pub reset: usize,
    pub stale_reset: usize,
}

impl MappingOutcome {
    pub fn new(kind: MappingKind) -> Self {
        Self {
            kind,
            created: 0,
            relinked: 0,
            reset: 0,
            stale_reset: 0,
        }
    }

    pub fn merge(&mut self, other: &MappingOutcome) {
        self.created += other.created;
        self.relinked += other.relinked;
        self.reset += other.reset;
        self.stale_reset += other.stale_reset;
    }

    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.relinked == 0 && self.reset == 0 && self.stale_reset == 0
    }

    pub fn log(&self, customer_id: i64, frame_id: i64) {
        tracing::info!(
            table = self.kind.table(),
            customer_id,
            frame_id,
            created = self.created,
            relinked = self.relinked,
            reset = self.reset,
            stale_reset = self.stale_reset,
            "Mapping reconciliation finished"
        );
    }
}

/// Ensure a mapping exists for each content id and points at `frame_id`.
///
/// New rows start not downloaded. When `reset_downloaded` is set, existing
/// rows that were downloaded are flipped back to false. A row is only written
/// when something about it changed.
pub async fn link_contents(
    store: &dyn MappingStore,
    kind: MappingKind,
    customer_id: i64,
    frame_id: i64,
    content_ids: &[i64],
    reset_downloaded: bool,
) -> Result<MappingOutcome, DatabaseError> {
    let mut outcome = MappingOutcome::new(kind);

    for &content_id in content_ids {
        let (mut mapping, created) = store.get_or_create_mapping(kind, customer_id, content_id, frame_id).await?;
        if created {
            outcome.created += 1;
            continue;
        }

        let mut dirty = false;
        if mapping.customer_frame_id != frame_id {
            mapping.customer_frame_id = frame_id;
            outcome.relinked += 1;
            dirty = true;
        }
        if reset_downloaded && mapping.is_downloaded {
            mapping.is_downloaded = false;
            outcome.reset += 1;
            dirty = true;
        }
        if dirty {
            store.save_mapping(kind, &mapping).await?;
        }
    }

    Ok(outcome)
}

/// Clear the downloaded flag on this frame's mappings whose content is no
/// longer a target. Returns how many rows were reset.
pub async fn reset_stale(
    store: &dyn MappingStore,
    kind: MappingKind,
    customer_id: i64,
    frame_id: i64,
    targets: &HashSet<i64>,
) -> Result<usize, DatabaseError> {
    let mut reset = 0;

    for mut mapping in store.mappings_for_customer(kind, customer_id).await? {
        if mapping.customer_frame_id != frame_id || targets.contains(&mapping.content_id) || !mapping.is_downloaded {
            continue;
        }
        mapping.is_downloaded = false;
        store.save_mapping(kind, &mapping).await?;
        reset += 1;
    }

    Ok(reset)
}

/// Full `reconcile` policy pass for one table
pub async fn reconcile_table(
    store: &dyn MappingStore,
    kind: MappingKind,
    customer_id: i64,
    frame_id: i64,
    targets: &[i64],
    changed: bool,
) -> Result<MappingOutcome, DatabaseError> {
    let mut outcome = link_contents(store, kind, customer_id, frame_id, targets, changed).await?;
    if changed {
        let target_set: HashSet<i64> = targets.iter().copied().collect();
        outcome.stale_reset = reset_stale(store, kind, customer_id, frame_id, &target_set).await?;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    #[tokio::test]
    async fn link_creates_then_is_idempotent() {
        let store = MemoryStore::new();
        let first = link_contents(&store, MappingKind::OtherPost, 1, 10, &[100, 101], false)
            .await
            .unwrap();
        assert_eq!(first.created, 2);

        let second = link_contents(&store, MappingKind::OtherPost, 1, 10, &[100, 101], false)
            .await
            .unwrap();
        assert!(second.is_noop());
        assert_eq!(store.mapping_rows(MappingKind::OtherPost).len(), 2);
    }

    #[tokio::test]
    async fn link_relinks_and_optionally_resets() {
        let store = MemoryStore::new();
        link_contents(&store, MappingKind::Post, 1, 10, &[5], false).await.unwrap();
        store.set_downloaded(MappingKind::Post, 1, 5, true);

        let keep = link_contents(&store, MappingKind::Post, 1, 11, &[5], false).await.unwrap();
        assert_eq!(keep.relinked, 1);
        assert_eq!(keep.reset, 0);
        let row = store.mapping(MappingKind::Post, 1, 5).unwrap();
        assert_eq!(row.customer_frame_id, 11);
        assert!(row.is_downloaded);

        let reset = link_contents(&store, MappingKind::Post, 1, 11, &[5], true).await.unwrap();
        assert_eq!(reset.relinked, 0);
        assert_eq!(reset.reset, 1);
        assert!(!store.mapping(MappingKind::Post, 1, 5).unwrap().is_downloaded);
    }

    #[tokio::test]
    async fn stale_reset_only_touches_this_frames_rows() {
        let store = MemoryStore::new();
        link_contents(&store, MappingKind::OtherPost, 1, 10, &[1, 2], false).await.unwrap();
        link_contents(&store, MappingKind::OtherPost, 1, 20, &[3], false).await.unwrap();
        for id in [1, 2, 3] {
            store.set_downloaded(MappingKind::OtherPost, 1, id, true);
        }

        let targets: HashSet<i64> = [1].into_iter().collect();
        let reset = reset_stale(&store, MappingKind::OtherPost, 1, 10, &targets).await.unwrap();
        assert_eq!(reset, 1);
        assert!(store.mapping(MappingKind::OtherPost, 1, 1).unwrap().is_downloaded);
        assert!(!store.mapping(MappingKind::OtherPost, 1, 2).unwrap().is_downloaded);
        assert!(store.mapping(MappingKind::OtherPost, 1, 3).unwrap().is_downloaded);
    }
}
