use chrono::NaiveDate;
use std::sync::Arc;

use crate::config::{self, MappingPolicy};
use crate::database::models::CustomerFrame;
use crate::database::store::{FrameFilter, MappingStore, NewFrame};
use crate::observer::{FrameChanges, FrameInput, MappingOutcome, ObserverError, ObserverPipeline, ObserverResult};

/// Entry point for frame writes. Every save goes through the observer
/// pipeline so the mapping tables stay in step with the frame row.
#[derive(Clone)]
pub struct FrameService {
    store: Arc<dyn MappingStore>,
    pipeline: Arc<ObserverPipeline>,
    policy: MappingPolicy,
    today: Option<NaiveDate>,
}

impl FrameService {
    pub fn new(store: Arc<dyn MappingStore>, policy: MappingPolicy) -> Self {
        Self {
            store,
            pipeline: Arc::new(ObserverPipeline::frame_pipeline()),
            policy,
            today: None,
        }
    }

    /// Pin the business date instead of reading the clock
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn policy(&self) -> MappingPolicy {
        self.policy
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(config::today)
    }

    async fn run(&self, input: FrameInput) -> Result<ObserverResult, ObserverError> {
        self.pipeline
            .execute(input, self.store.clone(), self.policy, self.today())
            .await
    }

    pub async fn create(&self, frame: NewFrame) -> Result<ObserverResult, ObserverError> {
        self.run(FrameInput::Create(frame)).await
    }

    pub async fn update(&self, id: i64, changes: FrameChanges) -> Result<ObserverResult, ObserverError> {
        self.run(FrameInput::Update { id, changes }).await
    }

    /// Re-run mapping reconciliation for a stored frame without changing it
    pub async fn resync(&self, id: i64) -> Result<ObserverResult, ObserverError> {
        self.run(FrameInput::Resync { id }).await
    }

    /// Resync every frame, returning per-frame failures instead of stopping
    pub async fn resync_all(&self) -> Result<(Vec<MappingOutcome>, Vec<(i64, ObserverError)>), ObserverError> {
        let frames = self.store.list_frames(&FrameFilter::default()).await?;
        let mut totals: Vec<MappingOutcome> = Vec::new();
        let mut failures = Vec::new();

        for frame in frames {
            match self.resync(frame.id).await {
                Ok(result) => {
                    for outcome in result.outcomes {
                        match totals.iter_mut().find(|t| t.kind == outcome.kind) {
                            Some(total) => total.merge(&outcome),
                            None => totals.push(outcome),
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Resync of frame {} failed: {}", frame.id, e);
                    failures.push((frame.id, e));
                }
            }
        }

        Ok((totals, failures))
    }

    /// Mapping rows go with the frame through ON DELETE CASCADE
    pub async fn delete(&self, id: i64) -> Result<(), ObserverError> {
        if self.store.delete_frame(id).await? {
            tracing::info!("Deleted frame {}", id);
            Ok(())
        } else {
            Err(ObserverError::NotFound(format!("Frame {} not found", id)))
        }
    }

    pub async fn get(&self, id: i64) -> Result<CustomerFrame, ObserverError> {
        self.store
            .find_frame(id)
            .await?
            .ok_or_else(|| ObserverError::NotFound(format!("Frame {} not found", id)))
    }

    pub async fn list(&self, filter: &FrameFilter) -> Result<Vec<CustomerFrame>, ObserverError> {
        Ok(self.store.list_frames(filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::MappingKind;
    use crate::testing::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        customer: i64,
        group_a: i64,
        group_b: i64,
        category: i64,
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let customer = store.add_customer("c@example.com").id;
        let group_a = store.add_group("Alpha").id;
        let group_b = store.add_group("Beta").id;
        let category = store.add_business_category("Doctor").id;
        Fixture {
            store,
            customer,
            group_a,
            group_b,
            category,
        }
    }

    fn service(f: &Fixture, policy: MappingPolicy) -> FrameService {
        FrameService::new(f.store.clone(), policy).with_today(today())
    }

    fn move_to(group: Option<i64>) -> FrameChanges {
        FrameChanges {
            group_id: Some(group),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_rejects_unknown_references() {
        let f = fixture();
        let svc = service(&f, MappingPolicy::Latest);

        let err = svc
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(9999),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ObserverError::ValidationError(_)));
        assert_eq!(f.store.frame_count(), 0);

        f.store.delete_user(f.customer);
        let err = svc
            .create(NewFrame {
                customer_id: f.customer,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ObserverError::ValidationError(_)));
    }

    #[tokio::test]
    async fn update_of_missing_frame_is_not_found() {
        let f = fixture();
        let err = service(&f, MappingPolicy::Latest).update(42, move_to(None)).await.unwrap_err();
        assert!(matches!(err, ObserverError::NotFound(_)));
    }

    #[tokio::test]
    async fn latest_create_maps_nothing_and_warns() {
        let f = fixture();
        f.store.add_post(Some(f.group_a), today());
        f.store.add_other_post(Some(f.group_a));

        let result = service(&f, MappingPolicy::Latest)
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(f.group_a),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(f.store.mapping_rows(MappingKind::Post).is_empty());
        assert!(f.store.mapping_rows(MappingKind::OtherPost).is_empty());
        assert!(!result.warnings.is_empty());
    }

    #[tokio::test]
    async fn latest_group_change_maps_upcoming_posts_of_new_group() {
        let f = fixture();
        let past = f.store.add_post(Some(f.group_b), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let upcoming = f.store.add_post(Some(f.group_b), today());
        let other = f.store.add_other_post(Some(f.group_b));
        let svc = service(&f, MappingPolicy::Latest);

        let frame = svc
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(f.group_a),
                ..Default::default()
            })
            .await
            .unwrap()
            .frame;
        let result = svc.update(frame.id, move_to(Some(f.group_b))).await.unwrap();

        assert_eq!(result.frame.group_id, Some(f.group_b));
        let mapped = f.store.mapping(MappingKind::Post, f.customer, upcoming.id).unwrap();
        assert_eq!(mapped.customer_frame_id, frame.id);
        assert!(!mapped.is_downloaded);
        assert!(f.store.mapping(MappingKind::Post, f.customer, past.id).is_none());
        assert!(f.store.mapping(MappingKind::OtherPost, f.customer, other.id).is_some());
    }

    #[tokio::test]
    async fn latest_skips_new_group_when_old_group_still_mapped() {
        let f = fixture();
        let old_post = f.store.add_post(Some(f.group_a), today());
        let new_post = f.store.add_post(Some(f.group_b), today());
        let svc = service(&f, MappingPolicy::Latest);

        let frame = svc
            .create(NewFrame {
                customer_id: f.customer,
                ..Default::default()
            })
            .await
            .unwrap()
            .frame;
        svc.update(frame.id, move_to(Some(f.group_a))).await.unwrap();
        assert!(f.store.mapping(MappingKind::Post, f.customer, old_post.id).is_some());

        let result = svc.update(frame.id, move_to(Some(f.group_b))).await.unwrap();
        assert!(f.store.mapping(MappingKind::Post, f.customer, new_post.id).is_none());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.observer == "PostMappingObserver" && w.message.contains("were not mapped")));
    }

    #[tokio::test]
    async fn latest_other_posts_keep_download_flag() {
        let f = fixture();
        let other = f.store.add_other_post(Some(f.group_a));
        let svc = service(&f, MappingPolicy::Latest);

        let frame = svc
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(f.group_a),
                ..Default::default()
            })
            .await
            .unwrap()
            .frame;
        svc.update(frame.id, FrameChanges::default()).await.unwrap();
        f.store.set_downloaded(MappingKind::OtherPost, f.customer, other.id, true);

        let again = svc.update(frame.id, FrameChanges::default()).await.unwrap();
        assert!(f.store.mapping(MappingKind::OtherPost, f.customer, other.id).unwrap().is_downloaded);
        assert!(again.outcomes.iter().all(|o| o.created == 0 && o.reset == 0));
        assert_eq!(f.store.mapping_rows(MappingKind::OtherPost).len(), 1);
    }

    #[tokio::test]
    async fn latest_business_posts_follow_category() {
        let f = fixture();
        let post = f.store.add_business_post(Some(f.category), None);
        let svc = service(&f, MappingPolicy::Latest);

        let frame = svc
            .create(NewFrame {
                customer_id: f.customer,
                ..Default::default()
            })
            .await
            .unwrap()
            .frame;
        svc.update(
            frame.id,
            FrameChanges {
                business_category_id: Some(Some(f.category)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(f.store.mapping(MappingKind::BusinessPost, f.customer, post.id).is_some());
    }

    #[tokio::test]
    async fn reconcile_create_maps_all_tables() {
        let f = fixture();
        let post = f.store.add_post(Some(f.group_a), today());
        let other = f.store.add_other_post(Some(f.group_a));
        let business = f.store.add_business_post(Some(f.category), Some(f.group_a));
        let off_group = f.store.add_business_post(Some(f.category), Some(f.group_b));

        let result = service(&f, MappingPolicy::Reconcile)
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(f.group_a),
                business_category_id: Some(f.category),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(result.warnings.is_empty());
        assert_eq!(result.outcomes.len(), 3);
        assert!(f.store.mapping(MappingKind::Post, f.customer, post.id).is_some());
        assert!(f.store.mapping(MappingKind::OtherPost, f.customer, other.id).is_some());
        assert!(f.store.mapping(MappingKind::BusinessPost, f.customer, business.id).is_some());
        assert!(f.store.mapping(MappingKind::BusinessPost, f.customer, off_group.id).is_none());
    }

    #[tokio::test]
    async fn reconcile_group_change_resets_downloads() {
        let f = fixture();
        let old_post = f.store.add_post(Some(f.group_a), today());
        let shared = f.store.add_other_post(Some(f.group_a));
        let svc = service(&f, MappingPolicy::Reconcile);

        let frame = svc
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(f.group_a),
                ..Default::default()
            })
            .await
            .unwrap()
            .frame;
        f.store.set_downloaded(MappingKind::Post, f.customer, old_post.id, true);
        f.store.set_downloaded(MappingKind::OtherPost, f.customer, shared.id, true);

        let new_post = f.store.add_post(Some(f.group_b), today());
        let result = svc.update(frame.id, move_to(Some(f.group_b))).await.unwrap();

        assert!(!f.store.mapping(MappingKind::Post, f.customer, old_post.id).unwrap().is_downloaded);
        assert!(!f.store.mapping(MappingKind::OtherPost, f.customer, shared.id).unwrap().is_downloaded);
        assert!(f.store.mapping(MappingKind::Post, f.customer, new_post.id).is_some());
        let posts = result.outcomes.iter().find(|o| o.kind == MappingKind::Post).unwrap();
        assert_eq!(posts.created, 1);
        assert_eq!(posts.stale_reset, 1);
    }

    #[tokio::test]
    async fn reconcile_is_idempotent_for_unchanged_frame() {
        let f = fixture();
        let post = f.store.add_post(Some(f.group_a), today());
        let svc = service(&f, MappingPolicy::Reconcile);

        let frame = svc
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(f.group_a),
                ..Default::default()
            })
            .await
            .unwrap()
            .frame;
        f.store.set_downloaded(MappingKind::Post, f.customer, post.id, true);

        let resync = svc.resync(frame.id).await.unwrap();
        let update = svc.update(frame.id, FrameChanges::default()).await.unwrap();

        assert!(resync.outcomes.iter().all(MappingOutcome::is_noop));
        assert!(update.outcomes.iter().all(MappingOutcome::is_noop));
        assert!(f.store.mapping(MappingKind::Post, f.customer, post.id).unwrap().is_downloaded);
        assert_eq!(f.store.mapping_rows(MappingKind::Post).len(), 1);
    }

    #[tokio::test]
    async fn resync_all_picks_up_new_catalog_rows() {
        let f = fixture();
        let svc = service(&f, MappingPolicy::Reconcile);
        svc.create(NewFrame {
            customer_id: f.customer,
            group_id: Some(f.group_a),
            ..Default::default()
        })
        .await
        .unwrap();

        f.store.add_other_post(Some(f.group_a));
        let (totals, failures) = svc.resync_all().await.unwrap();
        assert!(failures.is_empty());
        let other = totals.iter().find(|o| o.kind == MappingKind::OtherPost).unwrap();
        assert_eq!(other.created, 1);
    }

    #[tokio::test]
    async fn delete_drops_frame_and_mappings() {
        let f = fixture();
        f.store.add_other_post(Some(f.group_a));
        let svc = service(&f, MappingPolicy::Reconcile);
        let frame = svc
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(f.group_a),
                ..Default::default()
            })
            .await
            .unwrap()
            .frame;

        svc.delete(frame.id).await.unwrap();
        assert!(f.store.mapping_rows(MappingKind::OtherPost).is_empty());
        assert!(matches!(svc.delete(frame.id).await, Err(ObserverError::NotFound(_))));
    }

    #[tokio::test]
    async fn failed_mapping_write_rolls_back_frame_and_mappings() {
        let f = fixture();
        for _ in 0..3 {
            f.store.add_post(Some(f.group_b), today());
        }
        let svc = service(&f, MappingPolicy::Latest);
        let frame = svc
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(f.group_a),
                ..Default::default()
            })
            .await
            .unwrap()
            .frame;

        f.store.fail_mapping_write(2);
        let err = svc.update(frame.id, move_to(Some(f.group_b))).await.unwrap_err();
        assert!(matches!(err, ObserverError::DatabaseError(_)));
        assert_eq!(svc.get(frame.id).await.unwrap().group_id, Some(f.group_a));
        assert!(f.store.mapping_rows(MappingKind::Post).is_empty());

        let retry = svc.update(frame.id, move_to(Some(f.group_b))).await.unwrap();
        assert_eq!(retry.frame.group_id, Some(f.group_b));
        let rows = f.store.mapping_rows(MappingKind::Post);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|m| m.customer_frame_id == frame.id && !m.is_downloaded));
    }

    #[tokio::test]
    async fn failed_create_leaves_no_frame_behind() {
        let f = fixture();
        f.store.add_other_post(Some(f.group_a));
        f.store.add_other_post(Some(f.group_a));
        let svc = service(&f, MappingPolicy::Reconcile);

        f.store.fail_mapping_write(2);
        let err = svc
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(f.group_a),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ObserverError::DatabaseError(_)));
        assert_eq!(f.store.frame_count(), 0);
        assert!(f.store.mapping_rows(MappingKind::OtherPost).is_empty());
    }

    #[tokio::test]
    async fn latest_resync_maps_new_posts_of_stored_group() {
        let f = fixture();
        let svc = service(&f, MappingPolicy::Latest);
        let frame = svc
            .create(NewFrame {
                customer_id: f.customer,
                ..Default::default()
            })
            .await
            .unwrap()
            .frame;
        svc.update(frame.id, move_to(Some(f.group_a))).await.unwrap();

        let added = f.store.add_post(Some(f.group_a), today());
        let elsewhere = f.store.add_post(Some(f.group_b), today());
        let result = svc.resync(frame.id).await.unwrap();

        let posts = result.outcomes.iter().find(|o| o.kind == MappingKind::Post).unwrap();
        assert_eq!(posts.created, 1);
        assert!(f.store.mapping(MappingKind::Post, f.customer, added.id).is_some());
        assert!(f.store.mapping(MappingKind::Post, f.customer, elsewhere.id).is_none());
    }

    #[tokio::test]
    async fn latest_without_group_maps_rows_without_group_and_warns() {
        let f = fixture();
        let loose_post = f.store.add_post(None, today());
        let loose_other = f.store.add_other_post(None);
        let grouped = f.store.add_post(Some(f.group_b), today());
        let svc = service(&f, MappingPolicy::Latest);

        let frame = svc
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(f.group_a),
                ..Default::default()
            })
            .await
            .unwrap()
            .frame;
        let result = svc.update(frame.id, move_to(None)).await.unwrap();

        assert_eq!(result.frame.group_id, None);
        assert!(f.store.mapping(MappingKind::Post, f.customer, loose_post.id).is_some());
        assert!(f.store.mapping(MappingKind::OtherPost, f.customer, loose_other.id).is_some());
        assert!(f.store.mapping(MappingKind::Post, f.customer, grouped.id).is_none());
        for observer in ["PostMappingObserver", "OtherPostMappingObserver"] {
            assert!(result
                .warnings
                .iter()
                .any(|w| w.observer == observer && w.message.contains("has no group")));
        }
    }

    #[tokio::test]
    async fn reconcile_clearing_group_resets_downloaded_rows() {
        let f = fixture();
        let post = f.store.add_post(Some(f.group_a), today());
        let other = f.store.add_other_post(Some(f.group_a));
        f.store.add_post(None, today());
        let svc = service(&f, MappingPolicy::Reconcile);

        let frame = svc
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(f.group_a),
                ..Default::default()
            })
            .await
            .unwrap()
            .frame;
        f.store.set_downloaded(MappingKind::Post, f.customer, post.id, true);
        f.store.set_downloaded(MappingKind::OtherPost, f.customer, other.id, true);

        let result = svc.update(frame.id, move_to(None)).await.unwrap();

        assert_eq!(result.frame.group_id, None);
        assert!(!f.store.mapping(MappingKind::Post, f.customer, post.id).unwrap().is_downloaded);
        assert!(!f.store.mapping(MappingKind::OtherPost, f.customer, other.id).unwrap().is_downloaded);
        assert_eq!(f.store.mapping_rows(MappingKind::Post).len(), 1);
        let posts = result.outcomes.iter().find(|o| o.kind == MappingKind::Post).unwrap();
        assert_eq!(posts.stale_reset, 1);
        assert_eq!(posts.created, 0);
    }

    #[tokio::test]
    async fn list_filters_by_group_name_and_profession_type() {
        let f = fixture();
        let svc = service(&f, MappingPolicy::Reconcile);
        let doctor = svc
            .create(NewFrame {
                customer_id: f.customer,
                group_id: Some(f.group_a),
                profession_type: Some("Doctor".to_string()),
                ..Default::default()
            })
            .await
            .unwrap()
            .frame;
        svc.create(NewFrame {
            customer_id: f.customer,
            group_id: Some(f.group_b),
            profession_type: Some("Doctor".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        svc.create(NewFrame {
            customer_id: f.customer,
            group_id: Some(f.group_a),
            profession_type: Some("Lawyer".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

        let in_alpha = svc
            .list(&FrameFilter {
                group_name: Some("Alpha".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(in_alpha.len(), 2);

        let alpha_doctors = svc
            .list(&FrameFilter {
                group_name: Some("Alpha".to_string()),
                profession_type: Some("Doctor".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(alpha_doctors.iter().map(|fr| fr.id).collect::<Vec<_>>(), vec![doctor.id]);

        let partial = svc
            .list(&FrameFilter {
                group_name: Some("Alph".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(partial.is_empty());
    }
}
