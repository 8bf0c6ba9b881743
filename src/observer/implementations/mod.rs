// Observer implementations organized by rings
// Each ring handles a specific phase of a frame save

use crate::observer::pipeline::ObserverPipeline;
use crate::observer::traits::ObserverBox;

// Ring 0: Data Preparation - load the stored frame, apply changes
#[path = "0/load_existing_frame.rs"]
pub mod load_existing_frame;

// Ring 1: Input Validation - referenced rows exist
#[path = "1/frame_validation.rs"]
pub mod frame_validation;

// Ring 5: Database - persist the frame row
#[path = "5/frame_sql_executor.rs"]
pub mod frame_sql_executor;

// Ring 6: Post-Database - mapping tables follow the frame
#[path = "6/post_mapping.rs"]
pub mod post_mapping;
#[path = "6/other_post_mapping.rs"]
pub mod other_post_mapping;
#[path = "6/business_post_mapping.rs"]
pub mod business_post_mapping;

// Ring 7: Audit
#[path = "7/frame_audit.rs"]
pub mod frame_audit;

pub use business_post_mapping::BusinessPostMappingObserver;
pub use frame_audit::FrameAuditObserver;
pub use frame_sql_executor::FrameSqlExecutor;
pub use frame_validation::FrameValidation;
pub use load_existing_frame::LoadExistingFrame;
pub use other_post_mapping::OtherPostMappingObserver;
pub use post_mapping::PostMappingObserver;

/// Register every observer taking part in frame saves
pub fn register_frame_observers(pipeline: &mut ObserverPipeline) {
    pipeline.register_observer(ObserverBox::Sync(Box::new(LoadExistingFrame)));
    pipeline.register_observer(ObserverBox::Sync(Box::new(FrameValidation)));
    pipeline.register_observer(ObserverBox::Sync(Box::new(FrameSqlExecutor)));
    pipeline.register_observer(ObserverBox::Sync(Box::new(PostMappingObserver)));
    pipeline.register_observer(ObserverBox::Sync(Box::new(OtherPostMappingObserver)));
    pipeline.register_observer(ObserverBox::Sync(Box::new(BusinessPostMappingObserver)));
    pipeline.register_observer(ObserverBox::Async(Box::new(FrameAuditObserver)));
}
